use std::time::{Duration, Instant};

use beatstrip::audio::SharedSnapshot;
use beatstrip::hardware::{MemoryPwm, MemoryStrip, PwmLog, StripLog, PWM_CHANNELS};
use beatstrip::modes::ModeKind;
use beatstrip::selector::SwitchReason;
use beatstrip::show::ShowEngine;

fn engine(len: usize, initial: ModeKind) -> (ShowEngine, StripLog, PwmLog, Instant) {
    let (strip, strip_log) = MemoryStrip::recording(len);
    let (pwm, pwm_log) = MemoryPwm::new();
    let t0 = Instant::now();
    let show = ShowEngine::new(Box::new(strip), Box::new(pwm), initial, 77, t0).expect("memory outputs");
    (show, strip_log, pwm_log, t0)
}

fn frame_at(t0: Instant, n: u64) -> Instant {
    t0 + Duration::from_millis(20 * n)
}

#[test]
fn startup_blanks_every_output() {
    let (show, strip, pwm, _) = engine(24, ModeKind::Shift);
    assert_eq!(strip.frame_count(), 1, "one blank frame before the show starts");
    let frame = strip.last_frame().expect("blank frame");
    assert!(frame.iter().all(|&px| px == (0, 0, 0)));
    for ch in 0..PWM_CHANNELS {
        assert_eq!(pwm.duty(ch), (0, 0), "channel {ch}");
    }
    assert_eq!(show.active_mode().map(|m| m.name()), Some("Shift"));
    assert_eq!(show.mode_count(), 4);
}

#[test]
fn initial_mode_is_configurable() {
    let (show, _, _, _) = engine(24, ModeKind::ShootingStar);
    assert_eq!(show.active_index(), 0);
    assert_eq!(show.fps(), 60);
}

#[test]
fn tick_without_beat_draws_one_frame() {
    let (mut show, strip, _, t0) = engine(24, ModeKind::Chase);
    let shared = SharedSnapshot::new();
    let tick = show.tick(frame_at(t0, 1), &shared).expect("tick");
    assert!(!tick.beat);
    assert!(!tick.half_beat);
    assert_eq!(tick.switch, None);
    assert_eq!(tick.fps, 15);
    assert_eq!(strip.frame_count(), 2);
    assert_eq!(show.selector().beat_count(), 0);
}

#[test]
fn beat_is_consumed_once_and_counted() {
    let (mut show, _, _, t0) = engine(24, ModeKind::Chase);
    let shared = SharedSnapshot::new();
    shared.publish(true, 0.5, 0.5, 120.0);

    let tick = show.tick(frame_at(t0, 1), &shared).expect("tick");
    assert!(tick.beat);
    assert_eq!(show.selector().beat_count(), 1);
    assert!(!shared.load().is_beat, "latch cleared by the render loop");

    let tick = show.tick(frame_at(t0, 2), &shared).expect("tick");
    assert!(!tick.beat);
    assert_eq!(show.selector().beat_count(), 1);
}

#[test]
fn beat_blinks_the_thruster() {
    let (mut show, _, _, t0) = engine(24, ModeKind::Chase);
    let shared = SharedSnapshot::new();
    show.tick(t0 + Duration::from_secs(2), &shared).expect("tick");
    assert_eq!(show.accents().thruster().brightness(), 1.0);

    shared.publish(true, 0.5, 0.5, 120.0);
    show.tick(t0 + Duration::from_secs(3), &shared).expect("tick");
    assert_eq!(show.accents().thruster().brightness(), 0.0);
}

#[test]
fn steady_music_forces_a_switch_after_128_beats() {
    let (mut show, _, _, t0) = engine(24, ModeKind::Shift);
    let shared = SharedSnapshot::new();
    let mut switches = Vec::new();
    for n in 1..=129u64 {
        shared.publish(true, 0.5, 0.5, 120.0);
        let tick = show.tick(frame_at(t0, n), &shared).expect("tick");
        if let Some(s) = tick.switch {
            switches.push((n, s.reason));
        }
    }
    assert_eq!(switches, vec![(129, SwitchReason::MaxDuration)]);
    assert_eq!(show.selector().beat_count(), 1);
}

#[test]
fn silence_switches_on_the_33rd_beat() {
    let (mut show, _, _, t0) = engine(24, ModeKind::Shift);
    let shared = SharedSnapshot::new();
    for n in 1..=33u64 {
        shared.publish(true, 0.0, 0.0, 0.0);
        let tick = show.tick(frame_at(t0, n), &shared).expect("tick");
        if n < 33 {
            assert_eq!(tick.switch, None, "beat {n}");
        } else {
            let switch = tick.switch.expect("silence switch");
            assert_eq!(switch.reason, SwitchReason::ProlongedSilence);
            assert_eq!(show.active_index(), switch.next_mode);
        }
    }
}

#[test]
fn slow_tempo_gets_a_half_beat() {
    let (mut show, _, _, t0) = engine(24, ModeKind::Shimmer);
    let shared = SharedSnapshot::new();
    shared.publish(true, 0.5, 0.5, 60.0);
    show.tick(t0, &shared).expect("tick");

    let early = show.tick(t0 + Duration::from_millis(300), &shared).expect("tick");
    assert!(!early.half_beat);
    let mid = show.tick(t0 + Duration::from_millis(520), &shared).expect("tick");
    assert!(mid.half_beat);
    assert!(!mid.beat);
    let later = show.tick(t0 + Duration::from_millis(700), &shared).expect("tick");
    assert!(!later.half_beat, "one half beat per beat");
    assert_eq!(show.selector().beat_count(), 1);
}

#[test]
fn half_beat_keeps_the_detected_beat_interval() {
    let (mut show, _, _, t0) = engine(24, ModeKind::Shimmer);
    let shared = SharedSnapshot::new();
    shared.publish(true, 0.5, 0.5, 60.0);
    show.tick(t0, &shared).expect("tick");
    shared.publish(true, 0.5, 0.5, 60.0);
    let second = show.tick(t0 + Duration::from_secs(1), &shared).expect("tick");
    assert_eq!(second.switch, None);

    let interval = |show: &ShowEngine| show.active_mode().expect("mode").state().beat_interval();
    assert_eq!(interval(&show), Duration::from_secs(1));

    let half = show.tick(t0 + Duration::from_millis(1_520), &shared).expect("tick");
    assert!(half.half_beat);
    assert_eq!(interval(&show), Duration::from_secs(1), "half beats are not real beats");
}

#[test]
fn blank_clears_strip_and_lights() {
    let (mut show, strip, pwm, t0) = engine(24, ModeKind::Chase);
    let shared = SharedSnapshot::new();
    for n in 1..10 {
        shared.publish(n % 3 == 0, 0.5, 0.5, 120.0);
        show.tick(frame_at(t0, n), &shared).expect("tick");
    }
    show.blank().expect("blank");
    let frame = strip.last_frame().expect("frame");
    assert!(frame.iter().all(|&px| px == (0, 0, 0)));
    for ch in 0..PWM_CHANNELS {
        assert_eq!(pwm.duty(ch), (0, 0), "channel {ch}");
    }
}
