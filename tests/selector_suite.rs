use std::collections::HashSet;
use std::time::{Duration, Instant};

use beatstrip::audio::AudioSnapshot;
use beatstrip::selector::{evaluate, ModeSelector, RunningBeatWindow, SwitchInputs, SwitchReason};

fn snap(tempo_bpm: f32, peak_volume: f32, volume: f32) -> AudioSnapshot {
    AudioSnapshot {
        exiting: false,
        is_beat: true,
        volume,
        peak_volume,
        tempo_bpm,
    }
}

fn steady_inputs(beat_count: u32) -> SwitchInputs {
    SwitchInputs {
        beat_count,
        tempo_bpm: 120.0,
        prev_tempo_bpm: 120.0,
        peak_volume: 1.0,
        volume: 1.0,
    }
}

/// Feeds one beat and counts it the way the render loop does.
fn beat(sel: &mut ModeSelector, now: Instant, s: AudioSnapshot) -> Option<SwitchReason> {
    let decision = sel.on_beat(now, &s, 4);
    sel.count_beat();
    decision.map(|d| d.reason)
}

#[test]
fn tempo_jump_switches_by_third_beat() {
    let t0 = Instant::now();
    let mut sel = ModeSelector::new(1);
    assert_eq!(beat(&mut sel, t0, snap(120.0, 1.0, 1.0)), None);
    assert_eq!(beat(&mut sel, t0, snap(120.0, 1.0, 1.0)), None);
    assert_eq!(
        beat(&mut sel, t0, snap(180.0, 1.0, 1.0)),
        Some(SwitchReason::TempoShift),
        "120 -> 180 bpm with beat_count 2 must switch"
    );
    assert_eq!(sel.beat_count(), 1, "count restarts at zero and the switch beat is counted");
}

#[test]
fn tempo_jump_is_ignored_before_two_beats() {
    let t0 = Instant::now();
    let mut sel = ModeSelector::new(1);
    assert_eq!(beat(&mut sel, t0, snap(60.0, 1.0, 1.0)), None);
    assert_eq!(beat(&mut sel, t0, snap(180.0, 1.0, 1.0)), None);
}

#[test]
fn forced_switch_exactly_at_128_beats() {
    let t0 = Instant::now();
    let mut sel = ModeSelector::new(2);
    for i in 0..128 {
        assert_eq!(beat(&mut sel, t0, snap(120.0, 1.0, 1.0)), None, "unexpected switch at beat {i}");
    }
    assert_eq!(sel.beat_count(), 128);
    assert_eq!(
        beat(&mut sel, t0, snap(120.0, 1.0, 1.0)),
        Some(SwitchReason::MaxDuration)
    );
}

#[test]
fn falling_peaks_do_not_count_as_quiet() {
    let window = RunningBeatWindow::from_peaks(&[10.0, 9.0, 1.0, 1.0]);
    let inputs = SwitchInputs {
        peak_volume: 10.0,
        ..steady_inputs(4)
    };
    assert_eq!(evaluate(&inputs, &window), None);
}

#[test]
fn loudness_spike_against_window_max() {
    let t0 = Instant::now();
    let mut sel = ModeSelector::new(3);
    assert_eq!(beat(&mut sel, t0, snap(120.0, 10.0, 1.0)), None);
    assert_eq!(beat(&mut sel, t0, snap(120.0, 1.0, 1.0)), None);
    assert_eq!(
        beat(&mut sel, t0, snap(120.0, 50.0, 1.0)),
        Some(SwitchReason::LoudnessSpike),
        "50 against a window max of 10 is a 5x spike"
    );
    assert!(!sel.is_quiet());
}

#[test]
fn tempo_shift_wins_over_loudness_spike() {
    let window = RunningBeatWindow::from_peaks(&[1.0, 1.0]);
    let inputs = SwitchInputs {
        tempo_bpm: 90.0,
        peak_volume: 50.0,
        ..steady_inputs(2)
    };
    assert_eq!(evaluate(&inputs, &window), Some(SwitchReason::TempoShift));
}

#[test]
fn quiet_section_needs_four_beats() {
    let window = RunningBeatWindow::from_peaks(&[1.0, 1.0, 1.0, 1.0]);
    let quiet = SwitchInputs {
        peak_volume: 0.1,
        ..steady_inputs(4)
    };
    assert_eq!(evaluate(&quiet, &window), Some(SwitchReason::QuietSection));
    let early = SwitchInputs {
        beat_count: 3,
        ..quiet
    };
    assert_eq!(evaluate(&early, &window), None);
}

#[test]
fn quiet_switch_marks_selector_quiet() {
    let t0 = Instant::now();
    let mut sel = ModeSelector::new(4);
    for _ in 0..4 {
        assert_eq!(beat(&mut sel, t0, snap(120.0, 1.0, 1.0)), None);
    }
    assert_eq!(
        beat(&mut sel, t0, snap(120.0, 0.1, 1.0)),
        Some(SwitchReason::QuietSection)
    );
    assert!(sel.is_quiet());
}

#[test]
fn silence_switches_at_32_beats_only() {
    let window = RunningBeatWindow::from_peaks(&[1.0, 1.0, 1.0, 1.0]);
    for count in [31, 33] {
        let inputs = SwitchInputs {
            volume: 0.0,
            ..steady_inputs(count)
        };
        assert_eq!(evaluate(&inputs, &window), None, "beat_count {count}");
    }
    let inputs = SwitchInputs {
        volume: 0.0,
        ..steady_inputs(32)
    };
    assert_eq!(evaluate(&inputs, &window), Some(SwitchReason::ProlongedSilence));
}

#[test]
fn decision_is_a_pure_function_of_its_inputs() {
    let window = RunningBeatWindow::from_peaks(&[0.3, 0.9, 0.4]);
    let inputs = SwitchInputs {
        beat_count: 7,
        tempo_bpm: 121.0,
        prev_tempo_bpm: 120.5,
        peak_volume: 0.8,
        volume: 0.2,
    };
    let first = evaluate(&inputs, &window);
    for _ in 0..10 {
        assert_eq!(evaluate(&inputs, &window), first);
    }
}

#[test]
fn window_is_updated_after_the_decision() {
    let t0 = Instant::now();
    let mut sel = ModeSelector::new(5);
    sel.on_beat(t0, &snap(100.0, 0.7, 0.1), 4);
    assert_eq!(sel.window().peaks().collect::<Vec<_>>(), vec![0.7]);
    assert_eq!(sel.prev_tempo_bpm(), 100.0);
}

#[test]
fn next_mode_is_uniform_over_all_modes() {
    let t0 = Instant::now();
    let mut sel = ModeSelector::new(6);
    let mut seen = HashSet::new();
    for _ in 0..200 {
        // Alternating tempos force a switch once two beats are counted.
        sel.count_beat();
        sel.count_beat();
        let tempo = if sel.prev_tempo_bpm() == 100.0 { 150.0 } else { 100.0 };
        if let Some(d) = sel.on_beat(t0, &snap(tempo, 1.0, 1.0), 4) {
            assert!(d.next_mode < 4);
            seen.insert(d.next_mode);
        }
    }
    assert_eq!(seen.len(), 4, "every mode, the current one included, gets picked");
}

#[test]
fn same_seed_same_switch_sequence() {
    let t0 = Instant::now();
    let run = |seed| {
        let mut sel = ModeSelector::new(seed);
        (0..20)
            .map(|i| {
                sel.count_beat();
                sel.count_beat();
                let tempo = if i % 2 == 0 { 100.0 } else { 150.0 };
                sel.on_beat(t0, &snap(tempo, 1.0, 1.0), 4).map(|d| d.next_mode)
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(run(42), run(42));
}

#[test]
fn half_beat_fires_once_midway_for_slow_songs() {
    let t0 = Instant::now();
    let mut sel = ModeSelector::new(7);
    assert!(!sel.half_beat_due(t0, 60.0), "no beat yet");

    sel.on_beat(t0, &snap(60.0, 1.0, 1.0), 4);
    sel.count_beat();
    assert!(!sel.half_beat_due(t0 + Duration::from_millis(400), 60.0));
    assert!(sel.half_beat_due(t0 + Duration::from_millis(500), 60.0));
    assert!(!sel.half_beat_due(t0 + Duration::from_millis(600), 60.0), "only once per beat");
    assert_eq!(sel.beat_count(), 1, "half beats are not counted");
}

#[test]
fn half_beat_uses_sixty_bpm_floor_for_period() {
    let t0 = Instant::now();
    let mut sel = ModeSelector::new(8);
    sel.on_beat(t0, &snap(55.0, 1.0, 1.0), 4);
    assert!(!sel.half_beat_due(t0 + Duration::from_millis(490), 55.0));
    assert!(sel.half_beat_due(t0 + Duration::from_millis(510), 55.0));
}

#[test]
fn half_beat_only_between_50_and_70_bpm() {
    let t0 = Instant::now();
    for tempo in [50.0, 70.0, 120.0] {
        let mut sel = ModeSelector::new(9);
        sel.on_beat(t0, &snap(tempo, 1.0, 1.0), 4);
        assert!(!sel.half_beat_due(t0 + Duration::from_secs(2), tempo), "tempo {tempo}");
    }
}
