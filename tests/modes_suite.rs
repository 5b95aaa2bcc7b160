use std::time::{Duration, Instant};

use beatstrip::accent::AccentBank;
use beatstrip::color::Hsl;
use beatstrip::hardware::{MemoryPwm, MemoryStrip, PwmLog, StripLog};
use beatstrip::modes::{
    make_mode, make_modes, AnimationMode, Chase, ModeKind, Shift, Shimmer, ShootingStar, Stage,
    MAX_HOT_SPOTS, SHIMMER_CHANCES,
};
use beatstrip::palette::{generate, PaletteId};
use beatstrip::render::PixelRenderer;

struct Rig {
    pixels: PixelRenderer,
    accents: AccentBank,
    strip: StripLog,
    pwm: PwmLog,
    now: Instant,
}

impl Rig {
    fn new(len: usize) -> Self {
        let (strip, strip_log) = MemoryStrip::recording(len);
        let (pwm, pwm_log) = MemoryPwm::new();
        let now = Instant::now();
        Self {
            pixels: PixelRenderer::new(Box::new(strip)),
            accents: AccentBank::new(Box::new(pwm), now),
            strip: strip_log,
            pwm: pwm_log,
            now,
        }
    }

    fn frame(&mut self, mode: &mut dyn AnimationMode, is_beat: bool) {
        self.advance(mode, is_beat, is_beat);
    }

    fn half_beat(&mut self, mode: &mut dyn AnimationMode) {
        self.advance(mode, true, false);
    }

    fn advance(&mut self, mode: &mut dyn AnimationMode, is_beat: bool, real_beat: bool) {
        self.now += Duration::from_millis(16);
        let mut stage = Stage {
            pixels: &mut self.pixels,
            accents: &mut self.accents,
        };
        mode.advance_frame(self.now, is_beat, real_beat, 0.5, &mut stage)
            .expect("memory outputs never fail");
    }
}

#[test]
fn modes_register_in_show_order() {
    let modes = make_modes(30, 1);
    let names = modes.iter().map(|m| m.name()).collect::<Vec<_>>();
    assert_eq!(names, ["Shooting Star", "Shimmer", "Chase", "Shift"]);
    for (kind, mode) in ModeKind::ALL.iter().zip(&modes) {
        assert_eq!(make_mode(*kind, 30, 1).name(), mode.name());
    }
}

#[test]
fn every_mode_commits_one_frame_per_advance() {
    for kind in ModeKind::ALL {
        let mut rig = Rig::new(40);
        let mut mode = make_mode(kind, 40, 7);
        for i in 0..25 {
            rig.frame(mode.as_mut(), i % 5 == 0);
        }
        assert_eq!(rig.strip.frame_count(), 25, "{}", mode.name());
        assert_eq!(mode.state().frame_count(), 25);
        let last = rig.strip.last_frame().expect("frame recorded");
        assert_eq!(last.len(), 40);
    }
}

#[test]
fn beat_recolors_the_accent_lights() {
    let mut rig = Rig::new(20);
    let mut mode = Chase::new(20, 3);
    rig.frame(&mut mode, true);
    assert!(rig.pwm.write_count() > 0);
    for light in rig.accents.lights() {
        assert!(!light.hsl().is_black(), "accent left dark after a beat");
    }
}

#[test]
fn no_beat_recolors_every_fps_frames() {
    let mut rig = Rig::new(20);
    let mut mode = Chase::new(20, 3);
    let fps = mode.fps() as usize;
    let mut recolors = 0;
    for _ in 0..fps * 3 {
        rig.pwm.clear();
        let before = rig.accents.lights().iter().map(|l| l.hsl()).collect::<Vec<_>>();
        rig.frame(&mut mode, false);
        let after = rig.accents.lights().iter().map(|l| l.hsl()).collect::<Vec<_>>();
        if before != after {
            recolors += 1;
        }
    }
    assert!((1..=3).contains(&recolors), "expected one recolor per {fps} frames, got {recolors}");
}

#[test]
fn shimmer_fps_follows_chance() {
    for seed in 0..20 {
        let mode = Shimmer::new(10, seed);
        assert!(SHIMMER_CHANCES.contains(&mode.chance()));
        let want = if mode.chance() >= 0.75 { 15 } else { 30 };
        assert_eq!(mode.fps(), want, "chance {}", mode.chance());
    }
}

#[test]
fn shimmer_with_full_chance_rewrites_every_pixel() {
    let mut rig = Rig::new(50);
    let mut mode = (0..100)
        .map(|seed| Shimmer::new(50, seed))
        .find(|m| m.chance() == 1.0)
        .expect("some seed draws chance 1.0");
    mode.state_mut().use_palette(generate(PaletteId::Mermaid, &mut fastrand::Rng::with_seed(1)));
    rig.frame(&mut mode, false);
    let frame = rig.strip.last_frame().expect("frame");
    assert!(frame.iter().all(|&px| px != (0, 0, 0)), "mermaid has no black entries");
}

#[test]
fn chase_index_stays_in_range_for_extreme_offsets() {
    let mut mode = Chase::new(130, 2);
    let len = mode.state().palette().len();
    for offset in [-65_534i64, -65_535, -1, 0, 1, 65_534, 65_535, 1 << 40, -(1 << 40)] {
        mode.set_offset(offset);
        for px in [0usize, 1, 64, 129] {
            assert!(mode.palette_index(px) < len, "offset {offset} pixel {px}");
        }
    }
}

#[test]
fn chase_scroll_wraps_within_bounds() {
    let mut rig = Rig::new(10);
    let mut mode = Chase::new(10, 4);
    let start = 65_534 * mode.direction();
    mode.set_offset(start);
    rig.frame(&mut mode, false);
    rig.frame(&mut mode, false);
    assert!(mode.offset().abs() < 65_535, "offset {}", mode.offset());
    assert_eq!(mode.state().fps(), 15);
}

#[test]
fn chase_draws_palette_ring() {
    let mut rig = Rig::new(12);
    let mut mode = Chase::new(12, 5);
    let palette = generate(PaletteId::Mermaid, &mut fastrand::Rng::with_seed(0));
    mode.state_mut().use_palette(palette.clone());
    mode.set_offset(3);
    rig.frame(&mut mode, false);
    let frame = rig.strip.last_frame().expect("frame");
    for (i, px) in frame.iter().enumerate() {
        assert_eq!(*px, palette.cyclic(3 + i as i64).to_rgb8(), "pixel {i}");
    }
}

#[test]
fn shift_indices_stay_in_range() {
    let mut rig = Rig::new(130);
    let mut mode = Shift::new(130, 8);
    assert!((10..30).contains(&mode.fps()));
    let (fwd, back) = mode.colormaps();
    let (fwd_len, back_len) = (fwd.len(), back.len());
    for _ in 0..500 {
        rig.frame(&mut mode, false);
        for px in 0..130 {
            let (f, b) = mode.colormap_indices(px);
            assert!(f < fwd_len && b < back_len);
        }
    }
}

#[test]
fn shift_maps_scroll_in_opposite_directions() {
    let mut rig = Rig::new(30);
    let mut mode = Shift::new(30, 9);
    let (fwd_len, back_len) = {
        let (f, b) = mode.colormaps();
        (f.len(), b.len())
    };
    rig.frame(&mut mode, false);
    assert_eq!(mode.offsets(), (1 % fwd_len, back_len - 1));
}

#[test]
fn shift_maps_hold_the_same_colors() {
    let mode = Shift::new(60, 10);
    let (fwd, back) = mode.colormaps();
    assert_eq!(fwd.len(), back.len());
    let lit = |m: &[Option<Hsl>]| m.iter().filter(|c| c.is_some()).count();
    assert_eq!(lit(fwd), lit(back), "both maps come from one tiling");
}

#[test]
fn shooting_star_starts_with_two_stars() {
    let mode = ShootingStar::new(40, 11);
    let spots = mode.hot_spots();
    assert_eq!(spots.len(), 2);
    assert_eq!(spots[0].position, 0.0);
    assert_eq!(spots[0].velocity, 1.0);
    assert_eq!(spots[1].position, 39.0);
    assert_eq!(spots[1].velocity, -1.0);
    assert_eq!(mode.fps(), 60);
}

#[test]
fn shooting_star_caps_hot_spots_and_keeps_them_on_the_strip() {
    let mut rig = Rig::new(200);
    let mut mode = ShootingStar::new(200, 12);
    for _ in 0..2_000 {
        rig.frame(&mut mode, true);
        let spots = mode.hot_spots();
        assert!(spots.len() <= MAX_HOT_SPOTS, "{} hot spots", spots.len());
        for s in spots {
            assert!(s.position >= 0.0 && s.position < 200.0, "stray spot at {}", s.position);
            assert!(!s.color.is_black());
        }
    }
}

#[test]
fn shooting_star_half_beats_recolor_but_never_spawn() {
    let mut rig = Rig::new(400);
    let mut mode = ShootingStar::new(400, 16);
    let mut count = mode.hot_spots().len();
    for _ in 0..200 {
        let before = rig.accents.lights().iter().map(|l| l.hsl()).collect::<Vec<_>>();
        rig.half_beat(&mut mode);
        let after = rig.accents.lights().iter().map(|l| l.hsl()).collect::<Vec<_>>();
        assert_ne!(before, after, "half beat recolors the accents");
        assert!(mode.hot_spots().len() <= count, "star spawned on a half beat");
        count = mode.hot_spots().len();
    }
}

#[test]
fn shooting_star_trail_fades_to_black() {
    let mut rig = Rig::new(10);
    let mut mode = ShootingStar::new(10, 13);
    rig.frame(&mut mode, false);
    assert_eq!(mode.lightness(0), Some(1.0), "head drawn at full lightness");
    for _ in 0..200 {
        rig.frame(&mut mode, false);
    }
    assert!(mode.hot_spots().is_empty());
    for px in 0..10 {
        assert_eq!(mode.lightness(px), Some(0.0), "pixel {px} still glowing");
    }
    let frame = rig.strip.last_frame().expect("frame");
    assert!(frame.iter().all(|&px| px == (0, 0, 0)));
}

#[test]
fn shooting_star_trail_decays_by_a_fifth_per_frame() {
    let mut rig = Rig::new(40);
    let mut mode = ShootingStar::new(40, 14);
    rig.frame(&mut mode, false);
    rig.frame(&mut mode, false);
    let l = mode.lightness(0).expect("pixel 0");
    assert!((l - 0.8).abs() < 1e-6, "lightness {l}");
}

#[test]
fn reset_reseeds_mode_parameters() {
    let mut mode = Shift::new(50, 15);
    let mut fps = std::collections::HashSet::new();
    for _ in 0..40 {
        mode.reset();
        fps.insert(mode.fps());
    }
    assert!(fps.len() > 1, "fps should be re-drawn on reset");
}
