mod chase;
mod shift;
mod shimmer;
mod shooting_star;

pub use chase::Chase;
pub use shift::{Shift, FUZZ_STEPS};
pub use shimmer::{Shimmer, SHIMMER_CHANCES};
pub use shooting_star::{HotSpot, ShootingStar, MAX_HOT_SPOTS};

use crate::accent::AccentBank;
use crate::error::OutputError;
use crate::palette::{Palette, PaletteCache};
use crate::render::PixelRenderer;
use clap::ValueEnum;
use std::time::{Duration, Instant};

/// Without a real beat for this long, modes recolor the accents on their own.
pub const NO_BEAT_AFTER: Duration = Duration::from_secs(2);
pub const SUBBEATS: u32 = 8;
const DEFAULT_BEAT_INTERVAL: Duration = Duration::from_millis(250);

/// Everything a mode draws to during one frame.
pub struct Stage<'a> {
    pub pixels: &'a mut PixelRenderer,
    pub accents: &'a mut AccentBank,
}

/// Per-mode bookkeeping shared by every animation.
pub struct ModeState {
    pub(crate) rng: fastrand::Rng,
    pub(crate) palette: PaletteCache,
    pub(crate) fps: u32,
    frame_count: u64,
    last_beat: Option<Instant>,
    beat_interval: Duration,
    subbeat: u32,
    last_subbeat: Option<u32>,
    is_subbeat: bool,
    no_beat: bool,
    real_beat: bool,
}

impl ModeState {
    pub fn new(seed: u64) -> Self {
        let mut rng = fastrand::Rng::with_seed(seed);
        let palette = PaletteCache::new(&mut rng);
        Self {
            rng,
            palette,
            fps: 60,
            frame_count: 0,
            last_beat: None,
            beat_interval: DEFAULT_BEAT_INTERVAL,
            subbeat: 0,
            last_subbeat: None,
            is_subbeat: false,
            no_beat: true,
            real_beat: false,
        }
    }

    pub fn palette(&self) -> &Palette {
        self.palette.get()
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn subbeat(&self) -> u32 {
        self.subbeat
    }

    pub fn is_subbeat(&self) -> bool {
        self.is_subbeat
    }

    pub fn no_beat(&self) -> bool {
        self.no_beat
    }

    pub fn beat_interval(&self) -> Duration {
        self.beat_interval
    }

    /// True when this frame was triggered by a detected beat rather than a
    /// synthesized half-beat.
    pub fn real_beat(&self) -> bool {
        self.real_beat
    }

    /// Drops the memoized palette and picks a fresh one.
    pub fn reselect_palette(&mut self) {
        self.palette.reselect(&mut self.rng);
    }

    /// Replaces the palette outright; the next reset picks randomly again.
    pub fn use_palette(&mut self, palette: Palette) {
        self.palette.set(palette);
    }

    /// A real beat, or every `fps`-th frame once beats have stopped.
    pub fn recolor_due(&self, is_beat: bool) -> bool {
        is_beat || (self.no_beat && self.frame_count % self.fps.max(1) as u64 == 0)
    }

    pub fn flip_accents(&mut self, accents: &mut AccentBank) -> Result<(), OutputError> {
        accents.flip_colors(self.palette.get(), &mut self.rng)
    }

    fn begin_frame(&mut self, now: Instant, real_beat: bool) {
        self.subbeat = match self.last_beat {
            Some(at) => {
                let slot = self.beat_interval.as_secs_f32() / SUBBEATS as f32;
                let since = now.saturating_duration_since(at).as_secs_f32();
                ((since / slot) as u32).min(SUBBEATS - 1)
            }
            None => 0,
        };
        self.is_subbeat = self.last_subbeat != Some(self.subbeat);

        self.real_beat = real_beat;
        if real_beat {
            if let Some(prev) = self.last_beat {
                // Gaps spanning a pause or an inactive stretch are not a tempo.
                let gap = now.saturating_duration_since(prev);
                if !gap.is_zero() && gap <= NO_BEAT_AFTER {
                    self.beat_interval = gap;
                }
            }
            self.last_beat = Some(now);
        }
        self.no_beat = match self.last_beat {
            Some(at) => now.saturating_duration_since(at) > NO_BEAT_AFTER,
            None => true,
        };
    }

    fn end_frame(&mut self) {
        self.last_subbeat = Some(self.subbeat);
        self.frame_count += 1;
    }
}

pub trait AnimationMode {
    fn name(&self) -> &'static str;
    fn state(&self) -> &ModeState;
    fn state_mut(&mut self) -> &mut ModeState;

    /// Re-randomizes the mode's parameters and picks a new palette.
    fn reset(&mut self);

    /// Writes this frame's pixels (and accent recolors) without committing.
    fn render(&mut self, is_beat: bool, volume: f32, stage: &mut Stage<'_>)
        -> Result<(), OutputError>;

    /// `is_beat` drives accent recoloring and is also set for synthesized
    /// half-beats; `real_beat` marks a detected beat and alone feeds the
    /// beat-interval estimate.
    fn advance_frame(
        &mut self,
        now: Instant,
        is_beat: bool,
        real_beat: bool,
        volume: f32,
        stage: &mut Stage<'_>,
    ) -> Result<(), OutputError> {
        self.state_mut().begin_frame(now, real_beat);
        self.render(is_beat, volume, stage)?;
        stage.pixels.commit()?;
        self.state_mut().end_frame();
        Ok(())
    }

    fn fps(&self) -> u32 {
        self.state().fps()
    }

    fn palette_name(&self) -> &'static str {
        self.state().palette().name()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeKind {
    ShootingStar,
    Shimmer,
    Chase,
    Shift,
}

impl ModeKind {
    /// Registration order; also the index into [`make_modes`].
    pub const ALL: [ModeKind; 4] = [Self::ShootingStar, Self::Shimmer, Self::Chase, Self::Shift];

    pub fn index(self) -> usize {
        match self {
            Self::ShootingStar => 0,
            Self::Shimmer => 1,
            Self::Chase => 2,
            Self::Shift => 3,
        }
    }
}

pub fn make_mode(kind: ModeKind, len: usize, seed: u64) -> Box<dyn AnimationMode> {
    match kind {
        ModeKind::ShootingStar => Box::new(ShootingStar::new(len, seed)),
        ModeKind::Shimmer => Box::new(Shimmer::new(len, seed)),
        ModeKind::Chase => Box::new(Chase::new(len, seed)),
        ModeKind::Shift => Box::new(Shift::new(len, seed)),
    }
}

/// One instance of every mode, in [`ModeKind::ALL`] order.
pub fn make_modes(len: usize, seed: u64) -> Vec<Box<dyn AnimationMode>> {
    let mut seeder = fastrand::Rng::with_seed(seed);
    ModeKind::ALL
        .iter()
        .map(|&kind| make_mode(kind, len, seeder.u64(..)))
        .collect()
}
