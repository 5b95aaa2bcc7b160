use crate::accent::AccentBank;
use crate::audio::SharedSnapshot;
use crate::error::{OutputError, ShowError};
use crate::hardware::{PixelStrip, PwmBus};
use crate::modes::{make_modes, AnimationMode, ModeKind, Stage};
use crate::render::PixelRenderer;
use crate::selector::{ModeSelector, SwitchDecision};
use std::time::Instant;

/// What one render-loop iteration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub fps: u32,
    pub beat: bool,
    pub half_beat: bool,
    pub switch: Option<SwitchDecision>,
}

/// Owns the outputs, every animation mode and the selector; advances the
/// show by one frame per [`tick`](Self::tick).
pub struct ShowEngine {
    modes: Vec<Box<dyn AnimationMode>>,
    active: usize,
    selector: ModeSelector,
    pixels: PixelRenderer,
    accents: AccentBank,
}

impl ShowEngine {
    pub fn new(
        strip: Box<dyn PixelStrip>,
        bus: Box<dyn PwmBus>,
        initial: ModeKind,
        seed: u64,
        now: Instant,
    ) -> Result<Self, OutputError> {
        let mut seeder = fastrand::Rng::with_seed(seed);
        let modes = make_modes(strip.len(), seeder.u64(..));
        let selector = ModeSelector::new(seeder.u64(..));
        Self::with_modes(modes, initial.index(), selector, strip, bus, now)
    }

    /// Blanks the strip and every accent light before returning.
    pub fn with_modes(
        modes: Vec<Box<dyn AnimationMode>>,
        active: usize,
        selector: ModeSelector,
        strip: Box<dyn PixelStrip>,
        bus: Box<dyn PwmBus>,
        now: Instant,
    ) -> Result<Self, OutputError> {
        let mut engine = Self {
            active: active.min(modes.len().saturating_sub(1)),
            modes,
            selector,
            pixels: PixelRenderer::new(strip),
            accents: AccentBank::new(bus, now),
        };
        engine.blank()?;
        Ok(engine)
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active_mode(&self) -> Option<&dyn AnimationMode> {
        self.modes.get(self.active).map(|m| m.as_ref())
    }

    pub fn mode_count(&self) -> usize {
        self.modes.len()
    }

    pub fn selector(&self) -> &ModeSelector {
        &self.selector
    }

    pub fn pixels(&self) -> &PixelRenderer {
        &self.pixels
    }

    pub fn accents(&self) -> &AccentBank {
        &self.accents
    }

    /// Target frame rate of the active mode.
    pub fn fps(&self) -> u32 {
        self.active_mode().map_or(60, |m| m.fps())
    }

    /// Consumes the beat latch, lets the selector react to a real beat,
    /// draws one frame of the active mode and drives the thruster.
    pub fn tick(&mut self, now: Instant, shared: &SharedSnapshot) -> Result<Tick, ShowError> {
        let beat = shared.take_beat();
        let snap = shared.load();
        let mut switch = None;
        let mut half_beat = false;

        if beat {
            self.accents.blink(now);
            switch = self.selector.on_beat(now, &snap, self.modes.len());
            if let Some(decision) = switch {
                self.switch_to(decision);
            }
            self.draw(now, true, true, snap.volume)?;
            self.selector.count_beat();
        } else {
            half_beat = self.selector.half_beat_due(now, snap.tempo_bpm);
            self.draw(now, half_beat, false, snap.volume)?;
        }

        self.accents.thruster_go(now)?;
        Ok(Tick {
            fps: self.fps(),
            beat,
            half_beat,
            switch,
        })
    }

    /// Strip and accent lights to black, thruster off.
    pub fn blank(&mut self) -> Result<(), OutputError> {
        self.pixels.blank()?;
        self.accents.blank()
    }

    fn switch_to(&mut self, decision: SwitchDecision) {
        let Some(mode) = self.modes.get_mut(decision.next_mode) else {
            return;
        };
        mode.reset();
        self.active = decision.next_mode;
        log::info!(
            "{}: mode {}; palette {}",
            decision.reason,
            mode.name(),
            mode.palette_name()
        );
    }

    fn draw(
        &mut self,
        now: Instant,
        is_beat: bool,
        real_beat: bool,
        volume: f32,
    ) -> Result<(), OutputError> {
        let Some(mode) = self.modes.get_mut(self.active) else {
            return Ok(());
        };
        let mut stage = Stage {
            pixels: &mut self.pixels,
            accents: &mut self.accents,
        };
        mode.advance_frame(now, is_beat, real_beat, volume, &mut stage)
    }
}
