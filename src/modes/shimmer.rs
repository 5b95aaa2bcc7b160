use super::{AnimationMode, ModeState, Stage};
use crate::error::OutputError;

/// Per-frame resample probabilities a reset chooses from.
pub const SHIMMER_CHANCES: [f32; 4] = [0.1, 0.5, 0.75, 1.0];

/// Every pixel independently re-rolls a palette color with probability `chance`.
pub struct Shimmer {
    state: ModeState,
    len: usize,
    chance: f32,
}

impl Shimmer {
    pub fn new(len: usize, seed: u64) -> Self {
        let mut mode = Self {
            state: ModeState::new(seed),
            len,
            chance: 1.0,
        };
        mode.reset();
        mode
    }

    pub fn chance(&self) -> f32 {
        self.chance
    }
}

impl AnimationMode for Shimmer {
    fn name(&self) -> &'static str {
        "Shimmer"
    }

    fn state(&self) -> &ModeState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ModeState {
        &mut self.state
    }

    fn reset(&mut self) {
        self.state.reselect_palette();
        self.chance = SHIMMER_CHANCES[self.state.rng.usize(..SHIMMER_CHANCES.len())];
        self.state.fps = if self.chance >= 0.75 { 15 } else { 30 };
    }

    fn render(&mut self, is_beat: bool, _volume: f32, stage: &mut Stage<'_>) -> Result<(), OutputError> {
        if self.state.recolor_due(is_beat) {
            self.state.flip_accents(stage.accents)?;
        }
        let st = &mut self.state;
        let palette = st.palette.get();
        for i in 0..self.len {
            if st.rng.f32() < self.chance {
                stage.pixels.set_hsl(i, palette.random(&mut st.rng))?;
            }
        }
        Ok(())
    }
}
