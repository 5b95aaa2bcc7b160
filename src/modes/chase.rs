use super::{AnimationMode, ModeState, Stage};
use crate::error::OutputError;
use crate::palette::ring_index;

const SCROLL_LIMIT: i64 = 65535;

/// The palette as a ring scrolled one step per frame in a fixed direction.
pub struct Chase {
    state: ModeState,
    len: usize,
    offset: i64,
    direction: i64,
}

impl Chase {
    pub fn new(len: usize, seed: u64) -> Self {
        let mut mode = Self {
            state: ModeState::new(seed),
            len,
            offset: 0,
            direction: 1,
        };
        mode.reset();
        mode
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn set_offset(&mut self, offset: i64) {
        self.offset = offset;
    }

    pub fn direction(&self) -> i64 {
        self.direction
    }

    /// Palette entry shown on `pixel` this frame.
    pub fn palette_index(&self, pixel: usize) -> usize {
        ring_index(self.offset + pixel as i64, self.state.palette().len())
    }

    fn scroll(&mut self) {
        self.offset += self.direction;
        if self.offset >= SCROLL_LIMIT {
            self.offset -= SCROLL_LIMIT;
        } else if self.offset <= -SCROLL_LIMIT {
            self.offset += SCROLL_LIMIT;
        }
    }
}

impl AnimationMode for Chase {
    fn name(&self) -> &'static str {
        "Chase"
    }

    fn state(&self) -> &ModeState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ModeState {
        &mut self.state
    }

    fn reset(&mut self) {
        self.state.reselect_palette();
        self.direction = if self.state.rng.bool() { 1 } else { -1 };
        self.state.fps = 15;
    }

    fn render(&mut self, is_beat: bool, _volume: f32, stage: &mut Stage<'_>) -> Result<(), OutputError> {
        if self.state.recolor_due(is_beat) {
            self.state.flip_accents(stage.accents)?;
        }
        let palette = self.state.palette();
        for i in 0..self.len {
            stage.pixels.set_hsl(i, palette.get(self.palette_index(i)))?;
        }
        self.scroll();
        Ok(())
    }
}
