use super::{AnimationMode, ModeState, Stage};
use crate::color::Hsl;
use crate::error::OutputError;
use crate::palette::{ring_index, Palette};

/// Neighbor offsets a fuzz pass swaps with, weighted toward the near ones.
pub const FUZZ_STEPS: [i64; 6] = [2, 1, 1, -1, -1, -2];
const FUZZ_PASSES: usize = 10;
const BAND_WIDTH: usize = 5;
const GAP_WIDTH: usize = 10;
const MAX_BLACK_RUN: usize = 3;

type Colormap = Vec<Option<Hsl>>;

/// Two fuzzed colormaps sliding past each other in opposite directions;
/// the backward map paints over the forward one wherever it has a color.
pub struct Shift {
    state: ModeState,
    len: usize,
    forward: Colormap,
    backward: Colormap,
    forward_offset: usize,
    backward_offset: usize,
}

impl Shift {
    pub fn new(len: usize, seed: u64) -> Self {
        let mut mode = Self {
            state: ModeState::new(seed),
            len,
            forward: Vec::new(),
            backward: Vec::new(),
            forward_offset: 0,
            backward_offset: 0,
        };
        mode.reset();
        mode
    }

    pub fn colormaps(&self) -> (&[Option<Hsl>], &[Option<Hsl>]) {
        (&self.forward, &self.backward)
    }

    pub fn offsets(&self) -> (usize, usize) {
        (self.forward_offset, self.backward_offset)
    }

    /// Colormap entries used for `pixel` this frame, forward then backward.
    pub fn colormap_indices(&self, pixel: usize) -> (usize, usize) {
        (
            ring_index((pixel + self.forward_offset) as i64, self.forward.len()),
            ring_index((pixel + self.backward_offset) as i64, self.backward.len()),
        )
    }

    fn scroll(&mut self) {
        self.forward_offset = (self.forward_offset + 1) % self.forward.len();
        self.backward_offset = (self.backward_offset + self.backward.len() - 1) % self.backward.len();
    }
}

/// Tiles the palette into bands separated by transparent gaps until it
/// covers `len` pixels. Bands past the middle of the strip fade toward black
/// and runs of more than three black bands are skipped.
pub fn tile_colormap(palette: &Palette, len: usize) -> Colormap {
    let half = len as f32 / 2.0;
    let mut map: Colormap = Vec::new();
    let mut black_run = 0usize;
    while map.len() < len {
        let before = map.len();
        for &color in palette.colors() {
            let past_middle = map.len() as f32 - half;
            let mut c = color;
            if past_middle > 0.0 {
                c.l = (c.l * (1.0 - past_middle / half)).max(0.0);
            }
            if c.is_black() {
                black_run += 1;
            } else {
                black_run = 0;
            }
            if black_run <= MAX_BLACK_RUN {
                map.extend(std::iter::repeat_n(Some(c), BAND_WIDTH));
                map.extend(std::iter::repeat_n(None, GAP_WIDTH));
            }
        }
        if map.len() == before {
            break;
        }
    }
    if map.is_empty() {
        map.push(None);
    }
    map
}

/// Repeated local random transpositions.
pub fn fuzz(map: &mut Colormap, rng: &mut fastrand::Rng) {
    let n = map.len();
    for _ in 0..FUZZ_PASSES {
        for i in 0..n {
            let step = FUZZ_STEPS[rng.usize(..FUZZ_STEPS.len())];
            map.swap(i, ring_index(i as i64 + step, n));
        }
    }
}

impl AnimationMode for Shift {
    fn name(&self) -> &'static str {
        "Shift"
    }

    fn state(&self) -> &ModeState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ModeState {
        &mut self.state
    }

    fn reset(&mut self) {
        self.state.reselect_palette();
        self.state.fps = self.state.rng.u32(10..30);

        let base = tile_colormap(self.state.palette(), self.len);
        let mut backward = base.clone();
        backward.reverse();
        let mut forward = base;
        fuzz(&mut forward, &mut self.state.rng);
        fuzz(&mut backward, &mut self.state.rng);

        self.forward = forward;
        self.backward = backward;
        self.forward_offset = 0;
        self.backward_offset = 0;
    }

    fn render(&mut self, is_beat: bool, _volume: f32, stage: &mut Stage<'_>) -> Result<(), OutputError> {
        if self.state.recolor_due(is_beat) {
            self.state.flip_accents(stage.accents)?;
        }
        for i in 0..self.len {
            let (f, b) = self.colormap_indices(i);
            if let Some(c) = self.forward[f] {
                stage.pixels.set_hsl(i, c)?;
            }
            if let Some(c) = self.backward[b] {
                stage.pixels.set_hsl(i, c)?;
            }
        }
        self.scroll();
        Ok(())
    }
}
