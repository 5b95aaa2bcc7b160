use super::{AnimationMode, ModeState, Stage};
use crate::color::Hsl;
use crate::error::OutputError;

pub const MAX_HOT_SPOTS: usize = 16;
const TRAIL_DECAY: f32 = 0.8;
const TRAIL_FLOOR: f32 = 1e-4;
const FORWARD_SPEEDS: [f32; 10] = [1.0, 1.0, 1.0, 1.0, 1.0, 0.75, 0.5, 0.5, 0.25, 0.125];
const REVERSE_SPEEDS: [f32; 6] = [-1.0, -1.0, -1.0, -0.5, -0.5, -0.25];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HotSpot {
    pub position: f32,
    pub color: Hsl,
    pub velocity: f32,
}

/// Bright points travelling along the strip and leaving a fading trail.
pub struct ShootingStar {
    state: ModeState,
    len: usize,
    field: Vec<Hsl>,
    hot_spots: Vec<HotSpot>,
    color_index: usize,
}

impl ShootingStar {
    pub fn new(len: usize, seed: u64) -> Self {
        let mut mode = Self {
            state: ModeState::new(seed),
            len,
            field: vec![Hsl::BLACK; len],
            hot_spots: Vec::with_capacity(MAX_HOT_SPOTS),
            color_index: 0,
        };
        mode.reset();
        if len > 0 {
            let first = mode.state.palette.get().random_non_black(&mut mode.state.rng);
            let last = mode.state.palette.get().random_non_black(&mut mode.state.rng);
            if let Some(color) = first {
                mode.hot_spots.push(HotSpot { position: 0.0, color, velocity: 1.0 });
            }
            if let Some(color) = last {
                mode.hot_spots.push(HotSpot {
                    position: (len - 1) as f32,
                    color,
                    velocity: -1.0,
                });
            }
        }
        mode
    }

    pub fn hot_spots(&self) -> &[HotSpot] {
        &self.hot_spots
    }

    pub fn lightness(&self, pixel: usize) -> Option<f32> {
        self.field.get(pixel).map(|c| c.l)
    }

    /// Next non-black palette entry in round-robin order.
    fn next_star_color(&mut self) -> Option<Hsl> {
        let colors = self.state.palette().colors();
        for _ in 0..colors.len() {
            if self.color_index >= colors.len() {
                self.color_index = 0;
            }
            let color = colors[self.color_index];
            self.color_index += 1;
            if !color.is_black() {
                return Some(color);
            }
        }
        None
    }

    fn spawn(&mut self) {
        let last = self.len.saturating_sub(1) as f32;
        let forward = self.next_star_color();
        if self.state.rng.usize(..3) == 0 {
            let velocity = FORWARD_SPEEDS[self.state.rng.usize(..FORWARD_SPEEDS.len())];
            if let Some(color) = forward {
                self.hot_spots.push(HotSpot { position: 0.0, color, velocity });
            }
        }
        if self.state.rng.usize(..4) == 0 && self.hot_spots.len() < MAX_HOT_SPOTS {
            let velocity = REVERSE_SPEEDS[self.state.rng.usize(..REVERSE_SPEEDS.len())];
            if let Some(color) = self.next_star_color() {
                self.hot_spots.push(HotSpot { position: last, color, velocity });
            }
        }
    }
}

impl AnimationMode for ShootingStar {
    fn name(&self) -> &'static str {
        "Shooting Star"
    }

    fn state(&self) -> &ModeState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ModeState {
        &mut self.state
    }

    fn reset(&mut self) {
        self.state.reselect_palette();
        self.state.fps = 60;
        self.color_index = 0;
    }

    fn render(&mut self, is_beat: bool, _volume: f32, stage: &mut Stage<'_>) -> Result<(), OutputError> {
        if self.state.recolor_due(is_beat) {
            self.state.flip_accents(stage.accents)?;
        }
        if self.state.real_beat() && self.hot_spots.len() < MAX_HOT_SPOTS {
            self.spawn();
        }

        for px in &mut self.field {
            if px.l > 0.0 {
                px.l *= TRAIL_DECAY;
                if px.l < TRAIL_FLOOR {
                    px.l = 0.0;
                }
            }
        }

        let len = self.len as f32;
        for spot in &mut self.hot_spots {
            let x = (spot.position.round() as usize).min(self.len.saturating_sub(1));
            if let Some(px) = self.field.get_mut(x) {
                *px = spot.color.with_lightness(1.0);
            }
            spot.position += spot.velocity;
        }
        self.hot_spots.retain(|s| s.position >= 0.0 && s.position < len);

        for (i, &px) in self.field.iter().enumerate() {
            stage.pixels.set_hsl(i, px)?;
        }
        Ok(())
    }
}
