//! Accent lights and the thruster, both on the shared PWM bus.

use crate::color::{wrap_unit, Hsl, Rgb};
use crate::error::OutputError;
use crate::hardware::{PwmBus, PWM_FULL_SCALE, PWM_PERIOD_END};
use crate::palette::Palette;
use std::time::Instant;

pub const ACCENT_COUNT: usize = 5;

/// Red/green/blue channel triples in physical order.
pub const ACCENT_CHANNELS: [[u8; 3]; ACCENT_COUNT] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [9, 10, 11],
    [12, 13, 14],
];
pub const THRUSTER_CHANNEL: u8 = 15;

/// Below this a channel is switched fully off.
pub const OFF_THRESHOLD: f32 = 0.01;

const WRITE_HUE_TOLERANCE: f32 = 0.05;
const WRITE_SL_TOLERANCE: f32 = 1e-5;
const RECOLOR_TOLERANCE: f32 = 0.1;
const DIM_LIGHTNESS: f32 = 0.25;

/// (on, off) ticks for a channel intensity.
pub fn duty_for(intensity: f32) -> (u16, u16) {
    if intensity < OFF_THRESHOLD {
        return (0, 0);
    }
    let scaled = (PWM_FULL_SCALE as f32 * intensity.min(1.0)).round() as u16;
    (PWM_FULL_SCALE - scaled, PWM_PERIOD_END)
}

#[derive(Debug, Clone)]
pub struct AccentLight {
    channels: [u8; 3],
    rgb: Rgb,
    hsl: Hsl,
}

impl AccentLight {
    pub fn new(channels: [u8; 3]) -> Self {
        Self {
            channels,
            rgb: Rgb::BLACK,
            hsl: Hsl::BLACK,
        }
    }

    pub fn hsl(&self) -> Hsl {
        self.hsl
    }

    pub fn rgb(&self) -> Rgb {
        self.rgb
    }

    /// Writes to the bus only when `hsl` differs from the cached color.
    /// Returns whether a write happened.
    pub fn set_hsl(&mut self, bus: &mut dyn PwmBus, hsl: Hsl) -> Result<bool, OutputError> {
        if hsl.close_to(&self.hsl, WRITE_HUE_TOLERANCE, WRITE_SL_TOLERANCE) {
            return Ok(false);
        }
        self.hsl = hsl;
        self.rgb = hsl.to_rgb();
        self.write(bus)?;
        Ok(true)
    }

    /// Unconditional write, used for startup and shutdown blanking.
    pub fn force_rgb(&mut self, bus: &mut dyn PwmBus, rgb: Rgb) -> Result<(), OutputError> {
        self.rgb = rgb;
        self.hsl = rgb.to_hsl();
        self.write(bus)
    }

    fn write(&self, bus: &mut dyn PwmBus) -> Result<(), OutputError> {
        for (ch, level) in self.channels.iter().zip(self.rgb.channels()) {
            let (on, off) = duty_for(level);
            bus.set_duty(*ch, on, off)?;
        }
        Ok(())
    }
}

/// Single-channel beat flash: dark for the first 1/8 s after a blink, then a
/// linear ramp to full brightness by 1/2 s.
#[derive(Debug, Clone)]
pub struct Thruster {
    channel: u8,
    brightness: f32,
    blinked_at: Instant,
}

impl Thruster {
    pub fn new(channel: u8, now: Instant) -> Self {
        Self {
            channel,
            brightness: 0.0,
            blinked_at: now,
        }
    }

    pub fn brightness(&self) -> f32 {
        self.brightness
    }

    pub fn blink(&mut self, now: Instant) {
        self.brightness = 0.0;
        self.blinked_at = now;
    }

    pub fn go(&mut self, bus: &mut dyn PwmBus, now: Instant) -> Result<(), OutputError> {
        if self.brightness >= 1.0 {
            return Ok(());
        }
        let elapsed = now.saturating_duration_since(self.blinked_at).as_secs_f32();
        self.brightness = (elapsed * 4.0 - 0.5).clamp(0.0, 1.0);
        let (on, off) = duty_for(self.brightness);
        bus.set_duty(self.channel, on, off)
    }

    pub fn off(&mut self, bus: &mut dyn PwmBus) -> Result<(), OutputError> {
        self.brightness = 0.0;
        bus.set_duty(self.channel, 0, 0)
    }
}

/// The accent lights in physical order plus the thruster, owning the bus.
pub struct AccentBank {
    bus: Box<dyn PwmBus>,
    lights: Vec<AccentLight>,
    thruster: Thruster,
}

impl AccentBank {
    pub fn new(bus: Box<dyn PwmBus>, now: Instant) -> Self {
        Self {
            bus,
            lights: ACCENT_CHANNELS.iter().map(|&c| AccentLight::new(c)).collect(),
            thruster: Thruster::new(THRUSTER_CHANNEL, now),
        }
    }

    pub fn lights(&self) -> &[AccentLight] {
        &self.lights
    }

    pub fn thruster(&self) -> &Thruster {
        &self.thruster
    }

    pub fn blink(&mut self, now: Instant) {
        self.thruster.blink(now);
    }

    pub fn thruster_go(&mut self, now: Instant) -> Result<(), OutputError> {
        self.thruster.go(&mut *self.bus, now)
    }

    pub fn set_light(&mut self, idx: usize, hsl: Hsl) -> Result<bool, OutputError> {
        self.lights[idx].set_hsl(&mut *self.bus, hsl)
    }

    /// Turns every light and the thruster off.
    pub fn blank(&mut self) -> Result<(), OutputError> {
        for light in &mut self.lights {
            light.force_rgb(&mut *self.bus, Rgb::BLACK)?;
        }
        self.thruster.off(&mut *self.bus)
    }

    /// Gives every light a new palette color, walking the lights in physical
    /// order. A light never takes its own previous color or the color just
    /// given to its predecessor; when the palette has nothing suitable the
    /// color is derived from the predecessor instead.
    pub fn flip_colors(
        &mut self,
        palette: &Palette,
        rng: &mut fastrand::Rng,
    ) -> Result<(), OutputError> {
        let Some(first) = self.lights.first() else {
            return Ok(());
        };
        let mut neighbor = first.hsl();
        let mut candidates = palette.colors().to_vec();
        for idx in 0..self.lights.len() {
            let previous = self.lights[idx].hsl();
            rng.shuffle(&mut candidates);
            let chosen = candidates
                .iter()
                .filter(|c| !c.is_black())
                .map(|c| boosted(*c))
                .find(|c| {
                    !c.close_to(&previous, RECOLOR_TOLERANCE, RECOLOR_TOLERANCE)
                        && !c.close_to(&neighbor, RECOLOR_TOLERANCE, RECOLOR_TOLERANCE)
                })
                .unwrap_or_else(|| boosted(fallback_from(neighbor, rng)));
            self.set_light(idx, chosen)?;
            neighbor = self.lights[idx].hsl();
        }
        Ok(())
    }
}

fn boosted(c: Hsl) -> Hsl {
    if c.l < DIM_LIGHTNESS { c.with_lightness(c.l + 0.5) } else { c }
}

/// Half a turn of lightness and a 1/3..2/3 turn of hue and saturation away
/// from `neighbor`.
pub fn fallback_from(neighbor: Hsl, rng: &mut fastrand::Rng) -> Hsl {
    let mut jitter = || 1.0 / 3.0 + rng.f32() / 3.0;
    Hsl {
        h: wrap_unit(neighbor.h, jitter()),
        s: wrap_unit(neighbor.s, jitter()),
        l: wrap_unit(neighbor.l, 0.5),
    }
}
