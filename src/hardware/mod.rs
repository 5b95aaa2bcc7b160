mod memory;
mod preview;

pub use memory::{MemoryPwm, MemoryStrip, PwmLog, StripLog};
pub use preview::{preview_outputs, PreviewPwm, PreviewStrip};

use crate::error::OutputError;

/// 12-bit PWM resolution shared by every accent channel.
pub const PWM_FULL_SCALE: u16 = 4096;
/// Off tick used for an "on" pulse: the full period.
pub const PWM_PERIOD_END: u16 = 4095;
pub const PWM_CHANNELS: u8 = 16;

/// Addressable pixel strip. Pixels written with `set_pixel` become visible
/// together on the next `show`.
pub trait PixelStrip {
    fn len(&self) -> usize;
    fn set_pixel(&mut self, index: usize, r: u8, g: u8, b: u8) -> Result<(), OutputError>;
    fn show(&mut self) -> Result<(), OutputError>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// PWM controller driving the accent lights and the thruster.
pub trait PwmBus {
    fn set_duty(&mut self, channel: u8, on: u16, off: u16) -> Result<(), OutputError>;
}

/// Intensity in 0..1 that a channel emits for the given duty ticks.
pub fn duty_intensity(on: u16, off: u16) -> f32 {
    if off == 0 {
        return 0.0;
    }
    (PWM_FULL_SCALE.saturating_sub(on)) as f32 / PWM_FULL_SCALE as f32
}
