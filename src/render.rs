use crate::color::Hsl;
use crate::error::OutputError;
use crate::hardware::PixelStrip;
use std::time::{Duration, Instant};

/// Frame buffer in front of a [`PixelStrip`]. Pixels not written during a
/// frame keep their previous color.
pub struct PixelRenderer {
    strip: Box<dyn PixelStrip>,
    frame: Vec<(u8, u8, u8)>,
    commits: u64,
}

impl PixelRenderer {
    pub fn new(strip: Box<dyn PixelStrip>) -> Self {
        let len = strip.len();
        Self {
            strip,
            frame: vec![(0, 0, 0); len],
            commits: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.frame.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.is_empty()
    }

    pub fn commits(&self) -> u64 {
        self.commits
    }

    pub fn pixel(&self, index: usize) -> Option<(u8, u8, u8)> {
        self.frame.get(index).copied()
    }

    pub fn set_hsl(&mut self, index: usize, hsl: Hsl) -> Result<(), OutputError> {
        let len = self.frame.len();
        let px = self
            .frame
            .get_mut(index)
            .ok_or(OutputError::PixelIndex { index, len })?;
        *px = hsl.to_rgb8();
        Ok(())
    }

    /// Pushes the whole frame to the strip and latches it.
    pub fn commit(&mut self) -> Result<(), OutputError> {
        for (i, &(r, g, b)) in self.frame.iter().enumerate() {
            self.strip.set_pixel(i, r, g, b)?;
        }
        self.strip.show()?;
        self.commits += 1;
        Ok(())
    }

    pub fn blank(&mut self) -> Result<(), OutputError> {
        self.frame.fill((0, 0, 0));
        self.commit()
    }
}

/// Holds the render loop to a per-frame budget: work, then sleep for
/// whatever is left of `1/fps`.
#[derive(Debug, Clone, Copy)]
pub struct FramePacer {
    started: Instant,
}

impl FramePacer {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn started(&self) -> Instant {
        self.started
    }

    pub fn remaining(&self, fps: u32) -> Duration {
        let target = Duration::from_secs_f32(1.0 / fps.max(1) as f32);
        target.saturating_sub(self.started.elapsed())
    }

    /// Sleeps out the frame budget and returns how long it slept.
    pub fn finish(self, fps: u32) -> Duration {
        let left = self.remaining(fps);
        if left.is_zero() {
            log::trace!("frame over budget at {fps} fps");
        } else {
            std::thread::sleep(left);
        }
        left
    }
}
