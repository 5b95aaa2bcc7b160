use super::{PixelStrip, PwmBus, PWM_CHANNELS};
use crate::error::OutputError;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Default)]
struct StripState {
    pending: Vec<(u8, u8, u8)>,
    frames: Vec<Vec<(u8, u8, u8)>>,
    keep_frames: bool,
}

/// Strip that keeps committed frames in memory.
pub struct MemoryStrip {
    state: Rc<RefCell<StripState>>,
}

/// Read side of a [`MemoryStrip`].
#[derive(Clone)]
pub struct StripLog {
    state: Rc<RefCell<StripState>>,
}

impl MemoryStrip {
    /// Strip of `len` pixels that records every committed frame.
    pub fn recording(len: usize) -> (Self, StripLog) {
        Self::build(len, true)
    }

    /// Strip of `len` pixels that only remembers the last frame.
    pub fn discarding(len: usize) -> Self {
        Self::build(len, false).0
    }

    fn build(len: usize, keep_frames: bool) -> (Self, StripLog) {
        let state = Rc::new(RefCell::new(StripState {
            pending: vec![(0, 0, 0); len],
            frames: Vec::new(),
            keep_frames,
        }));
        (
            Self {
                state: Rc::clone(&state),
            },
            StripLog { state },
        )
    }
}

impl PixelStrip for MemoryStrip {
    fn len(&self) -> usize {
        self.state.borrow().pending.len()
    }

    fn set_pixel(&mut self, index: usize, r: u8, g: u8, b: u8) -> Result<(), OutputError> {
        let mut state = self.state.borrow_mut();
        let len = state.pending.len();
        let px = state
            .pending
            .get_mut(index)
            .ok_or(OutputError::PixelIndex { index, len })?;
        *px = (r, g, b);
        Ok(())
    }

    fn show(&mut self) -> Result<(), OutputError> {
        let mut state = self.state.borrow_mut();
        let frame = state.pending.clone();
        if !state.keep_frames {
            state.frames.clear();
        }
        state.frames.push(frame);
        Ok(())
    }
}

impl StripLog {
    pub fn frame_count(&self) -> usize {
        self.state.borrow().frames.len()
    }

    pub fn last_frame(&self) -> Option<Vec<(u8, u8, u8)>> {
        self.state.borrow().frames.last().cloned()
    }

    pub fn frames(&self) -> Vec<Vec<(u8, u8, u8)>> {
        self.state.borrow().frames.clone()
    }
}

#[derive(Debug, Default)]
struct PwmState {
    duty: [(u16, u16); PWM_CHANNELS as usize],
    writes: Vec<(u8, u16, u16)>,
}

/// PWM bus that keeps the duty table and the write history in memory.
pub struct MemoryPwm {
    state: Rc<RefCell<PwmState>>,
}

/// Read side of a [`MemoryPwm`].
#[derive(Clone)]
pub struct PwmLog {
    state: Rc<RefCell<PwmState>>,
}

impl MemoryPwm {
    pub fn new() -> (Self, PwmLog) {
        let state = Rc::new(RefCell::new(PwmState::default()));
        (
            Self {
                state: Rc::clone(&state),
            },
            PwmLog { state },
        )
    }
}

impl PwmBus for MemoryPwm {
    fn set_duty(&mut self, channel: u8, on: u16, off: u16) -> Result<(), OutputError> {
        let mut state = self.state.borrow_mut();
        let slot = state
            .duty
            .get_mut(channel as usize)
            .ok_or(OutputError::Channel(channel))?;
        *slot = (on, off);
        state.writes.push((channel, on, off));
        Ok(())
    }
}

impl PwmLog {
    pub fn duty(&self, channel: u8) -> (u16, u16) {
        self.state.borrow().duty[channel as usize]
    }

    pub fn write_count(&self) -> usize {
        self.state.borrow().writes.len()
    }

    pub fn writes_for(&self, channel: u8) -> Vec<(u16, u16)> {
        self.state
            .borrow()
            .writes
            .iter()
            .filter(|w| w.0 == channel)
            .map(|w| (w.1, w.2))
            .collect()
    }

    pub fn clear(&self) {
        self.state.borrow_mut().writes.clear();
    }
}
