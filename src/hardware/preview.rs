use super::{duty_intensity, PixelStrip, PwmBus, PWM_CHANNELS};
use crate::accent::{ACCENT_CHANNELS, THRUSTER_CHANNEL};
use crate::error::OutputError;
use crate::terminal::TerminalGuard;
use std::cell::RefCell;
use std::io::{BufWriter, Stdout, Write};
use std::rc::Rc;

type DutyTable = Rc<RefCell<[(u16, u16); PWM_CHANNELS as usize]>>;

/// Truecolor terminal stand-in for the pixel strip. The accent lights and
/// the thruster are painted below the strip on every `show`.
pub struct PreviewStrip {
    pixels: Vec<(u8, u8, u8)>,
    duty: DutyTable,
    out: BufWriter<Stdout>,
    _guard: TerminalGuard,
}

/// PWM side of the terminal preview; only records duty cycles.
pub struct PreviewPwm {
    duty: DutyTable,
}

/// Enters the alternate screen and returns a strip/PWM pair sharing one view.
pub fn preview_outputs(len: usize) -> anyhow::Result<(PreviewStrip, PreviewPwm)> {
    let guard = TerminalGuard::new()?;
    let duty: DutyTable = Rc::new(RefCell::new([(0, 0); PWM_CHANNELS as usize]));
    Ok((
        PreviewStrip {
            pixels: vec![(0, 0, 0); len],
            duty: Rc::clone(&duty),
            out: BufWriter::new(TerminalGuard::stdout()),
            _guard: guard,
        },
        PreviewPwm { duty },
    ))
}

impl PixelStrip for PreviewStrip {
    fn len(&self) -> usize {
        self.pixels.len()
    }

    fn set_pixel(&mut self, index: usize, r: u8, g: u8, b: u8) -> Result<(), OutputError> {
        let len = self.pixels.len();
        let px = self
            .pixels
            .get_mut(index)
            .ok_or(OutputError::PixelIndex { index, len })?;
        *px = (r, g, b);
        Ok(())
    }

    fn show(&mut self) -> Result<(), OutputError> {
        let cols = crossterm::terminal::size()
            .map(|(c, _)| c as usize)
            .unwrap_or(80)
            .max(1);

        const BLOCK: char = '\u{2588}';
        let out = &mut self.out;
        out.write_all(b"\x1b[?2026h\x1b[H\x1b[0m")?;
        let mut last: Option<(u8, u8, u8)> = None;
        for (i, &(r, g, b)) in self.pixels.iter().enumerate() {
            if i > 0 && i % cols == 0 {
                out.write_all(b"\r\n")?;
            }
            if last != Some((r, g, b)) {
                write!(out, "\x1b[38;2;{r};{g};{b}m")?;
                last = Some((r, g, b));
            }
            write!(out, "{BLOCK}")?;
        }
        out.write_all(b"\x1b[0m\r\n\r\n")?;

        let duty = self.duty.borrow();
        for channels in ACCENT_CHANNELS {
            let [r, g, b] = channels.map(|ch| {
                let (on, off) = duty[ch as usize];
                (duty_intensity(on, off) * 255.0) as u8
            });
            write!(out, "\x1b[38;2;{r};{g};{b}m{BLOCK}{BLOCK}{BLOCK}{BLOCK}\x1b[0m ")?;
        }
        let (on, off) = duty[THRUSTER_CHANNEL as usize];
        let t = (duty_intensity(on, off) * 255.0) as u8;
        write!(out, "  \x1b[38;2;{t};{t};{t}m{BLOCK}{BLOCK}\x1b[0m\x1b[K")?;

        out.write_all(b"\x1b[?2026l")?;
        out.flush()?;
        Ok(())
    }
}

impl PwmBus for PreviewPwm {
    fn set_duty(&mut self, channel: u8, on: u16, off: u16) -> Result<(), OutputError> {
        let mut duty = self.duty.borrow_mut();
        let slot = duty
            .get_mut(channel as usize)
            .ok_or(OutputError::Channel(channel))?;
        *slot = (on, off);
        Ok(())
    }
}
