use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::collections::VecDeque;
use std::sync::Arc;

const FLUX_FLOOR: f32 = 0.02;
const THRESHOLD_RATIO: f32 = 1.45;
const REFRACTORY_SECS: f32 = 0.24;
const MAX_INTERVAL_SECS: f32 = 1.5;
const INTERVAL_HISTORY: usize = 8;

/// Onset detector and tempo estimator fed one fixed-size block at a time.
///
/// Spectral flux of consecutive blocks is peak-picked with one block of
/// latency against an adaptive mean; tempo is the median of recent
/// inter-beat intervals. Best effort only.
pub struct BeatTracker {
    fft: Arc<dyn Fft<f32>>,
    fft_buf: Vec<Complex<f32>>,
    mags: Vec<f32>,
    prev_mags: Vec<f32>,
    block_secs: f32,
    blocks: u64,
    flux_avg: f32,
    flux_hist: [f32; 3],
    last_beat_secs: Option<f32>,
    intervals: VecDeque<f32>,
    tempo_bpm: f32,
}

impl BeatTracker {
    pub fn new(block_size: usize, sample_rate_hz: u32) -> Self {
        let n = block_size.max(2);
        let mut planner = FftPlanner::<f32>::new();
        Self {
            fft: planner.plan_fft_forward(n),
            fft_buf: vec![Complex { re: 0.0, im: 0.0 }; n],
            mags: vec![0.0; n / 2],
            prev_mags: vec![0.0; n / 2],
            block_secs: n as f32 / sample_rate_hz.max(1) as f32,
            blocks: 0,
            flux_avg: 0.0,
            flux_hist: [0.0; 3],
            last_beat_secs: None,
            intervals: VecDeque::with_capacity(INTERVAL_HISTORY),
            tempo_bpm: 0.0,
        }
    }

    pub fn tempo_bpm(&self) -> f32 {
        self.tempo_bpm
    }

    /// Feeds one block; returns the current tempo when the previous block
    /// held a beat. Short blocks are zero padded.
    pub fn process(&mut self, block: &[f32]) -> Option<f32> {
        let flux = self.spectral_flux(block);
        self.blocks += 1;

        self.flux_hist = [self.flux_hist[1], self.flux_hist[2], flux];
        self.flux_avg = self.flux_avg * 0.95 + flux * 0.05;

        let [before, candidate, after] = self.flux_hist;
        let threshold = (self.flux_avg * THRESHOLD_RATIO).max(FLUX_FLOOR);
        if !(candidate > before && candidate > after && candidate > threshold) {
            return None;
        }

        let at = self.blocks.saturating_sub(2) as f32 * self.block_secs;
        if let Some(last) = self.last_beat_secs {
            let gap = at - last;
            if gap < REFRACTORY_SECS {
                return None;
            }
            if gap <= MAX_INTERVAL_SECS {
                if self.intervals.len() == INTERVAL_HISTORY {
                    self.intervals.pop_front();
                }
                self.intervals.push_back(gap);
                self.tempo_bpm = 60.0 / median(&self.intervals);
            }
        }
        self.last_beat_secs = Some(at);
        Some(self.tempo_bpm)
    }

    fn spectral_flux(&mut self, block: &[f32]) -> f32 {
        let n = self.fft_buf.len();
        for (i, c) in self.fft_buf.iter_mut().enumerate() {
            c.re = block.get(i).copied().unwrap_or(0.0);
            c.im = 0.0;
        }
        self.fft.process(&mut self.fft_buf);

        let mut flux = 0.0f32;
        for (i, c) in self.fft_buf.iter().take(n / 2).enumerate() {
            let m = (c.re * c.re + c.im * c.im).sqrt();
            let d = m - self.prev_mags[i];
            if d > 0.0 {
                flux += d;
            }
            self.mags[i] = m;
        }
        std::mem::swap(&mut self.mags, &mut self.prev_mags);

        let scale = 0.002 * (1024.0 / (n / 2).max(1) as f32);
        (flux * scale).tanh()
    }
}

fn median(values: &VecDeque<f32>) -> f32 {
    let mut sorted: Vec<f32> = values.iter().copied().collect();
    sorted.sort_by(f32::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
