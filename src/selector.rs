use crate::audio::AudioSnapshot;
use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

pub const EPSILON: f32 = 1e-4;
pub const WINDOW_LEN: usize = 4;
pub const TEMPO_SHIFT_RATIO: f32 = 1.01;
pub const LOUDNESS_SPIKE_RATIO: f32 = 2.0;
pub const QUIET_RATIO: f32 = 5.0;
pub const SILENCE_VOLUME: f32 = 1e-5;
pub const SILENCE_BEATS: u32 = 32;
pub const MAX_BEATS: u32 = 128;

/// Peak volumes of the last few beats, oldest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunningBeatWindow {
    peaks: VecDeque<f32>,
}

impl RunningBeatWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_peaks(peaks: &[f32]) -> Self {
        let mut w = Self::new();
        for &p in peaks {
            w.push(p);
        }
        w
    }

    pub fn push(&mut self, peak: f32) {
        if self.peaks.len() == WINDOW_LEN {
            self.peaks.pop_front();
        }
        self.peaks.push_back(peak);
    }

    pub fn len(&self) -> usize {
        self.peaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }

    pub fn peaks(&self) -> impl Iterator<Item = f32> + '_ {
        self.peaks.iter().copied()
    }

    /// Largest peak in the window, 0.0 when empty.
    pub fn max(&self) -> f32 {
        self.peaks().reduce(f32::max).unwrap_or(0.0)
    }

    /// Smallest peak in the window, 0.0 when empty.
    pub fn min(&self) -> f32 {
        self.peaks().reduce(f32::min).unwrap_or(0.0)
    }
}

/// Everything the switch decision looks at besides the window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwitchInputs {
    pub beat_count: u32,
    pub tempo_bpm: f32,
    pub prev_tempo_bpm: f32,
    pub peak_volume: f32,
    pub volume: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatStats {
    pub tempo_diff: f32,
    pub max_peak_diff: f32,
    pub min_peak_diff: f32,
}

impl BeatStats {
    pub fn compute(inputs: &SwitchInputs, window: &RunningBeatWindow) -> Self {
        let (cur, prev) = (inputs.tempo_bpm, inputs.prev_tempo_bpm);
        Self {
            tempo_diff: (cur.max(prev) + EPSILON) / (cur.min(prev) + EPSILON),
            max_peak_diff: (inputs.peak_volume + EPSILON) / (window.max() + EPSILON),
            min_peak_diff: (window.min() + EPSILON) / (inputs.peak_volume + EPSILON),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchReason {
    TempoShift,
    LoudnessSpike,
    QuietSection,
    ProlongedSilence,
    MaxDuration,
}

impl fmt::Display for SwitchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::TempoShift => "tempo shift",
            Self::LoudnessSpike => "loudness spike",
            Self::QuietSection => "quiet section",
            Self::ProlongedSilence => "prolonged silence",
            Self::MaxDuration => "max duration",
        })
    }
}

/// First trigger that fires, in priority order, or `None` to keep the mode.
pub fn evaluate(inputs: &SwitchInputs, window: &RunningBeatWindow) -> Option<SwitchReason> {
    let stats = BeatStats::compute(inputs, window);
    let beats = inputs.beat_count;
    if beats >= 2 && stats.tempo_diff > TEMPO_SHIFT_RATIO {
        Some(SwitchReason::TempoShift)
    } else if beats >= 2 && stats.max_peak_diff > LOUDNESS_SPIKE_RATIO {
        Some(SwitchReason::LoudnessSpike)
    } else if beats >= 4 && stats.min_peak_diff > QUIET_RATIO {
        Some(SwitchReason::QuietSection)
    } else if inputs.volume < SILENCE_VOLUME && beats == SILENCE_BEATS {
        Some(SwitchReason::ProlongedSilence)
    } else if beats == MAX_BEATS {
        Some(SwitchReason::MaxDuration)
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchDecision {
    pub reason: SwitchReason,
    pub next_mode: usize,
}

/// Decides on every beat whether the active mode keeps running, and
/// schedules the synthetic half beat for slow songs.
pub struct ModeSelector {
    beat_count: u32,
    prev_tempo_bpm: f32,
    window: RunningBeatWindow,
    is_quiet: bool,
    rng: fastrand::Rng,
    last_beat: Option<Instant>,
    half_beat_done: bool,
}

impl ModeSelector {
    pub fn new(seed: u64) -> Self {
        Self {
            beat_count: 0,
            prev_tempo_bpm: 0.0,
            window: RunningBeatWindow::new(),
            is_quiet: false,
            rng: fastrand::Rng::with_seed(seed),
            last_beat: None,
            half_beat_done: true,
        }
    }

    pub fn beat_count(&self) -> u32 {
        self.beat_count
    }

    pub fn prev_tempo_bpm(&self) -> f32 {
        self.prev_tempo_bpm
    }

    pub fn window(&self) -> &RunningBeatWindow {
        &self.window
    }

    pub fn is_quiet(&self) -> bool {
        self.is_quiet
    }

    /// Handles one real beat. On a switch the beat count is zeroed and a
    /// mode index in `0..mode_count` is drawn uniformly, current mode included.
    /// The window and previous tempo are updated after the decision either way.
    pub fn on_beat(
        &mut self,
        now: Instant,
        snapshot: &AudioSnapshot,
        mode_count: usize,
    ) -> Option<SwitchDecision> {
        self.last_beat = Some(now);
        self.half_beat_done = false;

        let inputs = SwitchInputs {
            beat_count: self.beat_count,
            tempo_bpm: snapshot.tempo_bpm,
            prev_tempo_bpm: self.prev_tempo_bpm,
            peak_volume: snapshot.peak_volume,
            volume: snapshot.volume,
        };
        let stats = BeatStats::compute(&inputs, &self.window);
        log::debug!(
            "beat {} @{:.2} bpm: tempo_diff {:.4} max_peak_diff {:.4} min_peak_diff {:.4}",
            self.beat_count,
            snapshot.tempo_bpm,
            stats.tempo_diff,
            stats.max_peak_diff,
            stats.min_peak_diff,
        );

        let decision = evaluate(&inputs, &self.window).and_then(|reason| {
            match reason {
                SwitchReason::LoudnessSpike => self.is_quiet = false,
                SwitchReason::QuietSection => self.is_quiet = true,
                _ => {}
            }
            if mode_count == 0 {
                return None;
            }
            self.beat_count = 0;
            Some(SwitchDecision {
                reason,
                next_mode: self.rng.usize(..mode_count),
            })
        });

        self.window.push(snapshot.peak_volume);
        self.prev_tempo_bpm = snapshot.tempo_bpm;
        decision
    }

    /// Counts a beat once the active mode has drawn it.
    pub fn count_beat(&mut self) {
        self.beat_count += 1;
    }

    /// True at most once per beat, halfway to the next expected beat, while
    /// the tempo is strictly between 50 and 70 BPM.
    pub fn half_beat_due(&mut self, now: Instant, tempo_bpm: f32) -> bool {
        if self.half_beat_done || !(tempo_bpm > 50.0 && tempo_bpm < 70.0) {
            return false;
        }
        let Some(last) = self.last_beat else {
            return false;
        };
        let period = Duration::from_secs_f32(60.0 / tempo_bpm.max(60.0));
        if last + period / 2 <= now {
            self.half_beat_done = true;
            true
        } else {
            false
        }
    }
}
