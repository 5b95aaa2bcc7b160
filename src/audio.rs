use crate::error::AnalyzerError;
use crate::tempo::BeatTracker;
use anyhow::{anyhow, Context};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Sample, SampleFormat};
use ringbuf::HeapRb;
use ringbuf::traits::{Consumer as _, Producer as _, Split as _};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

pub const SAMPLE_RATE_HZ: u32 = 44_100;
pub const BLOCK_SIZE: usize = 1024;
pub const SYNTHETIC_BEAT_PERIOD: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AudioSnapshot {
    pub exiting: bool,
    pub is_beat: bool,
    pub volume: f32,
    pub peak_volume: f32,
    pub tempo_bpm: f32,
}

/// Single-slot record the analyzer publishes into and the render loop
/// polls. Every field is its own relaxed atomic, so a reader may see
/// fields from two different analysis cycles; consumers tolerate that.
///
/// `is_beat` is OR-latched by [`publish`](Self::publish) and only cleared by
/// [`take_beat`](Self::take_beat).
pub struct SharedSnapshot {
    exiting: AtomicBool,
    is_beat: AtomicBool,
    volume: AtomicU32,
    peak_volume: AtomicU32,
    tempo_bpm: AtomicU32,
    updated_ms: AtomicU64,
}

impl SharedSnapshot {
    pub fn new() -> Self {
        Self {
            exiting: AtomicBool::new(false),
            is_beat: AtomicBool::new(false),
            volume: AtomicU32::new(0),
            peak_volume: AtomicU32::new(0),
            tempo_bpm: AtomicU32::new(0),
            updated_ms: AtomicU64::new(0),
        }
    }

    pub fn publish(&self, is_beat: bool, volume: f32, peak_volume: f32, tempo_bpm: f32) {
        self.is_beat.fetch_or(is_beat, Ordering::Relaxed);
        self.volume.store(volume.to_bits(), Ordering::Relaxed);
        self.peak_volume.store(peak_volume.to_bits(), Ordering::Relaxed);
        self.tempo_bpm.store(tempo_bpm.to_bits(), Ordering::Relaxed);
        self.updated_ms.store(now_ms(), Ordering::Relaxed);
    }

    /// At least one beat since the previous call; clears the latch.
    pub fn take_beat(&self) -> bool {
        self.is_beat.swap(false, Ordering::Relaxed)
    }

    /// Reads every field without clearing the beat latch.
    pub fn load(&self) -> AudioSnapshot {
        AudioSnapshot {
            exiting: self.exiting.load(Ordering::Relaxed),
            is_beat: self.is_beat.load(Ordering::Relaxed),
            volume: f32::from_bits(self.volume.load(Ordering::Relaxed)),
            peak_volume: f32::from_bits(self.peak_volume.load(Ordering::Relaxed)),
            tempo_bpm: f32::from_bits(self.tempo_bpm.load(Ordering::Relaxed)),
        }
    }

    pub fn request_exit(&self) {
        self.exiting.store(true, Ordering::Relaxed);
    }

    pub fn is_exiting(&self) -> bool {
        self.exiting.load(Ordering::Relaxed)
    }

    pub fn age_ms(&self) -> f32 {
        let t = self.updated_ms.load(Ordering::Relaxed);
        if t == 0 {
            return 0.0;
        }
        now_ms().saturating_sub(t) as f32
    }
}

impl Default for SharedSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_millis(0))
        .as_millis() as u64
}

pub fn list_input_devices() -> anyhow::Result<()> {
    let host = cpal::default_host();
    let devices = host
        .input_devices()
        .context("enumerate input devices")?;

    let mut out = io::stdout();
    writeln!(out, "Input devices:")?;
    for dev in devices {
        let name = dev.name().unwrap_or_else(|_| "<unknown>".to_string());
        writeln!(out, "  - {}", name)?;
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioSource {
    Microphone { device: String, sample_rate_hz: u32 },
    Synthetic,
}

impl std::fmt::Display for AudioSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Microphone { device, sample_rate_hz } => {
                write!(f, "microphone \"{device}\" @ {sample_rate_hz} Hz")
            }
            Self::Synthetic => write!(f, "synthetic beats every {} ms", SYNTHETIC_BEAT_PERIOD.as_millis()),
        }
    }
}

/// Last error the input stream reported, if any.
#[derive(Default)]
struct StreamFault {
    raised: AtomicBool,
    message: Mutex<Option<String>>,
}

impl StreamFault {
    fn raise(&self, message: String) {
        if let Ok(mut slot) = self.message.lock() {
            slot.get_or_insert(message);
        }
        self.raised.store(true, Ordering::Relaxed);
    }

    fn take(&self) -> Option<String> {
        if !self.raised.load(Ordering::Relaxed) {
            return None;
        }
        let message = self.message.lock().ok().and_then(|mut slot| slot.take());
        Some(message.unwrap_or_else(|| "input stream failed".to_string()))
    }
}

/// The analyzer thread plus whatever input stream feeds it.
pub struct AudioSystem {
    stream: Option<cpal::Stream>,
    source: AudioSource,
    shared: Arc<SharedSnapshot>,
    handle: Option<thread::JoinHandle<Result<(), AnalyzerError>>>,
}

impl AudioSystem {
    /// Opens the microphone unless `synthetic` is set. A missing or
    /// unusable input device degrades to the synthetic beat generator.
    pub fn start(
        device_query: Option<&str>,
        synthetic: bool,
        shared: Arc<SharedSnapshot>,
    ) -> anyhow::Result<Self> {
        if synthetic {
            return Self::synthetic(shared);
        }
        match Self::microphone(device_query, Arc::clone(&shared)) {
            Ok(sys) => Ok(sys),
            Err(err) => {
                log::warn!("audio input unavailable ({err:#}); using synthetic beats");
                Self::synthetic(shared)
            }
        }
    }

    pub fn synthetic(shared: Arc<SharedSnapshot>) -> anyhow::Result<Self> {
        let for_thread = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("beat-synth".into())
            .spawn(move || synthetic_loop(&for_thread))
            .context("spawn synthetic beat thread")?;
        Ok(Self {
            stream: None,
            source: AudioSource::Synthetic,
            shared,
            handle: Some(handle),
        })
    }

    fn microphone(device_query: Option<&str>, shared: Arc<SharedSnapshot>) -> anyhow::Result<Self> {
        let host = cpal::default_host();
        let device = select_mic_input_device(&host, device_query)?;
        let device_name = device.name().unwrap_or_else(|_| "<unknown>".to_string());
        let supported = preferred_input_config(&device)?;
        let sample_rate_hz = supported.sample_rate().0;
        let channels = supported.channels() as usize;
        let config: cpal::StreamConfig = supported.config();

        let rb_capacity = (sample_rate_hz as usize).saturating_mul(4);
        let rb = HeapRb::<f32>::new(rb_capacity);
        let (mut prod, cons) = rb.split();

        let fault = Arc::new(StreamFault::default());
        let fault_for_stream = Arc::clone(&fault);
        let err_fn = move |err: cpal::StreamError| {
            log::warn!("audio stream error: {err}");
            fault_for_stream.raise(err.to_string());
        };

        let stream = match supported.sample_format() {
            SampleFormat::F32 => device.build_input_stream(
                &config,
                move |data: &[f32], _| push_interleaved(data, channels, &mut prod),
                err_fn,
                None,
            )?,
            SampleFormat::I16 => device.build_input_stream(
                &config,
                move |data: &[i16], _| push_interleaved(data, channels, &mut prod),
                err_fn,
                None,
            )?,
            SampleFormat::U16 => device.build_input_stream(
                &config,
                move |data: &[u16], _| push_interleaved(data, channels, &mut prod),
                err_fn,
                None,
            )?,
            fmt => return Err(anyhow!("unsupported sample format: {fmt:?}")),
        };

        stream.play().context("start input stream")?;

        let handle = spawn_analyzer(cons, sample_rate_hz, Arc::clone(&shared), fault)?;

        Ok(Self {
            stream: Some(stream),
            source: AudioSource::Microphone {
                device: device_name,
                sample_rate_hz,
            },
            shared,
            handle: Some(handle),
        })
    }

    pub fn source(&self) -> &AudioSource {
        &self.source
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(|h| h.is_finished())
    }

    /// Waits for the analyzer to return, then closes the input stream.
    /// Callers set the exiting flag first unless the analyzer already quit.
    pub fn join(mut self) -> Result<(), AnalyzerError> {
        let result = match self.handle.take() {
            Some(h) => h.join().map_err(|_| AnalyzerError::Panicked)?,
            None => Ok(()),
        };
        self.stream.take();
        result
    }
}

impl Drop for AudioSystem {
    fn drop(&mut self) {
        if let Some(h) = self.handle.take() {
            self.shared.request_exit();
            let _ = h.join();
        }
    }
}

fn select_mic_input_device(
    host: &cpal::Host,
    device_query: Option<&str>,
) -> anyhow::Result<cpal::Device> {
    let devices = host
        .input_devices()
        .context("enumerate input devices")?
        .collect::<Vec<_>>();

    let want = device_query.map(|s| s.to_lowercase());
    if let Some(want) = want.as_deref() {
        if let Some(dev) = devices.iter().find(|d| {
            d.name()
                .map(|n| n.to_lowercase().contains(want))
                .unwrap_or(false)
        }) {
            return Ok(dev.clone());
        }
        return Err(anyhow!("no input device matching: {want}"));
    }

    host.default_input_device()
        .ok_or_else(|| anyhow!("no default input device found"))
}

/// 44.1 kHz when the device offers it, otherwise its default.
fn preferred_input_config(device: &cpal::Device) -> anyhow::Result<cpal::SupportedStreamConfig> {
    let wanted = cpal::SampleRate(SAMPLE_RATE_HZ);
    if let Ok(ranges) = device.supported_input_configs() {
        for range in ranges {
            if range.min_sample_rate() <= wanted && wanted <= range.max_sample_rate() {
                return Ok(range.with_sample_rate(wanted));
            }
        }
    }
    device
        .default_input_config()
        .context("get default input config")
}

fn push_interleaved<T: Sample<Float = f32> + Copy>(
    data: &[T],
    channels: usize,
    prod: &mut ringbuf::HeapProd<f32>,
) {
    for frame in data.chunks(channels.max(1)) {
        let mut acc = 0.0f32;
        for s in frame {
            acc += (*s).to_float_sample();
        }
        let mono = acc / frame.len() as f32;
        let _ = prod.try_push(mono);
    }
}

/// Mean-square energy of a block.
pub fn block_volume(block: &[f32]) -> f32 {
    if block.is_empty() {
        return 0.0;
    }
    block.iter().map(|s| s * s).sum::<f32>() / block.len() as f32
}

/// Volume bookkeeping between beats: `volume` holds the energy of the last
/// beat block, the peak carries the loudest block since then.
#[derive(Debug, Default, Clone, Copy)]
pub struct PeakTracker {
    volume: f32,
    running_peak: f32,
}

impl PeakTracker {
    /// Returns `(volume, peak_volume)` to publish for this block.
    pub fn update(&mut self, current: f32, is_beat: bool) -> (f32, f32) {
        self.running_peak = self.running_peak.max(current);
        let peak = self.running_peak.max(self.volume);
        if is_beat {
            self.volume = current;
            self.running_peak = current;
        }
        (self.volume, peak)
    }
}

fn spawn_analyzer(
    mut cons: ringbuf::HeapCons<f32>,
    sample_rate_hz: u32,
    shared: Arc<SharedSnapshot>,
    fault: Arc<StreamFault>,
) -> anyhow::Result<thread::JoinHandle<Result<(), AnalyzerError>>> {
    thread::Builder::new()
        .name("analyzer".into())
        .spawn(move || analyze_loop(&mut cons, sample_rate_hz, &shared, &fault))
        .context("spawn analyzer thread")
}

fn analyze_loop(
    cons: &mut ringbuf::HeapCons<f32>,
    sample_rate_hz: u32,
    shared: &SharedSnapshot,
    fault: &StreamFault,
) -> Result<(), AnalyzerError> {
    let mut tracker = BeatTracker::new(BLOCK_SIZE, sample_rate_hz);
    let mut peaks = PeakTracker::default();
    let mut block = Vec::with_capacity(BLOCK_SIZE);

    while !shared.is_exiting() {
        if let Some(message) = fault.take() {
            log::error!("analyzer stopping: {message}");
            shared.request_exit();
            return Err(AnalyzerError::Stream(message));
        }

        let mut got_any = false;
        while let Some(s) = cons.try_pop() {
            got_any = true;
            block.push(s);
            if block.len() < BLOCK_SIZE {
                continue;
            }
            let current = block_volume(&block);
            let beat = tracker.process(&block);
            let (volume, peak) = peaks.update(current, beat.is_some());
            shared.publish(beat.is_some(), volume, peak, tracker.tempo_bpm());
            block.clear();
        }

        if !got_any {
            thread::sleep(Duration::from_millis(1));
        }
    }
    Ok(())
}

fn synthetic_loop(shared: &SharedSnapshot) -> Result<(), AnalyzerError> {
    let mut last_beat = Instant::now();
    while !shared.is_exiting() {
        if last_beat.elapsed() > SYNTHETIC_BEAT_PERIOD {
            last_beat = Instant::now();
            shared.publish(true, 0.0, 0.0, 0.0);
        }
        thread::sleep(Duration::from_millis(1));
    }
    Ok(())
}
