use crate::audio::{AudioSystem, SharedSnapshot};
use crate::config::{Config, OutputMode};
use crate::error::ShowError;
use crate::hardware::{preview_outputs, MemoryPwm, MemoryStrip, PixelStrip, PwmBus};
use crate::render::FramePacer;
use crate::show::ShowEngine;
use crate::signals;
use anyhow::Context;
use std::sync::Arc;
use std::time::Instant;

const STALE_SNAPSHOT_MS: f32 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopExit {
    Interrupted,
    AnalyzerStopped,
}

pub fn run(cfg: Config) -> anyhow::Result<()> {
    signals::install().context("install signal handlers")?;
    let seed = cfg.seed();

    let (strip, bus) = open_outputs(cfg.output, cfg.strip_length)?;
    let mut show = ShowEngine::new(strip, bus, cfg.initial_mode, seed, Instant::now())
        .context("blank outputs at startup")?;

    let shared = Arc::new(SharedSnapshot::new());
    let audio = AudioSystem::start(cfg.device.as_deref(), cfg.synthetic, Arc::clone(&shared))
        .context("start audio")?;
    log::info!(
        "audio: {}; strip: {} px; output: {:?}; seed: {seed}",
        audio.source(),
        cfg.strip_length,
        cfg.output
    );
    if let Some(mode) = show.active_mode() {
        log::info!("Mode: {}; palette: {}", mode.name(), mode.palette_name());
    }

    match render_loop(&mut show, &shared, &audio) {
        Ok(LoopExit::Interrupted) => {
            log::info!("interrupted; blanking outputs");
            let blanked = show.blank();
            shared.request_exit();
            let joined = audio.join();
            blanked.context("blank outputs")?;
            joined.context("audio analyzer")?;
            Ok(())
        }
        Ok(LoopExit::AnalyzerStopped) => {
            shared.request_exit();
            audio.join().map_err(|err| {
                log::error!("audio analyzer failed: {err}");
                anyhow::Error::new(err).context("audio analyzer")
            })?;
            log::info!("analyzer stopped; exiting");
            Ok(())
        }
        Err(err) => {
            log::error!("render loop failed: {err}");
            shared.request_exit();
            if let Err(analyzer) = audio.join() {
                log::warn!("audio analyzer also failed: {analyzer}");
            }
            Err(anyhow::Error::new(err).context("render loop"))
        }
    }
}

fn open_outputs(
    output: OutputMode,
    len: usize,
) -> anyhow::Result<(Box<dyn PixelStrip>, Box<dyn PwmBus>)> {
    match output {
        OutputMode::Terminal => {
            let (strip, pwm) = preview_outputs(len).context("open terminal preview")?;
            let strip: Box<dyn PixelStrip> = Box::new(strip);
            let pwm: Box<dyn PwmBus> = Box::new(pwm);
            Ok((strip, pwm))
        }
        OutputMode::Headless => {
            let strip: Box<dyn PixelStrip> = Box::new(MemoryStrip::discarding(len));
            let pwm: Box<dyn PwmBus> = Box::new(MemoryPwm::new().0);
            Ok((strip, pwm))
        }
    }
}

/// Runs frames until an interrupt arrives or the analyzer goes away.
fn render_loop(
    show: &mut ShowEngine,
    shared: &SharedSnapshot,
    audio: &AudioSystem,
) -> Result<LoopExit, ShowError> {
    let mut stale = false;
    loop {
        let pacer = FramePacer::start();
        if signals::interrupted() {
            return Ok(LoopExit::Interrupted);
        }
        if shared.is_exiting() || audio.is_finished() {
            return Ok(LoopExit::AnalyzerStopped);
        }

        let age = shared.age_ms();
        if age > STALE_SNAPSHOT_MS && !stale {
            log::debug!("audio snapshot is {age:.0} ms old");
        }
        stale = age > STALE_SNAPSHOT_MS;

        let tick = show.tick(pacer.started(), shared)?;
        pacer.finish(tick.fps);
    }
}
