use crate::modes::ModeKind;
use clap::{Parser, ValueEnum};

#[derive(Parser, Debug, Clone)]
#[command(name = "beatstrip", version, about = "Beat-synchronized light show for a pixel strip and PWM accent lights")]
pub struct Config {
    #[arg(long, default_value_t = 130)]
    pub strip_length: usize,

    #[arg(long)]
    pub device: Option<String>,

    #[arg(long, default_value_t = false)]
    pub list_devices: bool,

    /// Skip the microphone and pulse a beat every 250 ms.
    #[arg(long, default_value_t = false)]
    pub synthetic: bool,

    #[arg(long, value_enum, default_value_t = OutputMode::Terminal)]
    pub output: OutputMode,

    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long, value_enum, default_value_t = ModeKind::Shift)]
    pub initial_mode: ModeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Truecolor preview of the strip and accent lights.
    #[value(alias = "preview")]
    Terminal,
    /// Render into memory and discard.
    #[value(alias = "null")]
    Headless,
}

impl Config {
    pub fn seed(&self) -> u64 {
        self.seed.unwrap_or_else(|| fastrand::u64(..))
    }
}
