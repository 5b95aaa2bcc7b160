use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = beatstrip::config::Config::parse();
    if cfg.list_devices {
        beatstrip::audio::list_input_devices()?;
        return Ok(());
    }

    beatstrip::app::run(cfg)
}
