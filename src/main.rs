//! autotap CLI entry point

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::Ordering;

use clap::Parser;

use autotap::config::{ConfigError, Settings};
use autotap::GameBot;

#[derive(Parser)]
#[command(name = "autotap", version, about = "YOLO-driven mobile game automation")]
struct Args {
    /// Path to the settings document
    #[arg(short, long, default_value = "config/default.toml")]
    config: PathBuf,

    /// Use a bundled preset instead of a config file
    #[arg(long, value_name = "NAME")]
    preset: Option<String>,
}

fn load_settings(args: &Args) -> Result<Settings, ConfigError> {
    if let Some(name) = &args.preset {
        Settings::preset(name)
            .ok_or_else(|| ConfigError::Invalid(format!("unknown preset: {name}")))
    } else {
        Settings::load(&args.config)
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let settings = match load_settings(&args) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(&settings.logging.level),
    )
    .init();

    log::info!("autotap starting");
    log::info!(
        "platform: {:?} | model: {} | strategy: {:?}",
        settings.device.platform,
        settings.model.path.display(),
        settings.strategy.kind
    );

    let mut bot = GameBot::new(settings);

    let stop = bot.stop_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        stop.store(true, Ordering::Relaxed);
    }) {
        log::warn!("failed to install interrupt handler: {e}");
    }

    match bot.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("bot exited with error: {e}");
            ExitCode::FAILURE
        }
    }
}
