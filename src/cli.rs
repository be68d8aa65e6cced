use clap::Parser;
use std::path::PathBuf;

use crate::error::ShooterError;

#[derive(Parser)]
#[command(name = "site-shooter")]
#[command(about = "Captures configured sites at device viewports and archives them remotely")]
#[command(version)]
pub struct Cli {
    /// Service names to restrict the run to; empty means every configured
    /// service
    pub target: Vec<String>,

    #[arg(long, help = "Enable verbose logging")]
    pub debug: bool,
}

/// The configuration file lives beside the executable, as `config.yml`.
pub fn config_path() -> Result<PathBuf, ShooterError> {
    let exe = std::env::current_exe()?;
    Ok(match exe.parent() {
        Some(dir) => dir.join("config.yml"),
        None => PathBuf::from("config.yml"),
    })
}

pub fn setup_logging(debug: bool) {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::ERROR
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();
}
