//! PriceLens - on-screen item price checker
//!
//! Watches the screen for light item labels, reads them and prints current
//! market prices. Read-only: it captures pixels and never touches game
//! memory or inputs.

mod analysis;
mod app;
mod capture;
mod config;
mod hotkey;
mod market;
mod pipeline;
mod storage;
mod vision;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::app::{PriceLensApp, RunOptions};
use crate::config::AppConfig;

/// PriceLens - on-screen item price checker
#[derive(Parser, Debug)]
#[command(name = "price-lens")]
#[command(about = "Reads item labels on screen and prints their market prices")]
struct Args {
    /// Configuration file (defaults to config.toml in the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Replay screenshots from a directory instead of capturing the screen
    #[arg(long, conflicts_with = "image")]
    replay: Option<PathBuf>,

    /// Price the items in one screenshot and exit
    #[arg(long)]
    image: Option<PathBuf>,

    /// Process every frame instead of waiting for the hotkey
    #[arg(long)]
    every_frame: bool,

    /// Override the capture hotkey, e.g. "Ctrl+Shift+P"
    #[arg(long)]
    hotkey: Option<String>,

    /// Save every cut as a PNG for inspection
    #[arg(long)]
    save_cuts: bool,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => load_or_create_config(),
    };
    apply_overrides(&mut config, &args);

    if args.print_config {
        print!(
            "{}",
            toml::to_string_pretty(&config).context("Failed to serialize configuration")?
        );
        return Ok(());
    }

    info!("PriceLens starting...");
    info!("Read-only mode: screen capture and analysis only");

    let options = RunOptions {
        replay: args.replay,
        image: args.image,
        every_frame: args.every_frame,
    };
    PriceLensApp::new(config, options).run()?;

    info!("PriceLens shutdown complete");
    Ok(())
}

fn apply_overrides(config: &mut AppConfig, args: &Args) {
    if let Some(hotkey) = &args.hotkey {
        config.hotkey.trigger = hotkey.clone();
    }
    if args.save_cuts {
        config.debug.save_cuts = true;
    }
}

/// Load configuration from the config directory, writing defaults on first run
fn load_or_create_config() -> AppConfig {
    let config_path = match storage::get_config_dir() {
        Ok(dir) => dir.join("config.toml"),
        Err(e) => {
            warn!("No config directory available ({:#}), using defaults", e);
            return AppConfig::default();
        }
    };

    if config_path.exists() {
        match config::load_config(&config_path) {
            Ok(config) => {
                info!("Loaded configuration from {:?}", config_path);
                return config;
            }
            Err(e) => warn!("{:#}; using defaults", e),
        }
        return AppConfig::default();
    }

    let config = AppConfig::default();
    write_default_config(&config, &config_path);
    config
}

fn write_default_config(config: &AppConfig, path: &Path) {
    match config::save_config(config, path) {
        Ok(()) => info!("Wrote default configuration to {:?}", path),
        Err(e) => warn!("Could not write default configuration: {:#}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides() {
        let args = Args::parse_from(["price-lens", "--hotkey", "Ctrl+F1", "--save-cuts"]);
        let mut config = AppConfig::default();

        apply_overrides(&mut config, &args);

        assert_eq!(config.hotkey.trigger, "Ctrl+F1");
        assert!(config.debug.save_cuts);
    }

    #[test]
    fn test_replay_and_image_conflict() {
        let result = Args::try_parse_from(["price-lens", "--replay", "shots", "--image", "a.png"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_defaults_leave_config_alone() {
        let args = Args::parse_from(["price-lens"]);
        let mut config = AppConfig::default();

        apply_overrides(&mut config, &args);

        assert_eq!(config.hotkey.trigger, "F9");
        assert!(!config.debug.save_cuts);
        assert!(!args.every_frame);
    }
}
