//! Storage Layer
//!
//! Platform directories for configuration and data, plus optional
//! persistence of item-card cuts for debugging recognition.

pub mod cuts;

pub use cuts::CutWriter;

use anyhow::Result;
use std::path::PathBuf;

fn project_dirs() -> Result<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "pricelens", "PriceLens")
        .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))
}

/// Get the application data directory
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = project_dirs()?.data_dir().to_path_buf();
    std::fs::create_dir_all(&data_dir)?;

    Ok(data_dir)
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = project_dirs()?.config_dir().to_path_buf();
    std::fs::create_dir_all(&config_dir)?;

    Ok(config_dir)
}
