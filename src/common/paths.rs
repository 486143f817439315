use anyhow::{Context, Result};
use std::path::PathBuf;

/// Get the emmctool config directory
pub fn emmctool_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .context("Unable to determine user config directory")?
        .join("emmctool");

    std::fs::create_dir_all(&config_dir)
        .with_context(|| format!("creating config directory at {}", config_dir.display()))?;

    Ok(config_dir)
}

/// Get the emmctool data directory
pub fn emmctool_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join("emmctool");

    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data directory at {}", data_dir.display()))?;

    Ok(data_dir)
}

pub fn config_file() -> Result<PathBuf> {
    Ok(emmctool_config_dir()?.join("emmctool.toml"))
}

/// JSON-lines journal of finished transfers
pub fn journal_file() -> Result<PathBuf> {
    Ok(emmctool_data_dir()?.join("transfers.jsonl"))
}
