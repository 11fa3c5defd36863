//! Configuration files for the SMS inbox tools
//!
//! Settings live as JSON files in a per-user directory
//! (`~/.config/sms-inbox/` on Linux). Call [`init`] once at startup so the
//! directory exists before anything tries to write into it.

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Name of the directory created under the platform config root
pub const APP_DIR_NAME: &str = "sms-inbox";

/// Initialize the config directory, returning its path.
pub fn init() -> Result<PathBuf> {
    ensure_config_dir()
}

/// The per-user config directory, if the platform has one
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|root| root.join(APP_DIR_NAME))
}

/// Path of a named file inside [`config_dir`]
pub fn config_path(filename: &str) -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(filename))
}

/// Whether a named file exists inside [`config_dir`]
pub fn config_exists(filename: &str) -> bool {
    config_path(filename).is_some_and(|path| path.is_file())
}

/// Read and deserialize a named JSON file from [`config_dir`]
pub fn load_json<T: DeserializeOwned>(filename: &str) -> Result<T> {
    let path = config_path(filename).context("Could not determine config directory")?;
    load_json_file(&path)
}

/// Read and deserialize a JSON file from any path
pub fn load_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Create [`config_dir`] if needed
pub fn ensure_config_dir() -> Result<PathBuf> {
    let dir = config_dir().context("Could not determine config directory")?;
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
    Ok(dir)
}

/// Serialize a value as pretty JSON into a named file in [`config_dir`]
pub fn save_json<T: Serialize>(filename: &str, value: &T) -> Result<PathBuf> {
    let dir = ensure_config_dir()?;
    let path = dir.join(filename);
    save_json_file(&path, value)?;
    Ok(path)
}

/// Serialize a value as pretty JSON to any path
pub fn save_json_file<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let body = serde_json::to_string_pretty(value)?;
    std::fs::write(path, body)
        .with_context(|| format!("Failed to write config file: {}", path.display()))
}
