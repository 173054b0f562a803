// Configuration storage for the pushgate CLI
//
// Cross-platform config stored in:
// - macOS: ~/Library/Application Support/pushgate/config.json
// - Linux: ~/.config/pushgate/config.json
// - Windows: %APPDATA%\pushgate\config.json

use anyhow::{Context, Result};
use pushgate_core::GateConfig;
use std::path::{Path, PathBuf};

/// Get the config directory path (cross-platform)
pub fn config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .context("Failed to determine config directory")?
        .join("pushgate");

    std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;

    Ok(config_dir)
}

/// Get the default config file path
pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.json"))
}

/// Resolve an explicit `--config` path or fall back to the default location
pub fn resolve(path: Option<&Path>) -> Result<PathBuf> {
    match path {
        Some(p) => Ok(p.to_path_buf()),
        None => config_file(),
    }
}

/// Load config from `path`, or write and return the defaults if it does not
/// exist yet
pub fn load_or_create(path: &Path) -> Result<GateConfig> {
    if path.exists() {
        GateConfig::load_from(path)
    } else {
        let config = GateConfig::default();
        config.save_to(path)?;
        tracing::info!("Created default config at {}", path.display());
        Ok(config)
    }
}
