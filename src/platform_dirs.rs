/// Cross-platform directory management for hq-hooks
///
/// Uses the `dirs` crate to handle platform-specific directories
/// following OS conventions:
/// - Linux/Unix: XDG Base Directory Specification
/// - macOS: Apple directory guidelines
/// - Windows: Windows directory standards
use anyhow::{anyhow, Result};
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "hq-hooks";

/// Get the config directory for hq-hooks
///
/// - Linux: `$XDG_CONFIG_HOME/hq-hooks` or `~/.config/hq-hooks`
/// - macOS: `~/Library/Application Support/hq-hooks`
/// - Windows: `%APPDATA%\hq-hooks`
pub fn config_dir() -> Result<PathBuf> {
    let base_dir =
        dirs::config_dir().ok_or_else(|| anyhow!("Unable to determine config directory"))?;
    Ok(base_dir.join(APP_DIR))
}

/// Get the data directory for hq-hooks, where log files go by default
pub fn data_dir() -> Result<PathBuf> {
    let base_dir =
        dirs::data_local_dir().ok_or_else(|| anyhow!("Unable to determine data directory"))?;
    Ok(base_dir.join(APP_DIR))
}

/// Default location of the hooks configuration file
pub fn default_config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("hooks.toml"))
}

/// Default directory for log files
pub fn log_dir() -> Result<PathBuf> {
    Ok(data_dir()?.join("logs"))
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}
