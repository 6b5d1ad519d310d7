//! Configuration file management.
//!
//! Handles loading and creating the TOML configuration file.

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{AppConfig, AppError, Result};

/// Default configuration file content.
const DEFAULT_CONFIG: &str = r#"# repost-cursor configuration
# Auto-generated - edit as needed

[store]
# Progress file. Relative paths resolve against this file's directory.
path = "state.json"

# json  = {"processed": [...]} keyed by item identifier
# lines = one processed identifier per line
# index = single integer count (append-only sources only)
format = "json"

# Refuse to start while another run holds the lock
lock = true

[source]
# manifest = text file, one identifier per line
kind = "manifest"
path = "items.txt"

# command = external enumerator, one record per stdout line
# kind = "command"
# program = "yt-dlp"
# args = ["--flat-playlist", "--dump-json", "https://www.instagram.com/someone/"]
# json_field = "url"
# reverse = true

# sequence = numeric positions start..=end
# kind = "sequence"
# start = 0
# end = 99

# [processor]
# Runs once per item; "{id}" is replaced by the identifier, which is also
# exported as REPOST_ITEM_ID. Exit status 0 commits the item.
# program = "./repost.sh"
# args = ["{id}"]

[run]
# Items processed per invocation
max_items = 1

[schedule]
# Minutes between runs when installed as a systemd timer
interval_minutes = 60
"#;

/// Load configuration from `path`, or from the default location.
///
/// A missing default file yields the default configuration; a missing
/// explicit file is an error.
///
/// # Errors
/// Returns error if the file cannot be read, parsed or validated.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from_file(path)?,
        None => {
            let default_path = AppConfig::default_config_path();
            if default_path.exists() {
                load_config_from_file(&default_path)?
            } else {
                tracing::debug!(path = %default_path.display(), "No config file, using defaults");
                AppConfig::default()
            }
        }
    };

    config.validate()?;
    Ok(config)
}

/// Load configuration from a specific file.
///
/// Relative paths inside it resolve against the file's directory.
///
/// # Errors
/// Returns error if file cannot be read or parsed.
pub fn load_config_from_file(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .map_err(|e| AppError::io(format!("Failed to read config file: {}", path.display()), e))?;

    let mut config: AppConfig = toml::from_str(&content).map_err(|e| AppError::Config {
        message: format!("Failed to parse config file {}: {e}", path.display()),
    })?;

    config.base_dir = Some(
        path.parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf),
    );

    Ok(config)
}

/// Create the default configuration file if it doesn't exist.
///
/// Returns the path and whether a new file was written.
///
/// # Errors
/// Returns error if file cannot be created.
pub fn ensure_config_exists(path: Option<&Path>) -> Result<(PathBuf, bool)> {
    let config_path = path.map_or_else(AppConfig::default_config_path, Path::to_path_buf);

    if config_path.exists() {
        return Ok((config_path, false));
    }

    if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::io("Failed to create config directory", e))?;
    }

    fs::write(&config_path, DEFAULT_CONFIG)
        .map_err(|e| AppError::io("Failed to create default config", e))?;

    tracing::info!(path = %config_path.display(), "Created default configuration");

    Ok((config_path, true))
}
