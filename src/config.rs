//! Resolved runtime configuration.

use std::path::PathBuf;

use crate::cli::Cli;

/// Application name, used for the default cache directory.
const APP_NAME: &str = "json-sift";

/// Configuration consumed by the run controller, resolved from CLI flags
/// and their environment fallbacks.
#[derive(Debug, Clone)]
pub struct Config {
    /// Cache instance name; selects `<cache_dir>/<name>.cache`.
    pub name: String,
    /// Directory holding the cache files.
    pub cache_dir: PathBuf,
    /// Field name overriding the default identity key.
    pub id_key: Option<String>,
    /// Debug logging enabled.
    pub verbose: bool,
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        Self {
            name: cli.name,
            cache_dir: cli.cache_dir.unwrap_or_else(default_cache_dir),
            id_key: cli.id_key,
            verbose: cli.verbose,
        }
    }
}

/// Get the default cache directory
///
/// Respects the XDG_CONFIG_HOME environment variable.
/// Falls back to the platform config directory, then `$HOME/.config/json-sift`.
pub fn default_cache_dir() -> PathBuf {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        PathBuf::from(xdg_config).join(APP_NAME)
    } else if let Some(config) = dirs::config_dir() {
        config.join(APP_NAME)
    } else if let Some(home) = dirs::home_dir() {
        home.join(".config").join(APP_NAME)
    } else {
        // Fallback to current directory (should rarely happen)
        PathBuf::from(format!(".{APP_NAME}"))
    }
}
