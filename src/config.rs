//! Configuration management for hacenada.
//!
//! Handles loading configuration from TOML files.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Name of the per-directory config file.
pub const LOCAL_CONFIG: &str = ".hacenada.toml";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where session stores live
    pub storage: StorageConfig,

    /// Where completion logs are written
    pub logs: LogConfig,

    /// Terminal rendering
    pub render: RenderConfig,
}

/// Session store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Store home directory; `~` and `$VARS` are expanded
    pub home: String,
}

/// Completion log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log directory. Relative paths are taken from the script's directory.
    pub dir: String,
}

/// Rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Editor command for `editor` steps (falls back to `$VISUAL`, `$EDITOR`, `vi`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editor: Option<String>,

    /// Whether to style prompts when stdout is a terminal
    pub color: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { home: "~/.hacenada".to_string() }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { dir: "hacenada-logs".to_string() }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self { editor: None, color: true }
    }
}

impl Config {
    /// Load configuration from the default locations.
    pub fn load() -> anyhow::Result<Self> {
        match Self::active_path() {
            Some(path) if path.exists() => Self::load_from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config {}: {e}", path.display()))?;
        tracing::debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// The file `load` reads: the local config if present, else the global one.
    pub fn active_path() -> Option<PathBuf> {
        let local_config = PathBuf::from(LOCAL_CONFIG);
        if local_config.exists() {
            return Some(local_config);
        }
        Self::config_dir().map(|d| d.join("config.toml"))
    }

    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(crate::APP_NAME))
    }

    /// The store home with `~` and environment variables expanded.
    pub fn store_home(&self) -> anyhow::Result<PathBuf> {
        expand(&self.storage.home)
    }

    /// The log directory for the script at `script_path`.
    pub fn log_dir_for(&self, script_path: &Path) -> anyhow::Result<PathBuf> {
        let dir = expand(&self.logs.dir)?;
        if dir.is_absolute() {
            return Ok(dir);
        }
        let base = script_path.parent().unwrap_or_else(|| Path::new("."));
        Ok(base.join(dir))
    }

    /// Serialize as TOML.
    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn expand(path: &str) -> anyhow::Result<PathBuf> {
    let expanded = shellexpand::full(path)
        .map_err(|e| anyhow::anyhow!("Could not expand '{path}': {e}"))?;
    Ok(PathBuf::from(expanded.as_ref()))
}
