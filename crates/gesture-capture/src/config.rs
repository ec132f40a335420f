//! TOML-based configuration for the capture layer.
//!
//! Reads and writes `CaptureConfig` to the platform-appropriate config
//! file:
//! - Windows:  `%APPDATA%\GestureHook\config.toml`
//! - Linux:    `~/.config/gesturehook/config.toml`
//! - macOS:    `~/Library/Application Support/GestureHook/config.toml`
//!
//! Fields annotated with `#[serde(default = "...")]` fall back to their
//! defaults when absent, so the app works on first run and when
//! upgrading from an older config file.

use std::path::PathBuf;
use std::time::Duration;

use gesture_core::{DragThresholds, SuppressionConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level capture configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CaptureConfig {
    #[serde(default)]
    pub suppression: SuppressionSection,
    #[serde(default)]
    pub drag: DragSection,
    #[serde(default)]
    pub log: LogSection,
}

/// Whitelist tunables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SuppressionSection {
    /// Grace window (milliseconds) during which a gesture stays
    /// suppressed after its last whitelist token is released.
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,
}

/// Drag threshold overrides.  0 means "use the platform value".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DragSection {
    #[serde(default)]
    pub horizontal_threshold: i32,
    #[serde(default)]
    pub vertical_threshold: i32,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogSection {
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`,
    /// `"trace"`.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_grace_period_ms() -> u64 {
    10
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SuppressionSection {
    fn default() -> Self {
        Self {
            grace_period_ms: default_grace_period_ms(),
        }
    }
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl CaptureConfig {
    /// Registry tunables derived from this config.
    pub fn suppression_config(&self) -> SuppressionConfig {
        SuppressionConfig {
            grace_period: Duration::from_millis(self.suppression.grace_period_ms),
        }
    }

    /// Drag threshold overrides, if both axes are configured.
    pub fn drag_thresholds(&self) -> Option<DragThresholds> {
        if self.drag.horizontal_threshold > 0 && self.drag.vertical_threshold > 0 {
            Some(DragThresholds {
                horizontal: self.drag.horizontal_threshold,
                vertical: self.drag.vertical_threshold,
            })
        } else {
            None
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Resolves the full path to the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory
/// cannot be determined from the environment.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    platform_config_dir()
        .ok_or(ConfigError::NoPlatformConfigDir)
        .map(|dir| dir.join("config.toml"))
}

/// Loads `CaptureConfig` from disk, returning defaults if the file does
/// not yet exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not
/// found", and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config() -> Result<CaptureConfig, ConfigError> {
    let path = config_file_path()?;

    match std::fs::read_to_string(&path) {
        Ok(content) => {
            let cfg: CaptureConfig = toml::from_str(&content)?;
            Ok(cfg)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(CaptureConfig::default()),
        Err(e) => Err(ConfigError::Io { path, source: e }),
    }
}

/// Persists `config` to disk, creating the config directory if needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(config: &CaptureConfig) -> Result<(), ConfigError> {
    let path = config_file_path()?;

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(&path, content).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(())
}

/// Resolves the platform config base directory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("GestureHook"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("gesturehook"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("GestureHook")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_grace_period_is_ten_ms() {
        // Arrange / Act
        let cfg = CaptureConfig::default();

        // Assert
        assert_eq!(cfg.suppression.grace_period_ms, 10);
        assert_eq!(
            cfg.suppression_config().grace_period,
            Duration::from_millis(10)
        );
    }

    #[test]
    fn test_default_drag_section_defers_to_platform() {
        let cfg = CaptureConfig::default();
        assert!(cfg.drag_thresholds().is_none());
    }

    #[test]
    fn test_configured_drag_thresholds_override_platform() {
        let mut cfg = CaptureConfig::default();
        cfg.drag.horizontal_threshold = 12;
        cfg.drag.vertical_threshold = 8;

        let thresholds = cfg.drag_thresholds().expect("override");
        assert_eq!(thresholds.horizontal, 12);
        assert_eq!(thresholds.vertical, 8);
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        // Arrange
        let mut cfg = CaptureConfig::default();
        cfg.suppression.grace_period_ms = 25;
        cfg.log.level = "debug".to_string();

        // Act
        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let restored: CaptureConfig = toml::from_str(&toml_str).expect("deserialize");

        // Assert
        assert_eq!(cfg, restored);
    }

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let cfg: CaptureConfig = toml::from_str("[log]\nlevel = \"trace\"\n").expect("parse");
        assert_eq!(cfg.log.level, "trace");
        assert_eq!(cfg.suppression.grace_period_ms, 10);
    }
}
