//! Configuration loading and config file resolution
//!
//! Config file resolution priority order:
//! 1. Command-line argument (highest priority)
//! 2. `RTW_CONFIG` environment variable
//! 3. Per-user config file (`~/.config/rtw/<module>.toml`)
//! 4. Compiled defaults (fallback)
//!
//! A file named explicitly (CLI or environment) must load; a missing or
//! unreadable per-user file only produces a warning and the compiled defaults.

use crate::messages::TeamColor;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "RTW_CONFIG";

/// Which world implementation the service runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorldKind {
    /// Multi-camera fusion
    #[default]
    Filtered,
    /// Forwards the latest frame unfused
    Dummy,
}

/// How per-camera orientations are averaged into one heading
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrientationAveraging {
    /// Mean of unit vectors; well defined across the +-PI seam
    #[default]
    Circular,
    /// Plain arithmetic mean of the raw angles
    Arithmetic,
}

/// Fusion thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionConfig {
    /// A fused robot older than this (seconds) is evicted
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: f64,

    /// A fused robot stamped further than this (seconds) ahead of now is evicted
    #[serde(default)]
    pub future_tolerance_secs: f64,

    /// Consecutive ball-less frames before a camera's ball entry is dropped
    #[serde(default = "default_ball_miss_limit")]
    pub ball_miss_limit: u32,

    #[serde(default)]
    pub orientation_averaging: OrientationAveraging,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            stale_after_secs: default_stale_after_secs(),
            future_tolerance_secs: 0.0,
            ball_miss_limit: default_ball_miss_limit(),
            orientation_averaging: OrientationAveraging::default(),
        }
    }
}

/// Default velocity estimator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictorConfig {
    /// Sample history kept per entity (seconds)
    #[serde(default = "default_window_secs")]
    pub window_secs: f64,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Service configuration loaded from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Selects which detection colour is "ours"
    #[serde(default = "default_our_color")]
    pub our_color: TeamColor,

    #[serde(default)]
    pub world: WorldKind,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub fusion: FusionConfig,

    #[serde(default)]
    pub predictor: PredictorConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            our_color: default_our_color(),
            world: WorldKind::default(),
            port: default_port(),
            fusion: FusionConfig::default(),
            predictor: PredictorConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl TomlConfig {
    /// Parse a TOML document and validate it
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the fusion core cannot work with
    pub fn validate(&self) -> Result<()> {
        let fusion = &self.fusion;
        if !(fusion.stale_after_secs.is_finite() && fusion.stale_after_secs >= 0.0) {
            return Err(Error::Config(format!(
                "fusion.stale_after_secs must be a non-negative number, got {}",
                fusion.stale_after_secs
            )));
        }
        if !(fusion.future_tolerance_secs.is_finite() && fusion.future_tolerance_secs >= 0.0) {
            return Err(Error::Config(format!(
                "fusion.future_tolerance_secs must be a non-negative number, got {}",
                fusion.future_tolerance_secs
            )));
        }
        if fusion.ball_miss_limit == 0 {
            return Err(Error::Config("fusion.ball_miss_limit must be at least 1".to_string()));
        }
        if !(self.predictor.window_secs.is_finite() && self.predictor.window_secs > 0.0) {
            return Err(Error::Config(format!(
                "predictor.window_secs must be positive, got {}",
                self.predictor.window_secs
            )));
        }
        Ok(())
    }
}

fn default_our_color() -> TeamColor {
    TeamColor::Yellow
}

fn default_port() -> u16 {
    5790
}

fn default_stale_after_secs() -> f64 {
    0.1
}

fn default_ball_miss_limit() -> u32 {
    5
}

fn default_window_secs() -> f64 {
    0.1
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Load and validate a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read config file {:?}: {}", path, e)))?;
    TomlConfig::from_toml_str(&content)
}

/// Per-user config file location for a module, if the platform has one
pub fn default_config_path(module_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("rtw").join(format!("{}.toml", module_name)))
}

/// Config file resolution for one module
pub struct ConfigResolver {
    module_name: String,
}

impl ConfigResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
        }
    }

    /// Explicitly requested config file: CLI argument, then environment
    pub fn explicit_path(&self, cli_arg: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = cli_arg {
            return Some(path.to_path_buf());
        }
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) if !path.trim().is_empty() => Some(PathBuf::from(path)),
            _ => None,
        }
    }

    /// Resolve and load the configuration
    ///
    /// Explicit files must exist and parse. Without one, the per-user file is
    /// used when readable, otherwise the compiled defaults. A per-user file
    /// that reads but fails to parse is still an error.
    pub fn load(&self, cli_arg: Option<&Path>) -> Result<TomlConfig> {
        if let Some(path) = self.explicit_path(cli_arg) {
            let config = load_toml_config(&path)?;
            info!("Loaded configuration from {:?}", path);
            return Ok(config);
        }

        match default_config_path(&self.module_name) {
            Some(path) if path.exists() => match std::fs::read_to_string(&path) {
                Ok(content) => {
                    let config = TomlConfig::from_toml_str(&content)?;
                    info!("Loaded configuration from {:?}", path);
                    Ok(config)
                }
                Err(e) => {
                    warn!("Cannot read config file {:?} ({}), using compiled defaults", path, e);
                    Ok(TomlConfig::default())
                }
            },
            Some(path) => {
                warn!("No config file at {:?}, using compiled defaults", path);
                Ok(TomlConfig::default())
            }
            None => {
                warn!("Could not determine config directory, using compiled defaults");
                Ok(TomlConfig::default())
            }
        }
    }
}
