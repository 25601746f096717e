use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::core::calibration::default_importance;
use crate::core::weights::{ClampPolicy, WeightVector};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    pub scorer: ScorerSettings,
    #[serde(default)]
    pub weights: WeightBounds,
    #[serde(default)]
    pub calibration: CalibrationSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Leaving `url` unset runs the service on the in-memory store
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScorerSettings {
    pub base_url: String,
    #[serde(default = "default_scorer_timeout")]
    pub timeout_secs: u64,
    /// Learning rate forwarded with every feedback call
    #[serde(default = "default_feedback_eta")]
    pub feedback_eta: f64,
}

fn default_scorer_timeout() -> u64 { 10 }
fn default_feedback_eta() -> f64 { 0.05 }

#[derive(Debug, Clone, Deserialize)]
pub struct WeightBounds {
    #[serde(default = "default_weight_min")]
    pub min: f64,
    #[serde(default = "default_weight_max")]
    pub max: f64,
}

impl Default for WeightBounds {
    fn default() -> Self {
        Self {
            min: default_weight_min(),
            max: default_weight_max(),
        }
    }
}

fn default_weight_min() -> f64 { 0.1 }
fn default_weight_max() -> f64 { 2.0 }

#[derive(Debug, Clone, Deserialize)]
pub struct CalibrationSettings {
    /// Per-dimension step added when a card shows the trait
    #[serde(default = "default_importance")]
    pub importance: WeightVector,
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            importance: default_importance(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from files and environment
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (prefixed with DORM__)
    /// 2. Local overrides (config/local.toml)
    /// 3. Configuration file (config/default.toml)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., DORM__SERVER__PORT -> server.port
            .add_source(env_source())
            .build()?;

        with_database_url(settings)?.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(env_source())
            .build()?;

        settings.try_deserialize()
    }

    /// Weight bounds as a validated clamp policy
    pub fn clamp_policy(&self) -> Result<ClampPolicy, ConfigError> {
        ClampPolicy::new(self.weights.min, self.weights.max).ok_or_else(|| {
            ConfigError::Message(format!(
                "invalid weight bounds: min {} max {}",
                self.weights.min, self.weights.max
            ))
        })
    }
}

fn env_source() -> Environment {
    Environment::with_prefix("DORM")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

/// The conventional DATABASE_URL wins over the file value when set
fn with_database_url(settings: Config) -> Result<Config, ConfigError> {
    match std::env::var("DATABASE_URL") {
        Ok(url) if !url.trim().is_empty() => Config::builder()
            .add_source(settings)
            .set_override("database.url", url)?
            .build(),
        _ => Ok(settings),
    }
}
