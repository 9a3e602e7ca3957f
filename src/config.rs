use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::features::FeaturePolicy;

/// Configuration for the lockout guard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Event store configuration
    pub store: StoreConfig,
    /// Guard decision configuration
    pub guard: GuardConfig,
    /// Classifier model configuration
    pub model: ModelConfig,
}

/// Event store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite database file
    pub db_path: PathBuf,
}

/// Guard decision configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Lockout window duration W in seconds
    pub window_seconds: i64,
    /// Failure count T within the window that triggers a lockout
    pub failure_threshold: usize,
    /// History slice feeding the classifier features
    pub feature_policy: FeaturePolicy,
}

/// Classifier model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Path to a JSON model artifact; the built-in default model is
    /// used when unset
    pub artifact_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            store: StoreConfig {
                db_path: PathBuf::from("login_events.db"),
            },
            guard: GuardConfig {
                window_seconds: 60,
                failure_threshold: 3,
                feature_policy: FeaturePolicy::AllEvents,
            },
            model: ModelConfig {
                artifact_path: None,
            },
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn to_file(&self, path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}
