//! Configuration file support for Gutlog.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/gutlog/config.toml`.

use crate::types::QuantityUnit;
use crate::{Error, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub analytics: AnalyticsConfig,

    #[serde(default)]
    pub predictor: PredictorConfig,

    #[serde(default)]
    pub nutrition: NutritionConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Rolling analytics parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Trailing window length in days, anchored at "now"
    #[serde(default = "default_window_days")]
    pub window_days: i64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
        }
    }
}

/// Predictor calibration parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PredictorConfig {
    /// Minimum paired observations before prediction is offered
    #[serde(default = "default_min_training_pairs")]
    pub min_training_pairs: usize,

    /// Lookback used when no prior stool event bounds the window
    #[serde(default = "default_fallback_lookback_hours")]
    pub fallback_lookback_hours: i64,

    /// Floor applied to per-dimension standard deviation during scaling
    #[serde(default = "default_std_dev_floor")]
    pub std_dev_floor: f64,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            min_training_pairs: default_min_training_pairs(),
            fallback_lookback_hours: default_fallback_lookback_hours(),
            std_dev_floor: default_std_dev_floor(),
        }
    }
}

/// A user-supplied food table entry (nutrients per one `unit`)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CustomFood {
    pub name: String,
    pub unit: QuantityUnit,
    pub calories: f64,
    pub fiber: f64,
    pub fat: f64,
    pub protein: f64,
}

/// Food table extensions
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct NutritionConfig {
    #[serde(default)]
    pub custom: Vec<CustomFood>,
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        let home = std::env::var("HOME").expect("HOME environment variable not set");
        PathBuf::from(home).join(".local/share")
    });
    base.join("gutlog")
}

fn default_window_days() -> i64 {
    30
}

fn default_min_training_pairs() -> usize {
    20
}

fn default_fallback_lookback_hours() -> i64 {
    24
}

fn default_std_dev_floor() -> f64 {
    1.0
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            let home = std::env::var("HOME").expect("HOME environment variable not set");
            PathBuf::from(home).join(".config")
        });
        base.join("gutlog").join("config.toml")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path.
    ///
    /// Atomically writes by:
    /// 1. Writing to a temp file in the same directory
    /// 2. Syncing to disk
    /// 3. Renaming over the original
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let temp = NamedTempFile::new_in(path.parent().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::Other, "config path missing parent")
        })?)?;

        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = toml::to_string_pretty(self)
                .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Check configured parameters for values the engine cannot work with
    fn validate(&self) -> Result<()> {
        if self.analytics.window_days < 1 {
            return Err(Error::Config(format!(
                "analytics.window_days must be >= 1, got {}",
                self.analytics.window_days
            )));
        }
        if self.predictor.fallback_lookback_hours < 1 {
            return Err(Error::Config(format!(
                "predictor.fallback_lookback_hours must be >= 1, got {}",
                self.predictor.fallback_lookback_hours
            )));
        }
        if self.predictor.std_dev_floor <= 0.0 {
            return Err(Error::Config(format!(
                "predictor.std_dev_floor must be positive, got {}",
                self.predictor.std_dev_floor
            )));
        }
        Ok(())
    }
}
