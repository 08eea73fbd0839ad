//! Configuration file support for Kraft.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/kraft/config.toml`.

use crate::store::StorageOptions;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub plates: PlateConfig,

    #[serde(default)]
    pub training: TrainingConfig,
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

/// Add-on plate configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlateConfig {
    /// Weight of one additional plate in kg
    #[serde(default = "default_increment_kg")]
    pub increment_kg: f64,

    #[serde(default = "default_max_additional")]
    pub max_additional: u8,
}

impl Default for PlateConfig {
    fn default() -> Self {
        Self {
            increment_kg: default_increment_kg(),
            max_additional: default_max_additional(),
        }
    }
}

/// Training view behaviour
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Write the session weight back to the catalog when an exercise is completed
    #[serde(default = "default_true")]
    pub remember_weight_on_complete: bool,

    #[serde(default)]
    pub show_completed: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            remember_weight_on_complete: true,
            show_completed: false,
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("kraft")
}

fn default_increment_kg() -> f64 {
    2.5
}

fn default_max_additional() -> u8 {
    2
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
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
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("kraft").join("config.toml")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let increment = self.plates.increment_kg;
        if !increment.is_finite() || increment < 0.0 {
            return Err(Error::Config(format!(
                "plates.increment_kg must be a non-negative number, got {}",
                increment
            )));
        }
        Ok(())
    }

    pub fn storage_options(&self) -> StorageOptions {
        StorageOptions {
            plate_increment_kg: self.plates.increment_kg,
            max_additional_plates: self.plates.max_additional,
        }
    }
}
