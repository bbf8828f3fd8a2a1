//! Configuration file support for Platewise.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/platewise/config.toml`.

use crate::{Error, Result, Settings, UnitSystem};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub defaults: DefaultsConfig,
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

/// Settings used until the user changes them
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default = "crate::types::default_daily_calorie_goal")]
    pub daily_calorie_goal: u32,

    #[serde(default = "crate::types::default_language")]
    pub language: String,

    #[serde(default)]
    pub preferred_units: UnitSystem,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        let settings = Settings::default();
        Self {
            daily_calorie_goal: settings.daily_calorie_goal,
            language: settings.language,
            preferred_units: settings.preferred_units,
        }
    }
}

impl DefaultsConfig {
    /// Settings to start from when nothing has been persisted yet
    pub fn to_settings(&self) -> Settings {
        Settings {
            daily_calorie_goal: self.daily_calorie_goal,
            language: self.language.clone(),
            preferred_units: self.preferred_units,
        }
    }
}

fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("platewise")
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
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("platewise").join("config.toml")
    }

    /// Reject values the store would never accept from a user
    pub fn validate(&self) -> Result<()> {
        if self.defaults.daily_calorie_goal == 0 {
            return Err(Error::Config(
                "defaults.daily_calorie_goal must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.defaults.daily_calorie_goal, 2000);
        assert_eq!(config.defaults.language, "English");
        assert!(config.data.data_dir.ends_with("platewise"));
    }

    #[test]
    fn test_config_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");

        let mut config = Config::default();
        config.defaults.language = "Polish".into();
        std::fs::write(&path, toml::to_string_pretty(&config).unwrap()).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.defaults.language, "Polish");
        assert_eq!(loaded.data.data_dir, config.data.data_dir);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[defaults]
daily_calorie_goal = 1800
preferred_units = "imperial"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        let settings = config.defaults.to_settings();
        assert_eq!(settings.daily_calorie_goal, 1800);
        assert_eq!(settings.language, "English"); // default
        assert_eq!(settings.preferred_units, UnitSystem::Imperial);
    }

    #[test]
    fn test_zero_goal_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[defaults]\ndaily_calorie_goal = 0\n").unwrap();

        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }
}
