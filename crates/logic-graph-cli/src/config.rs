//! CLI configuration management.
//!
//! Values come from built-in defaults, then the JSON config file, then
//! environment variables (a `.env` file is honoured), then command-line
//! flags.

use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use logic_graph_sim::SimConfig;
use serde::{Deserialize, Serialize};

/// Overrides the config file location.
pub const CONFIG_FILE_ENV: &str = "LG_CONFIG_FILE";

/// Application-wide configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Simulation speed in ticks per second.
    pub speed: f64,

    /// Host frame rate used by `lg run`.
    pub frame_rate: f64,

    /// Project root for snapshots (the store lives in `<store_dir>/.logic`).
    pub store_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let store_dir = ProjectDirs::from("dev", "logic-graph", "lg")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| std::env::temp_dir().join("logic-graph"));

        Self {
            speed: 10.0,
            frame_rate: 60.0,
            store_dir,
        }
    }
}

impl Config {
    /// Load configuration from the config file and environment variables.
    pub fn load() -> Result<Self> {
        // Load .env file if present (silently ignore if missing)
        let _ = dotenvy::dotenv();

        let mut config = Self::default();

        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                let contents = std::fs::read_to_string(&config_path).with_context(|| {
                    format!("Failed to read config from {}", config_path.display())
                })?;
                config = serde_json::from_str(&contents)
                    .with_context(|| "Failed to parse config file")?;
            }
        }

        // Environment variables take precedence over the file
        if let Ok(speed) = std::env::var("LG_SPEED") {
            config.speed = speed
                .parse()
                .with_context(|| format!("LG_SPEED is not a number: {speed}"))?;
        }
        if let Ok(frame_rate) = std::env::var("LG_FRAME_RATE") {
            config.frame_rate = frame_rate
                .parse()
                .with_context(|| format!("LG_FRAME_RATE is not a number: {frame_rate}"))?;
        }
        if let Ok(store_dir) = std::env::var("LG_STORE_DIR") {
            config.store_dir = PathBuf::from(store_dir);
        }

        Ok(config)
    }

    /// Save current configuration to the config file.
    pub fn save(&self) -> Result<()> {
        if let Some(config_path) = Self::config_file_path() {
            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create config directory: {}", parent.display())
                })?;
            }
            let contents = serde_json::to_string_pretty(self)?;
            std::fs::write(&config_path, contents)
                .with_context(|| format!("Failed to write config to {}", config_path.display()))?;
        }
        Ok(())
    }

    /// Get the path to the config file.
    pub fn config_file_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
            return Some(PathBuf::from(path));
        }
        ProjectDirs::from("dev", "logic-graph", "lg")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Simulator settings derived from this configuration.
    pub fn sim_config(&self) -> Result<SimConfig> {
        let sim = SimConfig {
            speed: self.speed,
            ..Default::default()
        };
        sim.validate()?;
        Ok(sim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.speed, 10.0);
        assert_eq!(config.frame_rate, 60.0);
        assert_eq!(config.sim_config().unwrap().speed, 10.0);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = serde_json::from_str(r#"{ "frame_rate": 30.0 }"#).unwrap();
        assert_eq!(config.frame_rate, 30.0);
        assert_eq!(config.speed, 10.0);
    }

    #[test]
    fn test_invalid_speed_rejected() {
        let config = Config {
            speed: -3.0,
            ..Default::default()
        };
        assert!(config.sim_config().is_err());
    }
}
