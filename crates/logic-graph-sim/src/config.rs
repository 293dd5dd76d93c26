//! Simulator configuration.

use serde::{Deserialize, Serialize};

use crate::clock::DEFAULT_MAX_BACKLOG_FACTOR;
use crate::error::{SimError, SimResult};

/// Configuration for a [`Simulator`](crate::Simulator).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Ticks per second.
    pub speed: f64,

    /// Backlog clamp multiplier (see [`SimClock`](crate::SimClock)).
    pub max_backlog_factor: f64,

    /// Whether the clock starts running.
    pub start_running: bool,

    /// Number of recent tick reports kept.
    pub history_window: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            speed: 10.0,
            max_backlog_factor: DEFAULT_MAX_BACKLOG_FACTOR,
            start_running: true,
            history_window: 64,
        }
    }
}

impl SimConfig {
    /// One tick per second, handy for watching a circuit by eye.
    pub fn slow() -> Self {
        Self {
            speed: 1.0,
            history_window: 16,
            ..Default::default()
        }
    }

    /// One tick per frame at 60 fps.
    pub fn fast() -> Self {
        Self {
            speed: 60.0,
            history_window: 256,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> SimResult<()> {
        if !self.speed.is_finite() || self.speed <= 0.0 {
            return Err(SimError::InvalidSpeed { speed: self.speed });
        }
        if !self.max_backlog_factor.is_finite() || self.max_backlog_factor <= 0.0 {
            return Err(SimError::InvalidConfig {
                message: format!(
                    "max_backlog_factor must be > 0, got {}",
                    self.max_backlog_factor
                ),
            });
        }
        if self.history_window == 0 {
            return Err(SimError::InvalidConfig {
                message: "history_window must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        SimConfig::default().validate().unwrap();
        SimConfig::slow().validate().unwrap();
        SimConfig::fast().validate().unwrap();
        assert!(SimConfig::slow().speed < SimConfig::fast().speed);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = SimConfig {
            speed: 0.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(SimError::InvalidSpeed { .. })));

        let config = SimConfig {
            history_window: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(SimError::InvalidConfig { .. })));

        let config = SimConfig {
            max_backlog_factor: -1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: SimConfig = serde_json::from_str(r#"{ "speed": 2.5 }"#).unwrap();
        assert_eq!(config.speed, 2.5);
        assert_eq!(config.history_window, 64);
        assert!(config.start_running);
    }
}
