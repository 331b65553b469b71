//! Настройки симуляции и ошибки конфигов
//!
//! Все *Config структуры (locomotion, ground, ragdoll, bot, player): plain data
//! с `Default`, serde и `validate()`. Ошибки только на загрузке, никогда в тике.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{field} = {value} is outside {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },
}

/// Проверка диапазона для validate() конфигов
pub(crate) fn check_range(field: &'static str, value: f32, min: f32, max: f32) -> Result<(), ConfigError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

/// Глобальные настройки симуляции
#[derive(Resource, Debug, Clone, Serialize, Deserialize, Reflect)]
#[reflect(Resource)]
#[serde(default)]
pub struct SimulationSettings {
    /// Гравитация (m/s²)
    pub gravity: Vec3,
    /// Частота physics tick (Hz)
    pub physics_hz: f64,
    /// Seed для DeterministicRng
    pub seed: u64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            physics_hz: 60.0,
            seed: 42,
        }
    }
}

impl SimulationSettings {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("physics_hz", self.physics_hz as f32, 1.0, 1000.0)?;
        check_range("gravity.y", self.gravity.y, -100.0, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_valid() {
        let settings = SimulationSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.physics_hz, 60.0);
    }

    #[test]
    fn test_rejects_zero_tick_rate() {
        let settings = SimulationSettings {
            physics_hz: 0.0,
            ..default()
        };
        let err = settings.validate().unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { field: "physics_hz", .. }));
    }

    #[test]
    fn test_from_json_reports_parse_errors() {
        let err = SimulationSettings::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }
}
