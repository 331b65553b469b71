//! Параметры locomotion controller'а
//!
//! Все скорости в m/s, ускорения в m/s², время в секундах.
//! Силы считаются как ускорения (не зависят от массы тела).

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{check_range, ConfigError};

#[derive(Debug, Clone, Copy, PartialEq, Reflect, Serialize, Deserialize)]
#[serde(default)]
pub struct LocomotionConfig {
    // === Движение ===
    /// Ускорение при полном input на земле
    pub move_acceleration: f32,
    /// Потолок скорости вдоль поверхности
    pub max_speed: f32,
    /// Множитель ускорения в воздухе
    pub air_control: f32,
    /// Постоянный прижим вниз (стабилизирует контакты)
    pub ground_bias_acceleration: f32,

    // === Склоны ===
    pub max_slope_angle_deg: f32,
    pub slope_speed_multiplier: f32,
    /// 0 = без компенсации, 1 = гравитация вдоль склона полностью снята
    pub slope_gravity_compensation: f32,

    // === Торможение ===
    pub stop_deceleration: f32,
    /// Ниже этой горизонтальной скорости: мгновенная остановка
    pub min_stop_speed: f32,
    /// |forward intent| меньше порога = нет ввода
    pub brake_input_threshold: f32,

    // === Прыжок ===
    /// Полный Δv прыжка
    pub jump_speed: f32,
    /// Доля вертикали (остаток: вдоль нормали пола)
    pub jump_vertical_share: f32,
    pub jump_cooldown: f32,

    // === Dive ===
    /// Δv dive без momentum-режима
    pub dive_speed: f32,
    pub use_dive_momentum: bool,
    /// Δv = forward * speed * momentum * gain
    pub dive_momentum_gain: f32,
    /// Выше этой скорости momentum = 0.5 (иначе 1.0)
    pub dive_momentum_speed_threshold: f32,
    /// Dive перевзводится только на земле и ниже этой скорости
    pub dive_rearm_speed: f32,
    /// Settle после перевзвода, до снятия wait_delay
    pub dive_settle_delay: f32,

    // === Step-up ===
    pub step_height: f32,
    /// Скорость подъёма на ступень
    pub step_smooth: f32,
    /// Дистанции лучей за поверхностью капсулы: ступни / нижний / верхний
    pub step_check_distance: f32,
    pub step_check_distance_head1: f32,
    pub step_check_distance_head2: f32,
}

impl Default for LocomotionConfig {
    fn default() -> Self {
        Self {
            move_acceleration: 40.0,
            max_speed: 7.0,
            air_control: 0.25,
            ground_bias_acceleration: 1.0,

            max_slope_angle_deg: 35.0,
            slope_speed_multiplier: 1.0,
            slope_gravity_compensation: 1.0,

            stop_deceleration: 8.0,
            min_stop_speed: 0.2,
            brake_input_threshold: 0.01,

            jump_speed: 5.5,
            jump_vertical_share: 0.75,
            jump_cooldown: 0.5,

            dive_speed: 4.0,
            use_dive_momentum: true,
            dive_momentum_gain: 0.8,
            dive_momentum_speed_threshold: 5.0,
            dive_rearm_speed: 7.5,
            dive_settle_delay: 0.5,

            step_height: 0.4,
            step_smooth: 2.0,
            step_check_distance: 0.3,
            step_check_distance_head1: 0.4,
            step_check_distance_head2: 0.5,
        }
    }
}

impl LocomotionConfig {
    /// Player preset
    pub fn player() -> Self {
        Self::default()
    }

    /// Bot preset: чуть медленнее и без momentum-dive
    pub fn bot() -> Self {
        Self {
            max_speed: 6.5,
            use_dive_momentum: false,
            ..Self::default()
        }
    }

    pub fn with_max_speed(mut self, max_speed: f32) -> Self {
        self.max_speed = max_speed;
        self
    }

    pub fn with_move_acceleration(mut self, acceleration: f32) -> Self {
        self.move_acceleration = acceleration;
        self
    }

    pub fn with_air_control(mut self, air_control: f32) -> Self {
        self.air_control = air_control;
        self
    }

    pub fn with_jump_speed(mut self, jump_speed: f32) -> Self {
        self.jump_speed = jump_speed;
        self
    }

    pub fn with_jump_cooldown(mut self, cooldown: f32) -> Self {
        self.jump_cooldown = cooldown;
        self
    }

    pub fn with_slope_compensation(mut self, factor: f32) -> Self {
        self.slope_gravity_compensation = factor;
        self
    }

    pub fn with_dive_momentum(mut self, enabled: bool) -> Self {
        self.use_dive_momentum = enabled;
        self
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("move_acceleration", self.move_acceleration, 0.0, 1000.0)?;
        check_range("max_speed", self.max_speed, 0.1, 100.0)?;
        check_range("air_control", self.air_control, 0.0, 1.0)?;
        check_range("max_slope_angle_deg", self.max_slope_angle_deg, 0.0, 89.0)?;
        check_range("slope_gravity_compensation", self.slope_gravity_compensation, 0.0, 2.0)?;
        check_range("stop_deceleration", self.stop_deceleration, 0.0, 1000.0)?;
        check_range("jump_speed", self.jump_speed, 0.0, 100.0)?;
        check_range("jump_vertical_share", self.jump_vertical_share, 0.0, 1.0)?;
        check_range("jump_cooldown", self.jump_cooldown, 0.0, 10.0)?;
        check_range("dive_settle_delay", self.dive_settle_delay, 0.0, 10.0)?;
        check_range("step_height", self.step_height, 0.0, 2.0)
    }

    pub fn max_slope_cos(&self) -> f32 {
        self.max_slope_angle_deg.to_radians().cos()
    }
}
