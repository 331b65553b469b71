//! GroundContactTracker: grounded/не grounded с гистерезисом
//!
//! Контакт считается полом, если угол нормали с world-up меньше порога.
//! Потеря контакта не снимает grounded сразу: планируется unground через
//! N physics ticks, любой новый валидный контакт его отменяет. Так персонаж
//! не мигает на швах ступеней и рамп.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::components::CollisionLayer;
use crate::config::{check_range, ConfigError};
use crate::physics::SolidId;

#[derive(Debug, Clone, Copy, PartialEq, Reflect, Serialize, Deserialize)]
pub struct GroundConfig {
    /// Максимальный угол пола от вертикали (градусы)
    pub floor_angle_deg: f32,
    /// Landed только если vy при касании ≤ этого порога
    pub landing_velocity_threshold: f32,
    /// Сколько physics ticks без контакта до grounded = false
    pub unground_delay_ticks: u32,
    /// Скорость другого персонажа, с которой удар считается сбивающим (m/s)
    pub hit_speed_threshold: f32,
}

impl Default for GroundConfig {
    fn default() -> Self {
        Self {
            floor_angle_deg: 35.0,
            landing_velocity_threshold: 0.5,
            unground_delay_ticks: 3,
            hit_speed_threshold: 7.0,
        }
    }
}

impl GroundConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("floor_angle_deg", self.floor_angle_deg, 0.0, 89.0)?;
        check_range("hit_speed_threshold", self.hit_speed_threshold, 0.0, 1000.0)?;
        check_range("unground_delay_ticks", self.unground_delay_ticks as f32, 1.0, 600.0)
    }
}

/// Результат обработки контакта
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactOutcome {
    /// Не пол (стена, потолок, другой слой)
    Ignored,
    /// Пол, grounded уже был
    Floor,
    /// Переход false → true с допустимой vy: Landed
    Landed,
    /// Переход false → true, но ещё летим вверх (скользящий контакт)
    TouchedRising,
}

/// GroundContact персонажа
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
pub struct GroundContactTracker {
    pub config: GroundConfig,
    grounded: bool,
    floor_normal: Vec3,
    /// Оставшиеся тики до unground (None = не запланирован)
    unground_in: Option<u32>,
    contact_this_tick: bool,
    /// Solid, на котором стоим (для переноса платформами)
    ground_surface: Option<SolidId>,
}

impl Default for GroundContactTracker {
    fn default() -> Self {
        Self::new(GroundConfig::default())
    }
}

impl GroundContactTracker {
    pub fn new(config: GroundConfig) -> Self {
        Self {
            config,
            grounded: false,
            floor_normal: Vec3::Y,
            unground_in: None,
            contact_this_tick: false,
            ground_surface: None,
        }
    }

    pub fn is_grounded(&self) -> bool {
        self.grounded
    }

    pub fn floor_normal(&self) -> Vec3 {
        self.floor_normal
    }

    pub fn unground_pending(&self) -> bool {
        self.unground_in.is_some()
    }

    pub fn ground_surface(&self) -> Option<SolidId> {
        self.ground_surface
    }

    pub fn is_floor(&self, normal: Vec3) -> bool {
        let normal = normal.normalize_or_zero();
        if normal == Vec3::ZERO {
            return false;
        }
        normal.dot(Vec3::Y) > self.config.floor_angle_deg.to_radians().cos()
    }

    /// Один контакт за тик. `vertical_velocity`: vy тела в момент контакта.
    pub fn report_contact(
        &mut self,
        normal: Vec3,
        layer: CollisionLayer,
        vertical_velocity: f32,
        surface: Option<SolidId>,
    ) -> ContactOutcome {
        if layer != CollisionLayer::Ground || !self.is_floor(normal) {
            return ContactOutcome::Ignored;
        }

        let was_grounded = self.grounded;
        self.grounded = true;
        self.floor_normal = normal.normalize();
        self.unground_in = None;
        self.contact_this_tick = true;
        self.ground_surface = surface;

        if was_grounded {
            ContactOutcome::Floor
        } else if vertical_velocity <= self.config.landing_velocity_threshold {
            ContactOutcome::Landed
        } else {
            ContactOutcome::TouchedRising
        }
    }

    /// Удар от другого тела. `true` = HitByOther.
    pub fn report_impact(&self, other_speed: f32, other_is_character: bool) -> bool {
        other_is_character && other_speed >= self.config.hit_speed_threshold
    }

    /// Конец physics tick. Возвращает `true`, если grounded только что снялся.
    pub fn end_tick(&mut self) -> bool {
        let had_contact = std::mem::take(&mut self.contact_this_tick);
        if had_contact || !self.grounded {
            return false;
        }

        // Первый тик без контакта планирует unground, следующие считают вниз
        let remaining = self.unground_in.get_or_insert(self.config.unground_delay_ticks.max(1));
        *remaining -= 1;
        if *remaining == 0 {
            self.unground_in = None;
            self.grounded = false;
            self.ground_surface = None;
            return true;
        }
        false
    }

    /// Мгновенно в воздух (respawn, телепорт)
    pub fn reset(&mut self) {
        *self = Self::new(self.config);
    }
}
