//! Rigid body персонажа: скорость, масса, накопители сил, форма капсулы
//!
//! Позиция и ориентация живут в `Transform` (центр капсулы).
//! `CharacterBody` + `Transform` вместе = RigidBodyState.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Маркер персонажа (игрок или бот)
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct Character;

/// Слой поверхности, с которой пришёл контакт
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Reflect, Serialize, Deserialize)]
pub enum CollisionLayer {
    /// Пол, стены, платформы трассы
    #[default]
    Ground,
    /// Другой персонаж
    Character,
    /// Trigger-объёмы (ветер, зоны): никогда не считаются полом
    Trigger,
}

/// Физическое состояние тела персонажа
///
/// Единственный gameplay-писатель: locomotion controller в FixedUpdate.
/// Интегрирует backend (headless step или Rapier).
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
#[require(Transform)]
pub struct CharacterBody {
    /// Линейная скорость (m/s)
    pub linear_velocity: Vec3,
    /// Угловая скорость (rad/s), работает только при свободном вращении
    pub angular_velocity: Vec3,
    /// Масса (kg)
    pub mass: f32,
    /// Сумма сил за текущий тик (N), обнуляется после интеграции
    pub accumulated_force: Vec3,
    /// Кинематический сдвиг (step-up, подъём после ragdoll), применяется при интеграции
    pub pending_translation: Vec3,
    /// Заблокировано ли вращение (pitch/roll). Снимается на время ragdoll
    pub rotation_locked: bool,
}

impl Default for CharacterBody {
    fn default() -> Self {
        Self {
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            mass: 70.0,
            accumulated_force: Vec3::ZERO,
            pending_translation: Vec3::ZERO,
            rotation_locked: true,
        }
    }
}

impl CharacterBody {
    pub fn with_mass(mass: f32) -> Self {
        Self {
            mass: mass.max(0.1),
            ..default()
        }
    }

    pub fn speed(&self) -> f32 {
        self.linear_velocity.length()
    }

    pub fn horizontal_velocity(&self) -> Vec3 {
        Vec3::new(self.linear_velocity.x, 0.0, self.linear_velocity.z)
    }

    /// Сила в ньютонах, применяется на следующей интеграции
    pub fn apply_force(&mut self, force: Vec3) {
        self.accumulated_force += force;
    }

    /// Ускорение независимо от массы (ForceMode.Acceleration аналог)
    pub fn apply_acceleration(&mut self, acceleration: Vec3) {
        self.accumulated_force += acceleration * self.mass;
    }

    /// Мгновенное изменение импульса
    pub fn apply_impulse(&mut self, impulse: Vec3) {
        self.linear_velocity += impulse / self.mass;
    }

    /// Мгновенное изменение скорости (impulse / mass уже посчитан)
    pub fn apply_velocity_change(&mut self, delta: Vec3) {
        self.linear_velocity += delta;
    }

    pub fn stop(&mut self) {
        self.linear_velocity = Vec3::ZERO;
        self.angular_velocity = Vec3::ZERO;
        self.accumulated_force = Vec3::ZERO;
    }

    /// Интеграция сил в скорость: v += (g + F/m) * dt
    ///
    /// Общая для обоих backend'ов (в Rapier режиме гравитацию считает Rapier,
    /// передаём `Vec3::ZERO`).
    pub fn integrate_forces(&mut self, gravity: Vec3, dt: f32) {
        let acceleration = gravity + self.accumulated_force / self.mass;
        self.linear_velocity += acceleration * dt;
        self.accumulated_force = Vec3::ZERO;
    }

    pub fn take_pending_translation(&mut self) -> Vec3 {
        std::mem::take(&mut self.pending_translation)
    }
}

/// Капсула персонажа (вертикальная)
#[derive(Component, Debug, Clone, Copy, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
pub struct CharacterShape {
    /// Радиус капсулы
    pub radius: f32,
    /// Расстояние от центра до ступней (половина полной высоты)
    pub half_height: f32,
}

impl Default for CharacterShape {
    fn default() -> Self {
        Self {
            radius: 0.35,
            half_height: 0.9,
        }
    }
}

impl CharacterShape {
    pub fn feet(&self, center: Vec3) -> Vec3 {
        center - Vec3::Y * self.half_height
    }

    pub fn center_from_feet(&self, feet: Vec3) -> Vec3 {
        feet + Vec3::Y * self.half_height
    }

    /// Половина сегмента капсулы (без полусфер)
    pub fn half_segment(&self) -> f32 {
        (self.half_height - self.radius).max(0.0)
    }

    /// Центры сфер аппроксимации: низ, середина, верх
    pub fn sphere_centers(&self, center: Vec3) -> [Vec3; 3] {
        let offset = Vec3::Y * self.half_segment();
        [center - offset, center, center + offset]
    }
}
