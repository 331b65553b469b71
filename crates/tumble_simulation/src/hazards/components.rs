//! Hazard components: всё привязано к solid'ам `CourseGeometry`

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::physics::{CourseSolid, SolidId};

/// Батут: импульс вдоль своей нормали на старте контакта сверху
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trampoline {
    pub solid: SolidId,
    /// Δv вверх (m/s)
    pub bounce_speed: f32,
}

impl Trampoline {
    pub fn new(solid: SolidId) -> Self {
        Self {
            solid,
            bounce_speed: 12.0,
        }
    }

    pub fn with_bounce_speed(mut self, speed: f32) -> Self {
        self.bounce_speed = speed;
        self
    }
}

/// Бампер: любой контакт сбивает персонажа и отбрасывает от поверхности
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bumper {
    pub solid: SolidId,
    pub knockback_speed: f32,
    /// false = только отбрасывание, без ragdoll
    pub knockdown: bool,
}

impl Bumper {
    pub fn new(solid: SolidId) -> Self {
        Self {
            solid,
            knockback_speed: 10.0,
            knockdown: true,
        }
    }

    pub fn with_knockdown(mut self, knockdown: bool) -> Self {
        self.knockdown = knockdown;
        self
    }

    /// Δv от нормали контакта: в сторону от бампера, с небольшим подбросом
    pub fn knockback(&self, contact_normal: Vec3) -> Vec3 {
        let flat = Vec3::new(contact_normal.x, 0.0, contact_normal.z).normalize_or_zero();
        let direction = if flat == Vec3::ZERO {
            Vec3::Y
        } else {
            (flat + Vec3::Y * 0.3).normalize()
        };
        direction * self.knockback_speed
    }
}

/// Вентилятор: trigger-объём с постоянным ускорением вдоль up solid'а
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindZone {
    pub solid: SolidId,
    /// m/s², знак = вверх / вниз
    pub acceleration: f32,
    pub affects_bots: bool,
}

impl WindZone {
    pub fn new(solid: SolidId, acceleration: f32) -> Self {
        Self {
            solid,
            acceleration,
            affects_bots: true,
        }
    }

    pub fn players_only(mut self) -> Self {
        self.affects_bots = false;
        self
    }

    /// Ускорение для точки (None = вне объёма)
    pub fn acceleration_at(&self, volume: &CourseSolid, point: Vec3) -> Option<Vec3> {
        volume
            .contains(point)
            .then(|| volume.rotation * Vec3::Y * self.acceleration)
    }
}

/// Платформа, качающаяся по синусу вдоль оси
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovingPlatform {
    pub solid: SolidId,
    /// Центр колебаний
    pub origin: Vec3,
    pub axis: Vec3,
    pub amplitude: f32,
    /// rad/s
    pub speed: f32,
    pub phase: f32,
}

impl MovingPlatform {
    pub fn new(solid: SolidId, origin: Vec3, axis: Vec3, amplitude: f32, speed: f32) -> Self {
        Self {
            solid,
            origin,
            axis: axis.normalize_or_zero(),
            amplitude,
            speed,
            phase: 0.0,
        }
    }

    pub fn with_phase(mut self, phase: f32) -> Self {
        self.phase = phase;
        self
    }

    pub fn position_at(&self, seconds: f32) -> Vec3 {
        self.origin + self.axis * self.amplitude * (seconds * self.speed + self.phase).sin()
    }
}

/// Вращающееся препятствие: solid крутится вокруг своей локальной оси
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rotator {
    pub solid: SolidId,
    /// Поворот при t = 0
    pub base: Quat,
    /// Локальная ось (Y = крутится в плоскости пола, Z = «мельница»)
    pub axis: Vec3,
    /// rad/s, знак = направление
    pub speed: f32,
}

impl Rotator {
    pub fn new(solid: SolidId, base: Quat, axis: Vec3, speed: f32) -> Self {
        Self {
            solid,
            base: base.normalize(),
            axis: axis.normalize_or(Vec3::Y),
            speed,
        }
    }

    /// Горизонтальная «подметалка» вокруг вертикали
    pub fn sweeper(solid: SolidId, speed: f32) -> Self {
        Self::new(solid, Quat::IDENTITY, Vec3::Y, speed)
    }

    pub fn rotation_at(&self, seconds: f32) -> Quat {
        (self.base * Quat::from_axis_angle(self.axis, self.speed * seconds)).normalize()
    }
}

/// Маятник: solid качается вокруг точки подвеса
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pendulum {
    pub solid: SolidId,
    /// Точка подвеса (мир)
    pub pivot: Vec3,
    /// От подвеса до центра solid'а в покое
    pub arm: Vec3,
    /// Ось качания (мир)
    pub axis: Vec3,
    /// Максимальное отклонение (rad)
    pub amplitude: f32,
    /// rad/s
    pub speed: f32,
    pub phase: f32,
}

impl Pendulum {
    pub fn new(solid: SolidId, pivot: Vec3, arm: Vec3, amplitude: f32, speed: f32) -> Self {
        Self {
            solid,
            pivot,
            arm,
            axis: Vec3::Z,
            amplitude,
            speed,
            phase: 0.0,
        }
    }

    pub fn with_axis(mut self, axis: Vec3) -> Self {
        self.axis = axis.normalize_or(Vec3::Z);
        self
    }

    pub fn with_phase(mut self, phase: f32) -> Self {
        self.phase = phase;
        self
    }

    /// Угол отклонения: крайнее положение при t = 0
    pub fn swing_at(&self, seconds: f32) -> f32 {
        self.amplitude * (seconds * self.speed + self.phase).cos()
    }

    /// (центр solid'а, поворот) в момент `seconds`
    pub fn pose_at(&self, seconds: f32) -> (Vec3, Quat) {
        let rotation = Quat::from_axis_angle(self.axis, self.swing_at(seconds));
        (self.pivot + rotation * self.arm, rotation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};

    #[test]
    fn test_rotator_turns_at_constant_speed() {
        let rotator = Rotator::sweeper(SolidId(0), FRAC_PI_2);

        assert!(rotator.rotation_at(0.0).abs_diff_eq(Quat::IDENTITY, 1e-5));
        let quarter = rotator.rotation_at(1.0) * Vec3::X;
        assert!(quarter.abs_diff_eq(Vec3::NEG_Z, 1e-5), "{:?}", quarter);
        let half = rotator.rotation_at(2.0) * Vec3::X;
        assert!(half.abs_diff_eq(Vec3::NEG_X, 1e-5));
    }

    #[test]
    fn test_rotator_spins_around_local_axis() {
        // Наклонённая база: ось вращения поворачивается вместе с ней
        let base = Quat::from_rotation_x(FRAC_PI_2);
        let rotator = Rotator::new(SolidId(0), base, Vec3::Y, PI);

        let axis_world = base * Vec3::Y;
        for seconds in [0.0, 0.3, 0.7] {
            let rotation = rotator.rotation_at(seconds);
            assert!((rotation * Vec3::Y).abs_diff_eq(axis_world, 1e-5), "ось неподвижна");
        }
    }

    #[test]
    fn test_pendulum_swings_between_extremes() {
        let pendulum = Pendulum::new(SolidId(0), Vec3::new(0.0, 6.0, 0.0), Vec3::new(0.0, -4.0, 0.0), FRAC_PI_4, PI);

        // t = 0: крайнее положение, центр ушёл в сторону и вверх
        let (start, tilt) = pendulum.pose_at(0.0);
        assert!((tilt.to_axis_angle().1 - FRAC_PI_4).abs() < 1e-4);
        assert!(start.x > 2.0 && start.y > 2.0);

        // Четверть периода: внизу
        let (bottom, upright) = pendulum.pose_at(0.5);
        assert!(bottom.abs_diff_eq(Vec3::new(0.0, 2.0, 0.0), 1e-4));
        assert!(upright.abs_diff_eq(Quat::IDENTITY, 1e-4));

        // Полпериода: зеркально
        let (other, _) = pendulum.pose_at(1.0);
        assert!((other.x + start.x).abs() < 1e-4);
        assert!((other.y - start.y).abs() < 1e-4);
    }

    #[test]
    fn test_platform_oscillates_around_origin() {
        let platform = MovingPlatform::new(SolidId(0), Vec3::new(0.0, 2.0, 0.0), Vec3::X * 3.0, 1.5, PI);

        assert!(platform.position_at(0.0).abs_diff_eq(Vec3::new(0.0, 2.0, 0.0), 1e-5));
        assert!(platform.position_at(0.5).abs_diff_eq(Vec3::new(1.5, 2.0, 0.0), 1e-5), "ось нормализована");
        assert!(platform.position_at(1.5).abs_diff_eq(Vec3::new(-1.5, 2.0, 0.0), 1e-4));
    }

    #[test]
    fn test_wind_only_inside_volume() {
        let volume = CourseSolid::cuboid(Vec3::new(0.0, 2.0, 0.0), Vec3::new(1.0, 2.0, 1.0));
        let fan = WindZone::new(SolidId(0), 15.0);

        assert_eq!(fan.acceleration_at(&volume, Vec3::new(0.0, 1.0, 0.0)), Some(Vec3::Y * 15.0));
        assert_eq!(fan.acceleration_at(&volume, Vec3::new(3.0, 1.0, 0.0)), None);

        let down = WindZone::new(SolidId(0), -8.0);
        assert_eq!(down.acceleration_at(&volume, Vec3::new(0.0, 1.0, 0.0)), Some(Vec3::NEG_Y * 8.0));
    }

    #[test]
    fn test_bumper_knockback_points_away() {
        let bumper = Bumper::new(SolidId(0));

        let knockback = bumper.knockback(Vec3::NEG_X);
        assert!(knockback.x < 0.0);
        assert!(knockback.y > 0.0);
        assert!((knockback.length() - bumper.knockback_speed).abs() < 1e-4);

        // Наступили сверху: подбрасывает вверх
        assert!(bumper.knockback(Vec3::Y).abs_diff_eq(Vec3::Y * 10.0, 1e-5));
    }
}
