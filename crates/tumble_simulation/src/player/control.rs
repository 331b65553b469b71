//! PlayerControl: ввод человека → вызовы LocomotionController
//!
//! Оси ввода относительны yaw камеры. По умолчанию персонаж разворачивается
//! к направлению ввода (Idle / Turning / Moving, как у ботов) и идёт вперёд.
//! `camera_relative_strafe` включает режим "смотрим по камере, оси как есть".

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::ai::{drive_intent, IntentDrive, LocomotionIntentState};
use crate::components::CharacterBody;
use crate::config::{check_range, ConfigError};
use crate::ground::GroundContactTracker;
use crate::locomotion::LocomotionController;
use crate::ragdoll::RagdollTransitionManager;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerControlConfig {
    pub turn_speed: f32,
    pub move_start_angle_deg: f32,
    /// Оси в базисе камеры без разворота к вводу
    pub camera_relative_strafe: bool,
    /// Dive в воздухе: минимальный forward ввод
    pub air_dive_forward_input: f32,
    /// Dive в воздухе: минимальная скорость вперёд (m/s)
    pub air_dive_min_forward_speed: f32,
    /// Досрочный подъём, когда тело почти остановилось
    pub auto_stop_ragdoll_speed: f32,
    /// ...но не раньше, чем через столько секунд после падения
    pub auto_stop_min_time: f32,
}

impl Default for PlayerControlConfig {
    fn default() -> Self {
        Self {
            turn_speed: 15.0,
            move_start_angle_deg: 60.0,
            camera_relative_strafe: false,
            air_dive_forward_input: 0.1,
            air_dive_min_forward_speed: 1.0,
            auto_stop_ragdoll_speed: 1.0,
            auto_stop_min_time: 0.3,
        }
    }
}

impl PlayerControlConfig {
    pub fn with_strafe(mut self, enabled: bool) -> Self {
        self.camera_relative_strafe = enabled;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("turn_speed", self.turn_speed, 0.0, 1000.0)?;
        check_range("move_start_angle_deg", self.move_start_angle_deg, 0.0, 180.0)?;
        check_range("air_dive_forward_input", self.air_dive_forward_input, 0.0, 1.0)?;
        check_range("auto_stop_ragdoll_speed", self.auto_stop_ragdoll_speed, 0.0, 100.0)
    }

    fn drive(&self) -> IntentDrive {
        IntentDrive {
            turn_speed: self.turn_speed,
            move_start_angle_deg: self.move_start_angle_deg,
        }
    }
}

/// Ввод за frame
///
/// # Coordinate System
/// - `axes.x`: -1 (влево) → +1 (вправо)
/// - `axes.y`: -1 (назад) → +1 (вперёд)
/// - `camera_yaw`: поворот камеры вокруг Y (0 = смотрит в -Z)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerFrame {
    pub axes: Vec2,
    pub camera_yaw: f32,
    /// just_pressed
    pub jump_pressed: bool,
    /// Удерживается
    pub dive_held: bool,
}

/// Итог frame tick'а игрока
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerTick {
    pub state: LocomotionIntentState,
    pub jumped: bool,
    pub dived: bool,
}

/// Персонаж под управлением игрока
///
/// Акторы без этого компонента управляются BotDecisionAgent.
#[derive(Component, Debug, Clone, Default)]
pub struct PlayerControl {
    pub config: PlayerControlConfig,
    state: LocomotionIntentState,
}

impl PlayerControl {
    pub fn new(config: PlayerControlConfig) -> Self {
        Self {
            config,
            state: LocomotionIntentState::Idle,
        }
    }

    pub fn state(&self) -> LocomotionIntentState {
        self.state
    }

    pub fn apply(
        &mut self,
        input: &PlayerFrame,
        controller: &mut LocomotionController,
        rotation: Quat,
        body: &CharacterBody,
        ground: &GroundContactTracker,
    ) -> PlayerTick {
        let mut report = PlayerTick::default();

        controller.request_dive(input.dive_held);

        if !controller.can_move || controller.is_incapacitated() {
            controller.set_input(0.0, 0.0);
            self.state = LocomotionIntentState::Idle;
            return report;
        }

        let axes = input.axes.clamp_length_max(1.0);
        let camera = Quat::from_rotation_y(input.camera_yaw);

        self.state = if self.config.camera_relative_strafe {
            controller.set_movement_orientation(Some(camera));
            controller.set_input(axes.x, axes.y);
            if axes.length_squared() > 1e-4 {
                controller.rotate_towards(camera * Vec3::NEG_Z, self.config.turn_speed);
                LocomotionIntentState::Moving
            } else {
                LocomotionIntentState::Idle
            }
        } else {
            controller.set_movement_orientation(None);
            let world = camera * Vec3::new(axes.x, 0.0, -axes.y);
            let desired = (world.length_squared() > 1e-4).then_some(world);
            drive_intent(controller, rotation, desired, axes.length(), self.config.drive())
        };
        report.state = self.state;

        if input.jump_pressed {
            if ground.is_grounded() {
                report.jumped = controller.jump(ground);
            } else if self.wants_air_dive(controller, rotation, body) {
                report.dived = controller.dive_forward();
            }
        }

        report
    }

    /// Dive в воздухе только после прыжка и при явном движении вперёд
    fn wants_air_dive(&self, controller: &LocomotionController, rotation: Quat, body: &CharacterBody) -> bool {
        if !controller.jump_dive().has_jumped {
            return false;
        }
        if controller.intent().forward <= self.config.air_dive_forward_input {
            return false;
        }

        let facing = rotation * Vec3::NEG_Z;
        let facing = Vec3::new(facing.x, 0.0, facing.z).normalize_or_zero();
        body.horizontal_velocity().dot(facing) >= self.config.air_dive_min_forward_speed
    }

    /// Лежим достаточно долго и почти не двигаемся → встаём
    pub fn should_stop_ragdoll(
        &self,
        controller: &LocomotionController,
        manager: &RagdollTransitionManager,
        body: &CharacterBody,
    ) -> bool {
        controller.being_hit
            && manager
                .ragdoll_elapsed()
                .is_some_and(|elapsed| elapsed >= self.config.auto_stop_min_time)
            && body.speed() <= self.config.auto_stop_ragdoll_speed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{CharacterShape, CollisionLayer, ExternalForces};
    use crate::locomotion::PhysicsTickContext;
    use crate::physics::NoGeometry;
    use std::f32::consts::FRAC_PI_2;

    fn grounded() -> GroundContactTracker {
        let mut ground = GroundContactTracker::default();
        ground.report_contact(Vec3::Y, CollisionLayer::Ground, 0.0, None);
        ground
    }

    /// Один physics tick: защёлки прыжка/dive применяются здесь
    fn physics_tick(controller: &mut LocomotionController, ground: &GroundContactTracker) {
        let shape = CharacterShape::default();
        let ctx = PhysicsTickContext {
            dt: 1.0 / 60.0,
            gravity: Vec3::NEG_Y * 9.81,
            ground,
            shape: &shape,
            physics: &NoGeometry,
            entity: None,
        };
        controller.physics_tick(
            &mut CharacterBody::default(),
            &mut Transform::default(),
            &mut ExternalForces::default(),
            &ctx,
        );
    }

    fn forward(axes: Vec2) -> PlayerFrame {
        PlayerFrame {
            axes,
            ..default()
        }
    }

    #[test]
    fn test_forward_input_moves_when_facing() {
        let mut player = PlayerControl::default();
        let mut controller = LocomotionController::default();

        let report = player.apply(
            &forward(Vec2::Y),
            &mut controller,
            Quat::IDENTITY,
            &CharacterBody::default(),
            &grounded(),
        );

        assert_eq!(report.state, LocomotionIntentState::Moving);
        assert_eq!(controller.intent().forward, 1.0);
        assert_eq!(controller.intent().horizontal, 0.0);
        assert_eq!(controller.movement_orientation(), None);
    }

    #[test]
    fn test_camera_yaw_rotates_input() {
        let mut player = PlayerControl::default();
        let mut controller = LocomotionController::default();

        // Камера смотрит в -X, тело в -Z: "вперёд" = разворот на 90°
        let input = PlayerFrame {
            axes: Vec2::Y,
            camera_yaw: FRAC_PI_2,
            ..default()
        };
        let report = player.apply(
            &input,
            &mut controller,
            Quat::IDENTITY,
            &CharacterBody::default(),
            &grounded(),
        );

        assert_eq!(report.state, LocomotionIntentState::Turning);
        assert_eq!(controller.intent().forward, 0.0);

        // Тело уже смотрит в -X
        let report = player.apply(
            &input,
            &mut controller,
            Quat::from_rotation_y(FRAC_PI_2),
            &CharacterBody::default(),
            &grounded(),
        );
        assert_eq!(report.state, LocomotionIntentState::Moving);
    }

    #[test]
    fn test_strafe_mode_passes_raw_axes() {
        let mut player = PlayerControl::new(PlayerControlConfig::default().with_strafe(true));
        let mut controller = LocomotionController::default();
        let input = PlayerFrame {
            axes: Vec2::new(1.0, 0.0),
            camera_yaw: FRAC_PI_2,
            ..default()
        };

        player.apply(&input, &mut controller, Quat::IDENTITY, &CharacterBody::default(), &grounded());

        assert_eq!(controller.intent().horizontal, 1.0);
        assert_eq!(controller.intent().forward, 0.0);
        let orientation = controller.movement_orientation().unwrap();
        assert!((orientation * Vec3::NEG_Z).abs_diff_eq(Vec3::NEG_X, 1e-5));
    }

    #[test]
    fn test_diagonal_axes_are_clamped() {
        let mut player = PlayerControl::new(PlayerControlConfig::default().with_strafe(true));
        let mut controller = LocomotionController::default();

        player.apply(
            &forward(Vec2::new(1.0, 1.0)),
            &mut controller,
            Quat::IDENTITY,
            &CharacterBody::default(),
            &grounded(),
        );

        assert!((controller.intent().axes().length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_jump_press_when_grounded() {
        let mut player = PlayerControl::default();
        let mut controller = LocomotionController::default();
        let input = PlayerFrame {
            jump_pressed: true,
            ..default()
        };

        let report = player.apply(&input, &mut controller, Quat::IDENTITY, &CharacterBody::default(), &grounded());

        assert!(report.jumped);
        assert!(!report.dived);
        assert!(!controller.jump_dive().has_jumped, "до physics tick только защёлка");

        physics_tick(&mut controller, &grounded());
        assert!(controller.jump_dive().has_jumped);
    }

    #[test]
    fn test_air_dive_needs_jump_forward_input_and_speed() {
        let mut player = PlayerControl::default();
        let airborne = GroundContactTracker::default();
        let mut fast = CharacterBody::default();
        fast.linear_velocity = Vec3::new(0.0, 2.0, -3.0);
        let input = PlayerFrame {
            axes: Vec2::Y,
            jump_pressed: true,
            ..default()
        };

        // Не прыгали: dive запрещён
        let mut controller = LocomotionController::default();
        let report = player.apply(&input, &mut controller, Quat::IDENTITY, &fast, &airborne);
        assert!(!report.dived);

        // Прыгнули, но скорости вперёд нет
        let mut controller = LocomotionController::default();
        assert!(controller.jump(&grounded()));
        physics_tick(&mut controller, &grounded());
        let report = player.apply(&input, &mut controller, Quat::IDENTITY, &CharacterBody::default(), &airborne);
        assert!(!report.dived);

        // Прыгнули, но ввод не вперёд
        let idle_input = PlayerFrame {
            jump_pressed: true,
            ..default()
        };
        let report = player.apply(&idle_input, &mut controller, Quat::IDENTITY, &fast, &airborne);
        assert!(!report.dived);

        let report = player.apply(&input, &mut controller, Quat::IDENTITY, &fast, &airborne);
        assert!(report.dived);
        physics_tick(&mut controller, &airborne);
        assert!(!controller.jump_dive().can_dive);
    }

    #[test]
    fn test_dive_hold_requests_dive() {
        let mut player = PlayerControl::default();
        let mut controller = LocomotionController::default();
        let input = PlayerFrame {
            dive_held: true,
            ..default()
        };

        player.apply(&input, &mut controller, Quat::IDENTITY, &CharacterBody::default(), &grounded());
        assert!(controller.intent().dive_requested);

        player.apply(&PlayerFrame::default(), &mut controller, Quat::IDENTITY, &CharacterBody::default(), &grounded());
        assert!(!controller.intent().dive_requested);
    }

    #[test]
    fn test_incapacitated_ignores_input() {
        let mut player = PlayerControl::default();
        let mut controller = LocomotionController::default();
        controller.being_hit = true;
        let input = PlayerFrame {
            axes: Vec2::Y,
            jump_pressed: true,
            ..default()
        };

        let report = player.apply(&input, &mut controller, Quat::IDENTITY, &CharacterBody::default(), &grounded());

        assert_eq!(report, PlayerTick::default());
        assert!(controller.intent().is_zero());
    }

    #[test]
    fn test_auto_stop_ragdoll_after_min_time_when_slow() {
        let player = PlayerControl::default();
        let mut controller = LocomotionController::default();
        let mut manager = RagdollTransitionManager::default();
        let body = CharacterBody::default();

        assert!(!player.should_stop_ragdoll(&controller, &manager, &body), "не лежим");

        manager.enable_ragdoll(&mut controller, Vec3::ZERO, Vec3::X);
        assert!(!player.should_stop_ragdoll(&controller, &manager, &body), "только что упали");

        for _ in 0..30 {
            manager.tick(1.0 / 60.0, true, Quat::IDENTITY, &mut controller);
        }
        assert!(player.should_stop_ragdoll(&controller, &manager, &body));

        let mut sliding = body;
        sliding.linear_velocity = Vec3::new(3.0, 0.0, 0.0);
        assert!(!player.should_stop_ragdoll(&controller, &manager, &sliding));
    }
}
