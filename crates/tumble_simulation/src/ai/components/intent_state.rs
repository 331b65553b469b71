//! Locomotion intent sub-state: Idle / Turning / Moving
//!
//! Общий контракт бота и player adapter'а: персонаж сначала разворачивается
//! на месте и только потом идёт вперёд.

use bevy::prelude::*;

use crate::locomotion::LocomotionController;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Reflect)]
pub enum LocomotionIntentState {
    /// Нет направления: нулевой ввод
    #[default]
    Idle,
    /// Угол до цели больше порога: поворот без движения
    Turning,
    /// Поворот + forward intent
    Moving,
}

impl LocomotionIntentState {
    /// Классификация по направлению взгляда и желаемому направлению
    pub fn classify(facing: Vec3, desired: Option<Vec3>, start_angle_deg: f32) -> Self {
        let Some(desired) = desired.and_then(flat_direction) else {
            return Self::Idle;
        };
        let Some(facing) = flat_direction(facing) else {
            return Self::Turning;
        };

        if facing.angle_between(desired).to_degrees() > start_angle_deg {
            Self::Turning
        } else {
            Self::Moving
        }
    }
}

fn flat_direction(direction: Vec3) -> Option<Vec3> {
    let flat = Vec3::new(direction.x, 0.0, direction.z);
    (flat.length_squared() > 1e-6).then(|| flat.normalize())
}

/// Параметры поворота/старта
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntentDrive {
    pub turn_speed: f32,
    pub move_start_angle_deg: f32,
}

/// Frame tick: состояние → вызовы controller'а
///
/// `strength`: forward intent в Moving (0 = стоять у края, повернувшись к цели).
pub fn drive_intent(
    controller: &mut LocomotionController,
    rotation: Quat,
    desired: Option<Vec3>,
    strength: f32,
    drive: IntentDrive,
) -> LocomotionIntentState {
    let facing = rotation * Vec3::NEG_Z;
    let state = LocomotionIntentState::classify(facing, desired, drive.move_start_angle_deg);

    match (state, desired) {
        (LocomotionIntentState::Idle, _) | (_, None) => {
            controller.set_input(0.0, 0.0);
        }
        (LocomotionIntentState::Turning, Some(direction)) => {
            controller.rotate_towards(direction, drive.turn_speed);
            controller.set_input(0.0, 0.0);
        }
        (LocomotionIntentState::Moving, Some(direction)) => {
            controller.rotate_towards(direction, drive.turn_speed);
            controller.set_input(0.0, strength);
        }
    }

    state
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        let facing = Vec3::NEG_Z;

        assert_eq!(LocomotionIntentState::classify(facing, None, 15.0), LocomotionIntentState::Idle);
        assert_eq!(
            LocomotionIntentState::classify(facing, Some(Vec3::Y), 15.0),
            LocomotionIntentState::Idle,
            "вертикаль: не направление"
        );
        assert_eq!(
            LocomotionIntentState::classify(facing, Some(Vec3::X), 15.0),
            LocomotionIntentState::Turning
        );
        let ten_degrees = Quat::from_rotation_y(10f32.to_radians()) * Vec3::NEG_Z;
        assert_eq!(
            LocomotionIntentState::classify(facing, Some(ten_degrees), 15.0),
            LocomotionIntentState::Moving
        );
    }

    #[test]
    fn test_turning_sends_zero_forward() {
        let mut controller = LocomotionController::default();
        let drive = IntentDrive {
            turn_speed: 20.0,
            move_start_angle_deg: 15.0,
        };

        let state = drive_intent(&mut controller, Quat::IDENTITY, Some(Vec3::X), 1.0, drive);
        assert_eq!(state, LocomotionIntentState::Turning);
        assert_eq!(controller.intent().forward, 0.0);

        let state = drive_intent(&mut controller, Quat::IDENTITY, Some(Vec3::NEG_Z), 0.7, drive);
        assert_eq!(state, LocomotionIntentState::Moving);
        assert_eq!(controller.intent().forward, 0.7);
    }
}
