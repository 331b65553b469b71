//! Step-up assist: три горизонтальных луча в направлении движения
//!
//! ```text
//!   head2 ──────►   (step_height + 0.5)   должен быть свободен
//!   head1 ──────►   (step_height + 0.1)   должен быть свободен
//!   feet  ───►|     (+0.05)               упирается в ступень
//! ```

use bevy::prelude::*;

use super::config::LocomotionConfig;
use crate::physics::PhysicsQuery;

/// Высота луча ступней над подошвой
const FEET_RAY_LIFT: f32 = 0.05;

/// Ступень перед персонажем, на которую можно подняться?
///
/// Дистанции лучей считаются от оси капсулы: `radius + check_distance`.
pub fn should_step_up(
    physics: &dyn PhysicsQuery,
    feet: Vec3,
    direction: Vec3,
    radius: f32,
    config: &LocomotionConfig,
    exclude: Option<Entity>,
) -> bool {
    let direction = Vec3::new(direction.x, 0.0, direction.z).normalize_or_zero();
    if direction == Vec3::ZERO {
        return false;
    }

    let feet_origin = feet + Vec3::Y * FEET_RAY_LIFT;
    if !physics.ray_blocked(feet_origin, direction, radius + config.step_check_distance, exclude) {
        return false;
    }

    let head1 = feet + Vec3::Y * (config.step_height + 0.1);
    let head2 = feet + Vec3::Y * (config.step_height + 0.5);

    !physics.ray_blocked(head1, direction, radius + config.step_check_distance_head1, exclude)
        && !physics.ray_blocked(head2, direction, radius + config.step_check_distance_head2, exclude)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{CourseGeometry, CourseSolid};

    fn course_with_block(height: f32) -> CourseGeometry {
        // Блок шириной 2 м перед персонажем (-Z), ближняя грань на z = -0.5
        CourseGeometry::flat_ground(20.0).with_solid(CourseSolid::cuboid(
            Vec3::new(0.0, height * 0.5, -1.5),
            Vec3::new(1.0, height * 0.5, 1.0),
        ))
    }

    #[test]
    fn test_low_step_is_climbable() {
        let course = course_with_block(0.3);
        let config = LocomotionConfig::default();

        assert!(should_step_up(&course, Vec3::ZERO, Vec3::NEG_Z, 0.35, &config, None));
    }

    #[test]
    fn test_wall_is_not_a_step() {
        let course = course_with_block(2.0);
        let config = LocomotionConfig::default();

        assert!(!should_step_up(&course, Vec3::ZERO, Vec3::NEG_Z, 0.35, &config, None));
    }

    #[test]
    fn test_nothing_ahead() {
        let course = course_with_block(0.3);
        let config = LocomotionConfig::default();

        assert!(!should_step_up(&course, Vec3::ZERO, Vec3::Z, 0.35, &config, None));
        assert!(!should_step_up(&course, Vec3::ZERO, Vec3::ZERO, 0.35, &config, None));
    }
}
