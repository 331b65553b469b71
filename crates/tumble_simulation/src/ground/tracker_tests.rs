//! Tests for GroundContactTracker.

#[cfg(test)]
mod tests {
    use bevy::prelude::*;

    use crate::components::CollisionLayer;
    use crate::ground::{ContactOutcome, GroundConfig, GroundContactTracker};

    fn floor_contact(tracker: &mut GroundContactTracker, vy: f32) -> ContactOutcome {
        tracker.report_contact(Vec3::Y, CollisionLayer::Ground, vy, None)
    }

    #[test]
    fn test_floor_angle_threshold() {
        let tracker = GroundContactTracker::default();

        let slope_30 = Quat::from_rotation_x(30f32.to_radians()) * Vec3::Y;
        let slope_40 = Quat::from_rotation_x(40f32.to_radians()) * Vec3::Y;

        assert!(tracker.is_floor(Vec3::Y));
        assert!(tracker.is_floor(slope_30));
        assert!(!tracker.is_floor(slope_40), "40° круче порога 35°");
        assert!(!tracker.is_floor(Vec3::X), "стена");
        assert!(!tracker.is_floor(Vec3::ZERO));
    }

    #[test]
    fn test_landed_fires_once_per_touchdown() {
        let mut tracker = GroundContactTracker::default();

        assert_eq!(floor_contact(&mut tracker, -3.0), ContactOutcome::Landed);
        tracker.end_tick();

        // Следующие тики на земле: уже не landing
        for _ in 0..10 {
            assert_eq!(floor_contact(&mut tracker, 0.0), ContactOutcome::Floor);
            tracker.end_tick();
        }
        assert!(tracker.is_grounded());
    }

    #[test]
    fn test_rising_contact_grounds_without_landing() {
        let mut tracker = GroundContactTracker::default();

        // Скользящий контакт на подъёме (vy > 0.5)
        assert_eq!(floor_contact(&mut tracker, 2.0), ContactOutcome::TouchedRising);
        assert!(tracker.is_grounded());

        // Landed на этом касании так и не приходит
        tracker.end_tick();
        assert_eq!(floor_contact(&mut tracker, 0.0), ContactOutcome::Floor);
    }

    #[test]
    fn test_landing_threshold_is_inclusive() {
        let mut tracker = GroundContactTracker::default();
        assert_eq!(floor_contact(&mut tracker, 0.5), ContactOutcome::Landed);
    }

    #[test]
    fn test_grounded_survives_hysteresis_window() {
        let config = GroundConfig::default();
        let mut tracker = GroundContactTracker::new(config);

        floor_contact(&mut tracker, 0.0);
        tracker.end_tick();

        // N-1 тиков без контактов: всё ещё grounded
        for tick in 1..config.unground_delay_ticks {
            assert!(!tracker.end_tick(), "рано снялся на тике {}", tick);
            assert!(tracker.is_grounded());
        }

        // N-й тик снимает
        assert!(tracker.end_tick());
        assert!(!tracker.is_grounded());
    }

    #[test]
    fn test_new_contact_cancels_pending_unground() {
        let mut tracker = GroundContactTracker::default();

        floor_contact(&mut tracker, 0.0);
        tracker.end_tick();

        // Два тика без контакта (таймер запущен)
        tracker.end_tick();
        tracker.end_tick();
        assert!(tracker.unground_pending());

        // Контакт на шве ступени: таймер отменён
        floor_contact(&mut tracker, 0.0);
        assert!(!tracker.unground_pending());
        tracker.end_tick();

        // Снова полный цикл N тиков
        assert!(!tracker.end_tick());
        assert!(!tracker.end_tick());
        assert!(tracker.is_grounded());
        assert!(tracker.end_tick());
    }

    #[test]
    fn test_walls_and_characters_do_not_ground() {
        let mut tracker = GroundContactTracker::default();

        assert_eq!(
            tracker.report_contact(Vec3::X, CollisionLayer::Ground, 0.0, None),
            ContactOutcome::Ignored
        );
        assert_eq!(
            tracker.report_contact(Vec3::Y, CollisionLayer::Character, 0.0, None),
            ContactOutcome::Ignored
        );
        assert_eq!(
            tracker.report_contact(Vec3::Y, CollisionLayer::Trigger, 0.0, None),
            ContactOutcome::Ignored
        );
        assert!(!tracker.is_grounded());
    }

    #[test]
    fn test_floor_normal_tracks_last_contact() {
        let mut tracker = GroundContactTracker::default();
        let slope = (Quat::from_rotation_z(20f32.to_radians()) * Vec3::Y).normalize();

        tracker.report_contact(slope, CollisionLayer::Ground, 0.0, None);
        assert!((tracker.floor_normal() - slope).length() < 1e-5);
    }

    #[test]
    fn test_impact_threshold() {
        let tracker = GroundContactTracker::default();

        assert!(tracker.report_impact(7.0, true));
        assert!(tracker.report_impact(12.0, true));
        assert!(!tracker.report_impact(6.9, true));
        assert!(!tracker.report_impact(20.0, false), "не персонаж: не сбивает");
    }

    #[test]
    fn test_reset_goes_airborne() {
        let mut tracker = GroundContactTracker::default();
        floor_contact(&mut tracker, 0.0);

        tracker.reset();
        assert!(!tracker.is_grounded());
        assert_eq!(tracker.floor_normal(), Vec3::Y);
        assert_eq!(floor_contact(&mut tracker, 0.0), ContactOutcome::Landed);
    }
}
