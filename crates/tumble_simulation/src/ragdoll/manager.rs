//! RagdollTransitionManager: фазы ragdoll и подъёма
//!
//! ```text
//! Controlled ──enable──► Ragdolling ──settle / stop──► Recovering::WaitGround
//!     ▲                                                      │ grounded | timeout
//!     └──────────────── Recovering::Uprighting ◄─────────────┘
//! ```
//!
//! Тело менеджер не трогает: все правки идут `BodyCommand` в controller.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::components::Countdown;
use crate::config::{check_range, ConfigError};
use crate::locomotion::{yaw_only, BodyCommand, LocomotionController};

#[derive(Debug, Clone, Copy, PartialEq, Reflect, Serialize, Deserialize)]
#[serde(default)]
pub struct RagdollConfig {
    /// Сколько лежим до начала подъёма
    pub settle_time: f32,
    /// Максимум ожидания земли перед подъёмом
    pub ground_wait_timeout: f32,
    /// Длительность выпрямления
    pub upright_duration: f32,
    /// Подъём корпуса за выпрямление (м)
    pub upright_lift: f32,
    /// Угловой пинок при ударе (rad/s)
    pub knockdown_spin: f32,
}

impl Default for RagdollConfig {
    fn default() -> Self {
        Self {
            settle_time: 2.0,
            ground_wait_timeout: 2.0,
            upright_duration: 0.25,
            upright_lift: 0.15,
            knockdown_spin: 4.0,
        }
    }
}

impl RagdollConfig {
    pub fn with_settle_time(mut self, seconds: f32) -> Self {
        self.settle_time = seconds;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("settle_time", self.settle_time, 0.0, 30.0)?;
        check_range("ground_wait_timeout", self.ground_wait_timeout, 0.0, 30.0)?;
        check_range("upright_duration", self.upright_duration, 0.01, 5.0)?;
        check_range("upright_lift", self.upright_lift, 0.0, 2.0)
    }
}

/// Флаги позы для хоста (аниматор, коллайдеры конечностей)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub struct RagdollPose {
    pub animation_driven: bool,
    pub rotation_locked: bool,
    /// Коллайдеры конечностей (ragdoll)
    pub hit_colliders: bool,
    /// Основная капсула
    pub primary_colliders: bool,
}

impl RagdollPose {
    pub const CONTROLLED: Self = Self {
        animation_driven: true,
        rotation_locked: true,
        hit_colliders: false,
        primary_colliders: true,
    };

    pub const LIMP: Self = Self {
        animation_driven: false,
        rotation_locked: false,
        hit_colliders: true,
        primary_colliders: false,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub enum RecoveryStage {
    WaitGround { waited: f32 },
    Uprighting { elapsed: f32, from: Quat, to: Quat },
}

#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub enum RagdollPhase {
    Controlled,
    Ragdolling { settle: Countdown },
    Recovering(RecoveryStage),
}

/// Переходы за тик
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RagdollTick {
    pub recovery_started: bool,
    pub upright_started: bool,
    pub recovered: bool,
}

#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
pub struct RagdollTransitionManager {
    pub config: RagdollConfig,
    phase: RagdollPhase,
    pose: RagdollPose,
}

impl Default for RagdollTransitionManager {
    fn default() -> Self {
        Self::new(RagdollConfig::default())
    }
}

impl RagdollTransitionManager {
    pub fn new(config: RagdollConfig) -> Self {
        Self {
            config,
            phase: RagdollPhase::Controlled,
            pose: RagdollPose::CONTROLLED,
        }
    }

    pub fn phase(&self) -> RagdollPhase {
        self.phase
    }

    pub fn pose(&self) -> RagdollPose {
        self.pose
    }

    pub fn is_ragdolling(&self) -> bool {
        matches!(self.phase, RagdollPhase::Ragdolling { .. })
    }

    pub fn is_recovering(&self) -> bool {
        matches!(self.phase, RagdollPhase::Recovering(_))
    }

    /// Сколько секунд лежим (None вне Ragdolling)
    pub fn ragdoll_elapsed(&self) -> Option<f32> {
        match self.phase {
            RagdollPhase::Ragdolling { settle } => settle
                .remaining()
                .map(|remaining| (self.config.settle_time - remaining).max(0.0)),
            _ => None,
        }
    }

    /// Переход в ragdoll. Уже лежим: no-op, во время подъёма: рестарт.
    ///
    /// `knockback`: мгновенный Δv удара (ноль, если его уже дала физика контакта).
    pub fn enable_ragdoll(
        &mut self,
        controller: &mut LocomotionController,
        knockback: Vec3,
        tip_direction: Vec3,
    ) -> bool {
        if self.is_ragdolling() {
            return false;
        }

        self.phase = RagdollPhase::Ragdolling {
            settle: Countdown::started(self.config.settle_time),
        };
        self.pose = RagdollPose::LIMP;

        controller.being_hit = true;
        controller.getting_up = false;
        controller.can_move = false;

        let tip = Vec3::new(tip_direction.x, 0.0, tip_direction.z).normalize_or_zero();
        controller.queue_body_command(BodyCommand {
            rotation_locked: Some(false),
            velocity_change: knockback,
            angular_kick: Vec3::Y.cross(tip) * self.config.knockdown_spin,
            ..default()
        });
        true
    }

    /// Досрочный подъём (только из Ragdolling)
    pub fn stop_ragdoll(&mut self, controller: &mut LocomotionController) -> bool {
        if !self.is_ragdolling() {
            return false;
        }
        self.begin_recovery(controller);
        true
    }

    /// Ragdoll выключается сразу: поза Controlled, вращение заблокировано.
    /// Дальше только ожидание земли и выпрямление.
    fn begin_recovery(&mut self, controller: &mut LocomotionController) {
        self.phase = RagdollPhase::Recovering(RecoveryStage::WaitGround { waited: 0.0 });
        self.pose = RagdollPose::CONTROLLED;
        controller.getting_up = true;
        controller.can_move = false;
        controller.queue_body_command(BodyCommand {
            stop_momentum: true,
            rotation_locked: Some(true),
            ..default()
        });
    }

    /// Продвигает фазы. `rotation`: текущий поворот тела.
    pub fn tick(
        &mut self,
        dt: f32,
        grounded: bool,
        rotation: Quat,
        controller: &mut LocomotionController,
    ) -> RagdollTick {
        let mut report = RagdollTick::default();

        match self.phase {
            RagdollPhase::Controlled => {}

            RagdollPhase::Ragdolling { mut settle } => {
                if settle.tick(dt) {
                    self.begin_recovery(controller);
                    report.recovery_started = true;
                } else {
                    self.phase = RagdollPhase::Ragdolling { settle };
                }
            }

            RagdollPhase::Recovering(RecoveryStage::WaitGround { waited }) => {
                let waited = waited + dt;
                if grounded || waited >= self.config.ground_wait_timeout - 1e-4 {
                    self.phase = RagdollPhase::Recovering(RecoveryStage::Uprighting {
                        elapsed: 0.0,
                        from: rotation,
                        to: yaw_only(rotation),
                    });
                    controller.queue_body_command(BodyCommand {
                        stop_momentum: true,
                        ..default()
                    });
                    report.upright_started = true;
                } else {
                    self.phase = RagdollPhase::Recovering(RecoveryStage::WaitGround { waited });
                }
            }

            RagdollPhase::Recovering(RecoveryStage::Uprighting { elapsed, from, to }) => {
                let duration = self.config.upright_duration;
                let before = (elapsed / duration).min(1.0);
                let elapsed = elapsed + dt;
                let progress = (elapsed / duration).min(1.0);

                controller.queue_body_command(BodyCommand {
                    set_rotation: Some(from.slerp(to, progress).normalize()),
                    translate: Vec3::Y * self.config.upright_lift * (progress - before),
                    ..default()
                });

                if progress >= 1.0 - 1e-4 {
                    self.phase = RagdollPhase::Controlled;
                    controller.restore_after_recovery();
                    report.recovered = true;
                } else {
                    self.phase = RagdollPhase::Recovering(RecoveryStage::Uprighting { elapsed, from, to });
                }
            }
        }

        report
    }

    /// Сброс в Controlled (respawn)
    pub fn reset(&mut self) {
        self.phase = RagdollPhase::Controlled;
        self.pose = RagdollPose::CONTROLLED;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn tilted() -> Quat {
        Quat::from_rotation_y(1.0) * Quat::from_rotation_x(1.2)
    }

    fn knock_down(manager: &mut RagdollTransitionManager, controller: &mut LocomotionController) -> bool {
        manager.enable_ragdoll(controller, Vec3::ZERO, Vec3::X)
    }

    #[test]
    fn test_enable_incapacitates() {
        let mut manager = RagdollTransitionManager::default();
        let mut controller = LocomotionController::default();

        assert!(knock_down(&mut manager, &mut controller));

        assert!(manager.is_ragdolling());
        assert_eq!(manager.pose(), RagdollPose::LIMP);
        assert!(controller.being_hit);
        assert!(!controller.can_move);
    }

    #[test]
    fn test_enable_is_idempotent_while_down() {
        let mut manager = RagdollTransitionManager::default();
        let mut controller = LocomotionController::default();
        knock_down(&mut manager, &mut controller);

        for _ in 0..60 {
            manager.tick(DT, true, tilted(), &mut controller);
        }
        assert!(!knock_down(&mut manager, &mut controller), "повторный удар не сбрасывает settle");

        // Осталась 1 с из 2
        let mut recovery_tick = None;
        for tick in 1..=120 {
            if manager.tick(DT, true, tilted(), &mut controller).recovery_started {
                recovery_tick = Some(tick);
                break;
            }
        }
        assert_eq!(recovery_tick, Some(60));
    }

    #[test]
    fn test_settle_then_recover_on_ground() {
        let mut manager = RagdollTransitionManager::default();
        let mut controller = LocomotionController::default();
        knock_down(&mut manager, &mut controller);

        let mut recovery_tick = None;
        for tick in 1..=200 {
            let report = manager.tick(DT, true, tilted(), &mut controller);
            if report.recovery_started {
                recovery_tick = Some(tick);
                break;
            }
        }
        assert_eq!(recovery_tick, Some(120), "settle 2 с");
        assert!(controller.getting_up);

        // На земле выпрямление начинается сразу
        assert!(manager.tick(DT, true, tilted(), &mut controller).upright_started);
        assert_eq!(manager.pose(), RagdollPose::CONTROLLED);

        // 0.25 с выпрямления = 15 тиков
        let mut recovered_tick = None;
        for tick in 1..=30 {
            if manager.tick(DT, true, tilted(), &mut controller).recovered {
                recovered_tick = Some(tick);
                break;
            }
        }
        assert_eq!(recovered_tick, Some(15));
        assert_eq!(manager.phase(), RagdollPhase::Controlled);
        assert!(controller.can_move);
        assert!(!controller.being_hit);
        assert!(!controller.getting_up);
    }

    #[test]
    fn test_airborne_recovery_waits_for_timeout() {
        let mut manager = RagdollTransitionManager::default();
        let mut controller = LocomotionController::default();
        knock_down(&mut manager, &mut controller);
        manager.stop_ragdoll(&mut controller);

        let mut upright_tick = None;
        for tick in 1..=200 {
            if manager.tick(DT, false, tilted(), &mut controller).upright_started {
                upright_tick = Some(tick);
                break;
            }
        }
        assert_eq!(upright_tick, Some(120), "ждём землю не дольше 2 с");
    }

    #[test]
    fn test_pose_restored_when_recovery_starts_in_air() {
        let mut manager = RagdollTransitionManager::default();
        let mut controller = LocomotionController::default();
        knock_down(&mut manager, &mut controller);

        let mut recovery_tick = None;
        for tick in 1..=200 {
            let report = manager.tick(DT, false, tilted(), &mut controller);
            if report.recovery_started {
                recovery_tick = Some(tick);
                break;
            }
            assert_eq!(manager.pose(), RagdollPose::LIMP);
        }
        assert_eq!(recovery_tick, Some(120));

        // Ещё в воздухе, но ragdoll уже выключен
        assert!(matches!(
            manager.phase(),
            RagdollPhase::Recovering(RecoveryStage::WaitGround { .. })
        ));
        assert_eq!(manager.pose(), RagdollPose::CONTROLLED);

        let command = controller.pending_body_command().unwrap();
        assert_eq!(command.rotation_locked, Some(true), "вращение заблокировано до касания земли");
        assert!(command.stop_momentum);

        // Пока ждём землю, поза не меняется
        for _ in 0..30 {
            assert!(!manager.tick(DT, false, tilted(), &mut controller).upright_started);
            assert_eq!(manager.pose(), RagdollPose::CONTROLLED);
        }
    }

    #[test]
    fn test_stop_ragdoll_only_from_ragdolling() {
        let mut manager = RagdollTransitionManager::default();
        let mut controller = LocomotionController::default();

        assert!(!manager.stop_ragdoll(&mut controller));

        knock_down(&mut manager, &mut controller);
        assert!(manager.stop_ragdoll(&mut controller));
        assert!(manager.is_recovering());
        assert!(!manager.stop_ragdoll(&mut controller));
    }

    #[test]
    fn test_enable_during_recovery_restarts() {
        let mut manager = RagdollTransitionManager::default();
        let mut controller = LocomotionController::default();
        knock_down(&mut manager, &mut controller);
        manager.stop_ragdoll(&mut controller);
        manager.tick(DT, true, tilted(), &mut controller);

        assert!(knock_down(&mut manager, &mut controller));
        assert!(manager.is_ragdolling());
        assert!(!controller.getting_up);

        // Полный settle заново
        for _ in 0..119 {
            assert!(!manager.tick(DT, true, tilted(), &mut controller).recovery_started);
        }
        assert!(manager.tick(DT, true, tilted(), &mut controller).recovery_started);
    }

    #[test]
    fn test_upright_keeps_yaw() {
        let mut manager = RagdollTransitionManager::default();
        let mut controller = LocomotionController::default();
        knock_down(&mut manager, &mut controller);
        manager.stop_ragdoll(&mut controller);
        manager.tick(DT, true, tilted(), &mut controller);

        match manager.phase() {
            RagdollPhase::Recovering(RecoveryStage::Uprighting { to, .. }) => {
                let up = to * Vec3::Y;
                assert!((up - Vec3::Y).length() < 1e-4, "выпрямлен");
                let (yaw, _, _) = to.to_euler(EulerRot::YXZ);
                let (expected, _, _) = tilted().to_euler(EulerRot::YXZ);
                assert!((yaw - expected).abs() < 1e-4);
            }
            other => panic!("ожидали Uprighting, получили {:?}", other),
        }
    }
}
