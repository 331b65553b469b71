//! Ragdoll module
//!
//! Вход в ragdoll:
//! - `HitByOther` от ground tracker'а (сбил другой персонаж)
//! - `GettingHit` от окружения или хоста (бампер, маятник)
//!
//! Выход: settle → ожидание земли → выпрямление → `RagdollRecovered`.

use bevy::prelude::*;

pub mod manager;

pub use manager::{RagdollConfig, RagdollPhase, RagdollPose, RagdollTick, RagdollTransitionManager, RecoveryStage};

use crate::ground::{GroundContactTracker, HitByOther};
use crate::locomotion::{handle_landed, LocomotionController};
use crate::SimulationSet;

/// Внешний удар: перевести персонажа в ragdoll
#[derive(Event, Debug, Clone, Copy)]
pub struct GettingHit {
    pub entity: Entity,
    /// Мгновенный Δv (m/s)
    pub knockback: Vec3,
}

/// Персонаж упал (для AI, анимации, UI)
#[derive(Event, Debug, Clone, Copy)]
pub struct RagdollStarted {
    pub entity: Entity,
}

/// Персонаж поднялся и снова управляем
#[derive(Event, Debug, Clone, Copy)]
pub struct RagdollRecovered {
    pub entity: Entity,
}

/// Система: HitByOther / GettingHit → enable_ragdoll
pub fn start_ragdolls(
    mut hits: EventReader<HitByOther>,
    mut external_hits: EventReader<GettingHit>,
    positions: Query<&Transform>,
    mut query: Query<(&mut RagdollTransitionManager, &mut LocomotionController, &Transform)>,
    mut started_events: EventWriter<RagdollStarted>,
) {
    for hit in hits.read() {
        let other_position = positions.get(hit.other).map(|t| t.translation).ok();
        let Ok((mut manager, mut controller, transform)) = query.get_mut(hit.entity) else {
            continue;
        };

        // Падаем от удара: в сторону от ударившего
        let tip = other_position
            .map(|other| transform.translation - other)
            .unwrap_or(Vec3::ZERO);
        if !manager.enable_ragdoll(&mut controller, Vec3::ZERO, tip) {
            continue;
        }

        crate::log_info(&format!(
            "🤕 {:?} knocked down by {:?} ({:.1} m/s)",
            hit.entity, hit.other, hit.other_speed
        ));
        started_events.write(RagdollStarted { entity: hit.entity });
    }

    for hit in external_hits.read() {
        let Ok((mut manager, mut controller, _)) = query.get_mut(hit.entity) else {
            crate::log_warning(&format!("GettingHit: {:?} has no ragdoll", hit.entity));
            continue;
        };

        if !manager.enable_ragdoll(&mut controller, hit.knockback, hit.knockback) {
            continue;
        }

        crate::log_info(&format!("🤕 {:?} getting hit (Δv {:.1})", hit.entity, hit.knockback.length()));
        started_events.write(RagdollStarted { entity: hit.entity });
    }
}

/// Система: фазы ragdoll за physics tick
pub fn tick_ragdolls(
    time: Res<Time<Fixed>>,
    mut query: Query<(
        Entity,
        &mut RagdollTransitionManager,
        &mut LocomotionController,
        &GroundContactTracker,
        &Transform,
    )>,
    mut recovered_events: EventWriter<RagdollRecovered>,
) {
    let dt = time.delta_secs();
    if dt <= 0.0 {
        return;
    }

    for (entity, mut manager, mut controller, ground, transform) in query.iter_mut() {
        if manager.phase() == RagdollPhase::Controlled {
            continue;
        }

        let report = manager.tick(dt, ground.is_grounded(), transform.rotation, &mut controller);

        if report.recovery_started {
            crate::log(&format!("🧍 {:?} getting up", entity));
        }
        if report.upright_started && !ground.is_grounded() {
            crate::log_warning(&format!("{:?} recovery timeout: uprighting without ground", entity));
        }
        if report.recovered {
            crate::log(&format!("✅ {:?} recovered", entity));
            recovered_events.write(RagdollRecovered { entity });
        }
    }
}

/// Ragdoll Plugin
pub struct RagdollPlugin;

impl Plugin for RagdollPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<GettingHit>()
            .add_event::<RagdollStarted>()
            .add_event::<RagdollRecovered>()
            .register_type::<RagdollTransitionManager>();

        app.add_systems(FixedUpdate, tick_ragdolls.in_set(SimulationSet::Ragdoll))
            .add_systems(
                FixedUpdate,
                // Оба пишут LocomotionController: порядок фиксирован
                start_ragdolls.in_set(SimulationSet::Reactions).after(handle_landed),
            );
    }
}
