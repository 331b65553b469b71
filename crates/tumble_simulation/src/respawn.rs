//! Respawn: телепорт + полный сброс состояния персонажа
//!
//! Хост (чекпоинты, падение за трассу) шлёт `CharacterReset`, дальше
//! персонаж стоит как только что заспавненный: без скорости, не grounded,
//! прыжок/dive взведены, ragdoll выключен, бот выбирает цель заново.

use bevy::prelude::*;

use crate::ai::BotDecisionAgent;
use crate::components::{CharacterBody, ExternalForces};
use crate::ground::{ContactBuffer, GroundContactTracker};
use crate::hazards::move_platforms;
use crate::locomotion::{yaw_only, LocomotionController};
use crate::ragdoll::RagdollTransitionManager;
use crate::SimulationSet;

#[derive(Event, Debug, Clone, Copy)]
pub struct CharacterReset {
    pub entity: Entity,
    /// Новый центр капсулы
    pub position: Vec3,
    /// Только yaw учитывается
    pub rotation: Quat,
}

/// Система: CharacterReset → сброс всех подсистем персонажа
pub fn reset_characters(
    mut reset_events: EventReader<CharacterReset>,
    mut query: Query<(
        &mut Transform,
        &mut CharacterBody,
        &mut GroundContactTracker,
        &mut LocomotionController,
        &mut ExternalForces,
        &mut ContactBuffer,
        Option<&mut RagdollTransitionManager>,
        Option<&mut BotDecisionAgent>,
    )>,
) {
    for event in reset_events.read() {
        let Ok((mut transform, mut body, mut ground, mut controller, mut external, mut buffer, ragdoll, agent)) =
            query.get_mut(event.entity)
        else {
            crate::log_warning(&format!("CharacterReset: {:?} is not a character", event.entity));
            continue;
        };

        transform.translation = event.position;
        transform.rotation = yaw_only(event.rotation);

        body.stop();
        body.pending_translation = Vec3::ZERO;
        body.rotation_locked = true;

        ground.reset();
        controller.reset();
        external.pushes.clear();
        buffer.clear();

        if let Some(mut ragdoll) = ragdoll {
            ragdoll.reset();
        }
        if let Some(mut agent) = agent {
            agent.reset();
        }

        crate::log_info(&format!("♻️ {:?} respawned at {:.2}", event.entity, event.position));
    }
}

/// Respawn Plugin
pub struct RespawnPlugin;

impl Plugin for RespawnPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<CharacterReset>();

        app.add_systems(
            FixedUpdate,
            reset_characters
                .in_set(SimulationSet::Environment)
                .before(move_platforms),
        );
    }
}
