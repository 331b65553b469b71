//! Player module
//!
//! Хост (окно, геймпад, тач-джойстик) шлёт `PlayerInputEvent` раз за frame,
//! ECS переводит его в вызовы LocomotionController.
//!
//! # Архитектура
//! - Player и боты делят один controller и одну Idle/Turning/Moving логику
//! - Player НЕ трогает CharacterBody напрямую: только intent и запросы

use bevy::prelude::*;

pub mod control;

pub use control::{PlayerControl, PlayerControlConfig, PlayerFrame, PlayerTick};

use crate::components::CharacterBody;
use crate::ground::GroundContactTracker;
use crate::locomotion::LocomotionController;
use crate::ragdoll::{tick_ragdolls, RagdollTransitionManager};
use crate::SimulationSet;

/// Player input event (от хоста, каждый frame с вводом)
#[derive(Event, Debug, Clone, Copy, Default)]
pub struct PlayerInputEvent {
    pub frame: PlayerFrame,
}

/// Система: PlayerInputEvent → controller единственного игрока
pub fn process_player_input(
    mut input_events: EventReader<PlayerInputEvent>,
    mut player_query: Query<(
        Entity,
        &mut PlayerControl,
        &mut LocomotionController,
        &Transform,
        &CharacterBody,
        &GroundContactTracker,
    )>,
) {
    // Guard: нет player entity
    let Ok((entity, mut player, mut controller, transform, body, ground)) = player_query.single_mut() else {
        input_events.clear();
        return;
    };

    for input in input_events.read() {
        let report = player.apply(&input.frame, &mut controller, transform.rotation, body, ground);

        if report.jumped {
            crate::log(&format!("🦘 {:?} player jump", entity));
        }
        if report.dived {
            crate::log(&format!("🏊 {:?} player air dive", entity));
        }
    }
}

/// Система: игрок встаёт сам, как только тело почти остановилось
pub fn auto_stop_player_ragdoll(
    mut query: Query<(
        Entity,
        &PlayerControl,
        &mut RagdollTransitionManager,
        &mut LocomotionController,
        &CharacterBody,
    )>,
) {
    for (entity, player, mut manager, mut controller, body) in query.iter_mut() {
        if !player.should_stop_ragdoll(&controller, &manager, body) {
            continue;
        }
        if manager.stop_ragdoll(&mut controller) {
            crate::log(&format!("🧍 {:?} player getting up early", entity));
        }
    }
}

/// Player Plugin
pub struct PlayerPlugin;

impl Plugin for PlayerPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<PlayerInputEvent>();

        app.add_systems(Update, process_player_input.in_set(SimulationSet::Decide))
            .add_systems(
                FixedUpdate,
                auto_stop_player_ragdoll
                    .in_set(SimulationSet::Ragdoll)
                    .before(tick_ragdolls),
            );
    }
}
