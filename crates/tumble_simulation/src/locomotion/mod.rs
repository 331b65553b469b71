//! Locomotion module
//!
//! Физическое движение гуманоида: силы ввода, торможение, склоны,
//! прыжок, dive, step-up.
//!
//! Системы:
//! - `apply_locomotion::<B>` (SimulationSet::Locomotion): physics tick каждого controller'а
//! - `handle_landed` (SimulationSet::Reactions): сброс прыжка, перевзвод dive

use bevy::ecs::system::StaticSystemParam;
use bevy::prelude::*;
use std::marker::PhantomData;

pub mod config;
pub mod controller;
pub mod jump_dive;
pub mod step_assist;


pub use config::LocomotionConfig;
pub use controller::{
    facing_rotation, yaw_only, BodyCommand, LocomotionController, LocomotionTick, PhysicsTickContext,
};
pub use jump_dive::{JumpDiveState, JumpDiveTimers};
pub use step_assist::should_step_up;

use crate::components::{CharacterBody, CharacterShape, ExternalForces};
use crate::config::SimulationSettings;
use crate::ground::{GroundContactTracker, Landed};
use crate::physics::{HeadlessBackend, PhysicsQueryBackend};
use crate::SimulationSet;

/// Система: physics tick всех controller'ов
pub fn apply_locomotion<B: PhysicsQueryBackend>(
    backend: StaticSystemParam<B::Param>,
    settings: Res<SimulationSettings>,
    time: Res<Time<Fixed>>,
    mut query: Query<(
        Entity,
        &mut LocomotionController,
        &mut CharacterBody,
        &mut Transform,
        &mut ExternalForces,
        &GroundContactTracker,
        &CharacterShape,
    )>,
) {
    let dt = time.delta_secs();
    if dt <= 0.0 {
        return;
    }

    B::with_query(&backend, |physics| {
        for (entity, mut controller, mut body, mut transform, mut external, ground, shape) in query.iter_mut() {
            let ctx = PhysicsTickContext {
                dt,
                gravity: settings.gravity,
                ground,
                shape,
                physics,
                entity: Some(entity),
            };

            let report = controller.physics_tick(&mut body, &mut transform, &mut external, &ctx);

            if report.jumped {
                crate::log(&format!("🦘 {:?} jump (v {:.2})", entity, body.linear_velocity));
            }
            if report.dived {
                crate::log(&format!("🏊 {:?} dive (v {:.2})", entity, body.linear_velocity));
            }
            if report.dive_rearmed {
                crate::log(&format!("🔄 {:?} dive re-armed", entity));
            }
        }
    });
}

/// Система: Landed → has_jumped сброшен, dive перевзведён (через settle)
pub fn handle_landed(
    mut landed_events: EventReader<Landed>,
    mut query: Query<(&mut LocomotionController, &CharacterBody)>,
) {
    for event in landed_events.read() {
        let Ok((mut controller, body)) = query.get_mut(event.entity) else {
            continue;
        };

        if controller.on_landed(body.speed()) {
            crate::log(&format!("🔄 {:?} dive re-armed on landing", event.entity));
        }
    }
}

/// Locomotion Plugin
///
/// Generic по backend'у: лучи склона и step-up идут через `B::with_query`.
pub struct LocomotionPlugin<B: PhysicsQueryBackend = HeadlessBackend>(PhantomData<B>);

impl<B: PhysicsQueryBackend> Default for LocomotionPlugin<B> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<B: PhysicsQueryBackend> Plugin for LocomotionPlugin<B> {
    fn build(&self, app: &mut App) {
        app.register_type::<LocomotionController>();

        app.add_systems(FixedUpdate, apply_locomotion::<B>.in_set(SimulationSet::Locomotion))
            .add_systems(FixedUpdate, handle_landed.in_set(SimulationSet::Reactions));
    }
}
