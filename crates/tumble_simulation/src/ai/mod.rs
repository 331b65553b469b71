//! AI module
//!
//! Боты бегут по NavigationGraph:
//! - components/agent: BotDecisionAgent (цель, рёбра, Jump / WaitJump)
//! - components/intent_state: Idle / Turning / Moving (общий с player adapter'ом)
//! - systems/decide: frame tick в Update
//!
//! AI пишет только intent (`set_input`, `rotate_towards`, `jump`), физику
//! трогает исключительно locomotion controller в FixedUpdate.

use bevy::prelude::*;
use std::marker::PhantomData;

pub mod components;
pub mod systems;

pub use components::*;
pub use systems::*;

use crate::physics::{HeadlessBackend, PhysicsQueryBackend};
use crate::SimulationSet;

/// AI Plugin
///
/// Generic по backend'у: луч края (WaitJump) идёт через `B::with_query`.
pub struct AIPlugin<B: PhysicsQueryBackend = HeadlessBackend>(PhantomData<B>);

impl<B: PhysicsQueryBackend> Default for AIPlugin<B> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<B: PhysicsQueryBackend> Plugin for AIPlugin<B> {
    fn build(&self, app: &mut App) {
        app.register_type::<LocomotionIntentState>();

        app.add_systems(Update, drive_bots::<B>.in_set(SimulationSet::Decide));
    }
}
