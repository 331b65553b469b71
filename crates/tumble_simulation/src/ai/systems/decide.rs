//! Frame tick ботов: граф → цель → intent controller'а

use bevy::ecs::system::StaticSystemParam;
use bevy::prelude::*;

use crate::ai::{BotDecisionAgent, BotSenses, LocomotionIntentState};
use crate::components::CharacterShape;
use crate::ground::GroundContactTracker;
use crate::locomotion::LocomotionController;
use crate::physics::PhysicsQueryBackend;
use crate::DeterministicRng;

/// Система: решения всех ботов (Update, SimulationSet::Decide)
///
/// RNG общий и детерминированный: порядок ботов = порядок query,
/// поэтому при одинаковом seed и одинаковом spawn выбор рёбер повторяется.
pub fn drive_bots<B: PhysicsQueryBackend>(
    backend: StaticSystemParam<B::Param>,
    time: Res<Time>,
    mut rng: ResMut<DeterministicRng>,
    mut query: Query<(
        Entity,
        &mut BotDecisionAgent,
        &mut LocomotionController,
        &Transform,
        &CharacterShape,
        &GroundContactTracker,
    )>,
) {
    let dt = time.delta_secs();
    let rng = &mut rng.rng;

    B::with_query(&backend, |physics| {
        for (entity, mut agent, mut controller, transform, shape, ground) in query.iter_mut() {
            let previous_state = agent.intent_state();
            let senses = BotSenses {
                dt,
                transform,
                shape,
                ground,
                physics,
                entity: Some(entity),
            };

            let report = agent.tick(&senses, &mut controller, rng);

            if let Some(node) = report.reached {
                crate::log(&format!("📍 {:?} reached node {}", entity, node.0));
            }
            if let Some((node, action)) = report.new_target {
                crate::log(&format!("🎯 {:?} → node {} ({:?})", entity, node.0, action));
            }
            if report.jumped {
                crate::log(&format!("🦘 {:?} bot jump", entity));
            }
            if report.state == LocomotionIntentState::Turning && previous_state == LocomotionIntentState::Moving {
                crate::log(&format!("↩️ {:?} turning in place", entity));
            }
        }
    });
}
