//! Bundles персонажей
//!
//! Всё остальное (CharacterBody, CharacterShape, GroundContactTracker,
//! ContactBuffer, ExternalForces) подтягивают required components
//! `LocomotionController`.

use bevy::prelude::*;
use std::sync::Arc;

use crate::ai::{BotAgentConfig, BotDecisionAgent};
use crate::animation::AnimatorParams;
use crate::components::{Character, CharacterShape};
use crate::locomotion::{LocomotionConfig, LocomotionController};
use crate::navigation::NavigationGraph;
use crate::player::{PlayerControl, PlayerControlConfig};
use crate::ragdoll::RagdollTransitionManager;

/// Персонаж без мозгов: ступни в `feet`, смотрит в -Z
pub fn character_bundle(config: LocomotionConfig, feet: Vec3) -> impl Bundle {
    let shape = CharacterShape::default();
    (
        Character,
        LocomotionController::new(config),
        RagdollTransitionManager::default(),
        AnimatorParams::default(),
        shape,
        Transform::from_translation(shape.center_from_feet(feet)),
    )
}

/// Бот на графе
pub fn bot_bundle(graph: Arc<NavigationGraph>, config: BotAgentConfig, feet: Vec3) -> impl Bundle {
    (
        character_bundle(LocomotionConfig::bot(), feet),
        BotDecisionAgent::new(graph, config),
    )
}

/// Игрок
pub fn player_bundle(config: PlayerControlConfig, feet: Vec3) -> impl Bundle {
    (
        character_bundle(LocomotionConfig::player(), feet),
        PlayerControl::new(config),
    )
}
