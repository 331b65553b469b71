//! BotDecisionAgent: ведёт бота по NavigationGraph
//!
//! Каждый frame tick:
//! 1. Guard: ragdoll / подъём → нулевой ввод, флаг recovering
//! 2. Seed цели (ближайший стартовый узел)
//! 3. Проверка достижения → `next_edge` (или reseed)
//! 4. Idle / Turning / Moving + действие ребра (Jump, WaitJump)

use bevy::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::intent_state::{drive_intent, IntentDrive, LocomotionIntentState};
use crate::components::{CharacterShape, Countdown};
use crate::config::{check_range, ConfigError};
use crate::ground::GroundContactTracker;
use crate::locomotion::LocomotionController;
use crate::navigation::{EdgeAction, NavigationGraph, NodeId};
use crate::physics::PhysicsQuery;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotAgentConfig {
    /// 1 = всегда самое дешёвое ребро, 0 = равновероятно
    pub intelligence: f32,
    pub turn_speed: f32,
    /// Угол, ниже которого бот идёт (выше: разворот на месте)
    pub move_start_angle_deg: f32,
    /// WaitJump: прыгаем, когда до цели не дальше
    pub jump_range: f32,
    /// Защита от двойного срабатывания достижения
    pub reach_cooldown: f32,
    /// Ближе к цели не идём (Idle), даже если radius узла меньше
    pub min_move_distance: f32,
    /// Луч края: вперёд / вверх от ступней / длина вниз
    pub edge_ray_ahead: f32,
    pub edge_ray_lift: f32,
    pub edge_ray_depth: f32,
}

impl Default for BotAgentConfig {
    fn default() -> Self {
        Self {
            intelligence: 0.7,
            turn_speed: 20.0,
            move_start_angle_deg: 15.0,
            jump_range: 2.5,
            reach_cooldown: 0.4,
            min_move_distance: 0.5,
            edge_ray_ahead: 1.0,
            edge_ray_lift: 0.5,
            edge_ray_depth: 1.5,
        }
    }
}

impl BotAgentConfig {
    pub fn with_intelligence(mut self, intelligence: f32) -> Self {
        self.intelligence = intelligence;
        self
    }

    pub fn with_jump_range(mut self, range: f32) -> Self {
        self.jump_range = range;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("intelligence", self.intelligence, 0.0, 1.0)?;
        check_range("turn_speed", self.turn_speed, 0.0, 1000.0)?;
        check_range("move_start_angle_deg", self.move_start_angle_deg, 0.0, 180.0)?;
        check_range("jump_range", self.jump_range, 0.0, 100.0)?;
        check_range("reach_cooldown", self.reach_cooldown, 0.0, 10.0)?;
        check_range("min_move_distance", self.min_move_distance, 0.0, 10.0)
    }

    fn drive(&self) -> IntentDrive {
        IntentDrive {
            turn_speed: self.turn_speed,
            move_start_angle_deg: self.move_start_angle_deg,
        }
    }
}

/// Что бот видит за frame tick
pub struct BotSenses<'a> {
    pub dt: f32,
    pub transform: &'a Transform,
    pub shape: &'a CharacterShape,
    pub ground: &'a GroundContactTracker,
    pub physics: &'a dyn PhysicsQuery,
    pub entity: Option<Entity>,
}

/// Итог frame tick'а (логи, тесты)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BotTick {
    pub new_target: Option<(NodeId, EdgeAction)>,
    pub reached: Option<NodeId>,
    pub jumped: bool,
    /// WaitJump: стоим у края
    pub waiting_at_edge: bool,
    pub state: LocomotionIntentState,
}

#[derive(Component, Debug, Clone)]
pub struct BotDecisionAgent {
    pub config: BotAgentConfig,
    graph: Arc<NavigationGraph>,
    target: Option<NodeId>,
    action: EdgeAction,
    intent_state: LocomotionIntentState,
    /// Прыжок по текущему Jump-ребру уже был
    jumped_this_edge: bool,
    reach_cooldown: Countdown,
    recovering: bool,
}

impl BotDecisionAgent {
    pub fn new(graph: Arc<NavigationGraph>, config: BotAgentConfig) -> Self {
        Self {
            config,
            graph,
            target: None,
            action: EdgeAction::Walk,
            intent_state: LocomotionIntentState::Idle,
            jumped_this_edge: false,
            reach_cooldown: Countdown::default(),
            recovering: false,
        }
    }

    pub fn graph(&self) -> &NavigationGraph {
        &self.graph
    }

    pub fn target(&self) -> Option<NodeId> {
        self.target
    }

    pub fn action(&self) -> EdgeAction {
        self.action
    }

    pub fn intent_state(&self) -> LocomotionIntentState {
        self.intent_state
    }

    pub fn is_recovering(&self) -> bool {
        self.recovering
    }

    pub fn jumped_this_edge(&self) -> bool {
        self.jumped_this_edge
    }

    /// Новая цель: сброс per-edge состояния
    pub fn assign_target(&mut self, target: Option<NodeId>, action: EdgeAction) {
        self.target = target;
        self.action = action;
        self.jumped_this_edge = false;
        self.intent_state = LocomotionIntentState::Idle;
    }

    /// Respawn: цель будет выбрана заново
    pub fn reset(&mut self) {
        self.assign_target(None, EdgeAction::Walk);
        self.reach_cooldown.cancel();
        self.recovering = false;
    }

    pub fn tick(
        &mut self,
        senses: &BotSenses,
        controller: &mut LocomotionController,
        rng: &mut impl Rng,
    ) -> BotTick {
        let mut report = BotTick::default();
        let position = senses.transform.translation;

        // 1. Guard
        if !controller.can_move || controller.is_incapacitated() {
            controller.set_input(0.0, 0.0);
            controller.request_dive(false);
            self.intent_state = LocomotionIntentState::Idle;
            self.recovering = true;
            return report;
        }

        // 2. Seed (после подъёма: заново от ближайшего стартового)
        if self.recovering || self.target.is_none() {
            self.recovering = false;
            let seed = self.graph.nearest_node(position, true);
            self.assign_target(seed, EdgeAction::Walk);
            report.new_target = seed.map(|node| (node, EdgeAction::Walk));
        }

        let Some(mut target) = self.target else {
            // Пустой граф / нет стартовых узлов: бот стоит
            controller.set_input(0.0, 0.0);
            self.intent_state = LocomotionIntentState::Idle;
            return report;
        };

        // 3. Достижение цели
        self.reach_cooldown.tick(senses.dt);
        if self.flat_distance(target, position) <= self.reach_radius(target) && !self.reach_cooldown.is_running() {
            self.reach_cooldown.start(self.config.reach_cooldown);
            report.reached = Some(target);

            match self.graph.next_edge(target, self.config.intelligence, rng) {
                Some(edge) => self.assign_target(Some(edge.target), edge.action),
                None => {
                    let fallback = self.graph.nearest_node(position, false);
                    self.assign_target(fallback, EdgeAction::Walk);
                }
            }
            report.new_target = self.target.map(|node| (node, self.action));

            let Some(next) = self.target else {
                controller.set_input(0.0, 0.0);
                return report;
            };
            target = next;
        }

        // 4. Движение
        let Some(node) = self.graph.node(target) else {
            controller.set_input(0.0, 0.0);
            return report;
        };
        let to_target = node.position - position;
        let desired = Vec3::new(to_target.x, 0.0, to_target.z);
        let distance = desired.length();
        let desired = (distance > self.config.min_move_distance).then_some(desired);

        let grounded = senses.ground.is_grounded();
        let jumping = controller.jump_dive().is_jumping;
        let mut strength = 1.0;

        if self.action == EdgeAction::WaitJump && grounded && !jumping && self.gap_ahead(senses) {
            if distance <= self.config.jump_range {
                report.jumped = controller.jump(senses.ground);
            } else {
                strength = 0.0;
                report.waiting_at_edge = true;
            }
        }

        let state = drive_intent(
            controller,
            senses.transform.rotation,
            desired,
            strength,
            self.config.drive(),
        );
        self.intent_state = state;
        report.state = state;

        if self.action == EdgeAction::Jump
            && state == LocomotionIntentState::Moving
            && grounded
            && !jumping
            && !self.jumped_this_edge
            && controller.jump(senses.ground)
        {
            self.jumped_this_edge = true;
            report.jumped = true;
        }

        report
    }

    fn flat_distance(&self, node: NodeId, position: Vec3) -> f32 {
        self.graph
            .node(node)
            .map(|node| {
                let offset = node.position - position;
                Vec2::new(offset.x, offset.z).length()
            })
            .unwrap_or(f32::INFINITY)
    }

    fn reach_radius(&self, node: NodeId) -> f32 {
        self.graph.node(node).map(|node| node.reach_radius).unwrap_or(0.0)
    }

    /// Луч вниз перед ботом: нет земли = край
    fn gap_ahead(&self, senses: &BotSenses) -> bool {
        let forward = senses.transform.rotation * Vec3::NEG_Z;
        let forward = Vec3::new(forward.x, 0.0, forward.z).normalize_or_zero();
        let feet = senses.shape.feet(senses.transform.translation);
        let origin = feet + forward * self.config.edge_ray_ahead + Vec3::Y * self.config.edge_ray_lift;

        !senses
            .physics
            .ray_blocked(origin, Vec3::NEG_Y, self.config.edge_ray_depth, senses.entity)
    }
}
