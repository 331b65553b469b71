//! NavigationGraph: waypoint'ы трассы + рёбра с действием
//!
//! Граф неизменяем после сборки (`NavigationGraphBuilder::build` валидирует рёбра),
//! агенты держат его через `Arc`: никакого глобального реестра.

use bevy::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::NavGraphError;

/// Индекс узла в графе
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Reflect, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Как проходить ребро
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Reflect, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeAction {
    #[default]
    Walk,
    /// Прыжок сразу при начале движения к цели
    Jump,
    /// Ждать у края, прыгать когда цель в пределах jump_range
    WaitJump,
}

#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct NavigationEdge {
    pub target: NodeId,
    /// [0, 1], меньше = предпочтительнее
    pub cost: f32,
    pub action: EdgeAction,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NavigationNode {
    pub name: Option<String>,
    pub position: Vec3,
    pub reach_radius: f32,
    /// Можно стартовать с этого узла (spawn / reseed)
    pub start_eligible: bool,
    edges: Vec<NavigationEdge>,
}

impl NavigationNode {
    pub fn edges(&self) -> &[NavigationEdge] {
        &self.edges
    }

    /// Узел без исходящих рёбер (финиш)
    pub fn is_terminal(&self) -> bool {
        self.edges.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavigationGraph {
    nodes: Vec<NavigationNode>,
}

impl NavigationGraph {
    pub fn builder() -> NavigationGraphBuilder {
        NavigationGraphBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|node| node.edges.len()).sum()
    }

    pub fn node(&self, id: NodeId) -> Option<&NavigationNode> {
        self.nodes.get(id.index())
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &NavigationNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (NodeId(index as u32), node))
    }

    /// Исходящие рёбра (пусто для неизвестного узла)
    pub fn edges(&self, id: NodeId) -> &[NavigationEdge] {
        self.node(id).map(NavigationNode::edges).unwrap_or(&[])
    }

    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes()
            .find(|(_, node)| node.name.as_deref() == Some(name))
            .map(|(id, _)| id)
    }

    /// Ближайший узел (линейный скан, ничья → первый по порядку)
    pub fn nearest_node(&self, position: Vec3, start_only: bool) -> Option<NodeId> {
        let mut best: Option<(NodeId, f32)> = None;

        for (id, node) in self.nodes() {
            if start_only && !node.start_eligible {
                continue;
            }
            let distance = node.position.distance_squared(position);
            if best.is_none_or(|(_, best_distance)| distance < best_distance) {
                best = Some((id, distance));
            }
        }

        best.map(|(id, _)| id)
    }

    /// Выбор следующего ребра
    ///
    /// score = (1 - cost) * intelligence + U(0,1) * (1 - intelligence), максимум побеждает.
    /// Случайное число тянется для каждого ребра при любом intelligence
    /// (поток RNG не зависит от параметров агента).
    pub fn next_edge(&self, node: NodeId, intelligence: f32, rng: &mut impl Rng) -> Option<NavigationEdge> {
        let intelligence = intelligence.clamp(0.0, 1.0);
        let mut best: Option<(NavigationEdge, f32)> = None;

        for edge in self.edges(node) {
            let noise: f32 = rng.gen_range(0.0..1.0);
            let score = (1.0 - edge.cost) * intelligence + noise * (1.0 - intelligence);
            if best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((*edge, score));
            }
        }

        best.map(|(edge, _)| edge)
    }
}

/// Сборка графа с валидацией в `build()`
#[derive(Debug, Clone, Default)]
pub struct NavigationGraphBuilder {
    nodes: Vec<NavigationNode>,
    edges: Vec<(NodeId, NavigationEdge)>,
}

impl NavigationGraphBuilder {
    pub fn add_node(&mut self, position: Vec3, reach_radius: f32, start_eligible: bool) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NavigationNode {
            name: None,
            position,
            reach_radius,
            start_eligible,
            edges: Vec::new(),
        });
        id
    }

    pub fn add_named_node(
        &mut self,
        name: impl Into<String>,
        position: Vec3,
        reach_radius: f32,
        start_eligible: bool,
    ) -> Result<NodeId, NavGraphError> {
        let name = name.into();
        if self.nodes.iter().any(|node| node.name.as_deref() == Some(name.as_str())) {
            return Err(NavGraphError::DuplicateName(name));
        }

        let id = self.add_node(position, reach_radius, start_eligible);
        self.nodes[id.index()].name = Some(name);
        Ok(id)
    }

    pub fn add_edge(&mut self, from: NodeId, to: NodeId, cost: f32, action: EdgeAction) -> &mut Self {
        self.edges.push((
            from,
            NavigationEdge {
                target: to,
                cost,
                action,
            },
        ));
        self
    }

    pub fn build(self) -> Result<NavigationGraph, NavGraphError> {
        let mut nodes = self.nodes;

        for (index, node) in nodes.iter().enumerate() {
            if !node.reach_radius.is_finite() || node.reach_radius <= 0.0 {
                return Err(NavGraphError::InvalidReachRadius {
                    node: index as u32,
                    radius: node.reach_radius,
                });
            }
        }

        for (from, edge) in self.edges {
            if from.index() >= nodes.len() || edge.target.index() >= nodes.len() {
                return Err(NavGraphError::DanglingEdge {
                    from: from.0,
                    to: edge.target.0,
                });
            }
            if !(0.0..=1.0).contains(&edge.cost) {
                return Err(NavGraphError::CostOutOfRange {
                    from: from.0,
                    to: edge.target.0,
                    cost: edge.cost,
                });
            }
            nodes[from.index()].edges.push(edge);
        }

        Ok(NavigationGraph { nodes })
    }
}
