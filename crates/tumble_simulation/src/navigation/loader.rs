//! JSON описание графа с именованными узлами
//!
//! ```json
//! {
//!   "nodes": [
//!     { "name": "start", "position": [0, 0, 0], "start": true,
//!       "edges": [ { "to": "gap", "cost": 0.2, "action": "wait_jump" } ] },
//!     { "name": "gap", "position": [0, 0, -8], "reach_radius": 1.0 }
//!   ]
//! }
//! ```
//!
//! Имена резолвятся в `NodeId` при загрузке (порядок узлов = порядок в файле).

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::graph::{EdgeAction, NavigationGraph};
use super::NavGraphError;

/// Reach radius узла по умолчанию
pub const DEFAULT_REACH_RADIUS: f32 = 0.6;

fn default_reach_radius() -> f32 {
    DEFAULT_REACH_RADIUS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphFile {
    pub nodes: Vec<NodeEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeEntry {
    pub name: String,
    pub position: Vec3,
    #[serde(default = "default_reach_radius")]
    pub reach_radius: f32,
    #[serde(default)]
    pub start: bool,
    #[serde(default)]
    pub edges: Vec<EdgeEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeEntry {
    pub to: String,
    pub cost: f32,
    #[serde(default)]
    pub action: EdgeAction,
}

impl GraphFile {
    /// Два прохода: сначала все узлы (имена → id), потом рёбра
    pub fn into_graph(self) -> Result<NavigationGraph, NavGraphError> {
        let mut builder = NavigationGraph::builder();

        let mut ids = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            ids.push(builder.add_named_node(node.name.clone(), node.position, node.reach_radius, node.start)?);
        }

        let lookup = |name: &str| -> Result<super::NodeId, NavGraphError> {
            self.nodes
                .iter()
                .position(|node| node.name == name)
                .map(|index| ids[index])
                .ok_or_else(|| NavGraphError::UnknownNode(name.to_string()))
        };

        for (node, from) in self.nodes.iter().zip(ids.iter().copied()) {
            for edge in &node.edges {
                let to = lookup(&edge.to)?;
                builder.add_edge(from, to, edge.cost, edge.action);
            }
        }

        builder.build()
    }
}

impl NavigationGraph {
    /// Загрузка из JSON. Пустой граф: не ошибка (бот просто стоит), но пишем warning.
    pub fn from_json(json: &str) -> Result<Self, NavGraphError> {
        let file: GraphFile = serde_json::from_str(json)?;
        let graph = file.into_graph()?;

        if graph.is_empty() {
            crate::log_warning("navigation graph is empty: bots will stay idle");
        } else {
            crate::log_info(&format!(
                "🗺️ navigation graph loaded: {} nodes, {} edges",
                graph.len(),
                graph.edge_count()
            ));
        }

        Ok(graph)
    }

    /// Как `from_json`, но пустой граф: ошибка
    pub fn from_json_non_empty(json: &str) -> Result<Self, NavGraphError> {
        let graph = Self::from_json(json)?;
        if graph.is_empty() {
            return Err(NavGraphError::Empty);
        }
        Ok(graph)
    }
}
