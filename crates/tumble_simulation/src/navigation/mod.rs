//! Navigation module
//!
//! Граф waypoint'ов трассы для AI:
//! - graph: NavigationGraph, узлы, рёбра, `nearest_node` / `next_edge`
//! - loader: JSON с именованными узлами
//!
//! Граф передаётся агентам явно (`Arc<NavigationGraph>`), несколько независимых
//! графов в одном мире: норма (тесты, разные трассы).

use thiserror::Error;

pub mod graph;
pub mod loader;


pub use graph::{EdgeAction, NavigationEdge, NavigationGraph, NavigationGraphBuilder, NavigationNode, NodeId};
pub use loader::{GraphFile, DEFAULT_REACH_RADIUS};

#[derive(Debug, Error)]
pub enum NavGraphError {
    #[error("edge {from} -> {to} references a missing node")]
    DanglingEdge { from: u32, to: u32 },

    #[error("edge {from} -> {to} has cost {cost}, expected 0..=1")]
    CostOutOfRange { from: u32, to: u32, cost: f32 },

    #[error("node {node} has invalid reach radius {radius}")]
    InvalidReachRadius { node: u32, radius: f32 },

    #[error("duplicate node name '{0}'")]
    DuplicateName(String),

    #[error("edge target '{0}' is not a node")]
    UnknownNode(String),

    #[error("navigation graph is empty")]
    Empty,

    #[error("invalid navigation json: {0}")]
    Json(#[from] serde_json::Error),
}
