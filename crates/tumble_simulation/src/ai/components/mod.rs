//! AI components

pub mod agent;
pub mod intent_state;


pub use agent::*;
pub use intent_state::*;
