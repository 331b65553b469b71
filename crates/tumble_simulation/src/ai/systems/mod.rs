//! AI systems

pub mod decide;

pub use decide::*;
