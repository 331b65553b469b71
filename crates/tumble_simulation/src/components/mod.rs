//! ECS Components, общие для всех подсистем
//!
//! Организация:
//! - body: rigid body персонажа (CharacterBody, CharacterShape, CollisionLayer)
//! - intent: MovementIntent + очередь внешних воздействий
//! - timer: Countdown (deadline-таймеры вместо корутин)

pub mod body;
pub mod intent;
pub mod timer;

pub use body::*;
pub use intent::*;
pub use timer::*;
