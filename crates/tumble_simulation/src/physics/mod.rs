//! Physics module
//!
//! Physics query service (лучи) + backend, который шагает тела:
//! - headless: аналитическая `CourseGeometry`, свой integrator
//! - rapier: bevy_rapier3d, мы только синхронизируем скорость и собираем контакты

use bevy::ecs::system::SystemParamItem;
use bevy::prelude::*;

pub mod course;
pub mod query;
pub mod rapier;
pub mod step;

pub use course::{CourseGeometry, CourseSolid, SolidContact, SolidId};
pub use query::{FnQuery, NoGeometry, PhysicsQuery, PhysicsQueryBackend, RayHit};
pub use rapier::{rapier_character_bundle, RapierBackend, RapierBridgePlugin};
pub use step::HeadlessStepPlugin;

/// Backend по умолчанию: `CourseGeometry` ресурс + headless step
pub struct HeadlessBackend;

impl PhysicsQueryBackend for HeadlessBackend {
    type Param = Option<Res<'static, CourseGeometry>>;

    fn step_plugin() -> impl Plugin {
        HeadlessStepPlugin
    }

    fn with_query<R>(param: &SystemParamItem<'_, '_, Self::Param>, f: impl FnOnce(&dyn PhysicsQuery) -> R) -> R {
        match param {
            Some(course) => f(&**course),
            None => f(&NoGeometry),
        }
    }
}
