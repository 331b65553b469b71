//! Ground contact module
//!
//! Physics backend складывает контакты тика в `ContactBuffer`,
//! `update_ground_contacts` прогоняет их через `GroundContactTracker`
//! и публикует `Landed` / `HitByOther`.
//!
//! Подписчики (locomotion, ragdoll, UI, аналитика): обычные системы с
//! `EventReader`: подписка живёт ровно столько, сколько система.

use bevy::prelude::*;

pub mod tracker;

#[cfg(test)]
mod tracker_tests;

pub use tracker::{ContactOutcome, GroundConfig, GroundContactTracker};

use crate::components::{CharacterBody, CollisionLayer};
use crate::physics::SolidId;
use crate::SimulationSet;

/// Контакт с поверхностью за тик
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceContact {
    /// Нормаль от поверхности к персонажу
    pub normal: Vec3,
    pub layer: CollisionLayer,
    pub surface: Option<SolidId>,
}

/// Начало контакта с другим телом
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharacterImpact {
    pub other: Entity,
    /// |v| другого тела в момент удара
    pub other_speed: f32,
    pub other_is_character: bool,
}

/// Сырые наблюдения backend'а за тик (очищается после обработки)
#[derive(Component, Debug, Clone, Default)]
pub struct ContactBuffer {
    pub contacts: Vec<SurfaceContact>,
    pub impacts: Vec<CharacterImpact>,
}

impl ContactBuffer {
    pub fn clear(&mut self) {
        self.contacts.clear();
        self.impacts.clear();
    }
}

/// Приземление (переход в grounded при vy ≤ порога)
#[derive(Event, Debug, Clone, Copy)]
pub struct Landed {
    pub entity: Entity,
    pub vertical_velocity: f32,
}

/// Персонажа сбил другой персонаж (скорость ≥ порога)
#[derive(Event, Debug, Clone, Copy)]
pub struct HitByOther {
    pub entity: Entity,
    pub other: Entity,
    pub other_speed: f32,
}

/// Система: контакты тика → GroundContactTracker → события
pub fn update_ground_contacts(
    mut query: Query<(Entity, &mut GroundContactTracker, &mut ContactBuffer, &CharacterBody)>,
    mut landed_events: EventWriter<Landed>,
    mut hit_events: EventWriter<HitByOther>,
) {
    for (entity, mut tracker, mut buffer, body) in query.iter_mut() {
        let vertical_velocity = body.linear_velocity.y;

        for contact in buffer.contacts.iter() {
            let outcome = tracker.report_contact(contact.normal, contact.layer, vertical_velocity, contact.surface);
            if outcome == ContactOutcome::Landed {
                crate::log(&format!("🛬 {:?} landed (vy {:.2})", entity, vertical_velocity));
                landed_events.write(Landed {
                    entity,
                    vertical_velocity,
                });
            }
        }

        for impact in buffer.impacts.iter() {
            if tracker.report_impact(impact.other_speed, impact.other_is_character) {
                crate::log_info(&format!(
                    "💥 {:?} hit by {:?} at {:.1} m/s",
                    entity, impact.other, impact.other_speed
                ));
                hit_events.write(HitByOther {
                    entity,
                    other: impact.other,
                    other_speed: impact.other_speed,
                });
            }
        }

        if tracker.end_tick() {
            crate::log(&format!("🪂 {:?} left ground", entity));
        }

        buffer.clear();
    }
}

/// Ground Plugin
///
/// Регистрирует события и обработку контактов в FixedUpdate (SimulationSet::Ground).
pub struct GroundPlugin;

impl Plugin for GroundPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<Landed>().add_event::<HitByOther>();

        app.add_systems(FixedUpdate, update_ground_contacts.in_set(SimulationSet::Ground));
    }
}
