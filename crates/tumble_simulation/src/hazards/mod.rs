//! Hazards module
//!
//! Препятствия трассы поверх `CourseGeometry`:
//! - MovingPlatform: двигает solid, везёт стоящих на нём
//! - Rotator / Pendulum: крутят и качают solid, сбивают контактом капсулы
//! - WindZone: trigger-объём с ускорением
//! - Trampoline / Bumper: реагируют на старт контакта
//!
//! Hazard'ы НЕ пишут в CharacterBody: только `ExternalForces` и `GettingHit`.
//! Тело меняет locomotion controller на следующем physics tick.

use bevy::prelude::*;
use std::collections::{HashMap, HashSet};

pub mod components;

pub use components::{Bumper, MovingPlatform, Pendulum, Rotator, Trampoline, WindZone};

use crate::ai::BotDecisionAgent;
use crate::components::{ExternalForces, ExternalPush};
use crate::ground::{ContactBuffer, GroundContactTracker};
use crate::locomotion::LocomotionController;
use crate::physics::{CourseGeometry, SolidId};
use crate::ragdoll::GettingHit;
use crate::SimulationSet;

/// Нормаль контакта батута должна смотреть вверх хотя бы так
const TRAMPOLINE_MIN_UP: f32 = 0.5;

/// Система: платформы → новые позиции solid'ов
pub fn move_platforms(
    time: Res<Time<Fixed>>,
    course: Option<ResMut<CourseGeometry>>,
    platforms: Query<&MovingPlatform>,
) {
    let Some(mut course) = course else {
        return;
    };
    let seconds = time.elapsed_secs();

    for platform in platforms.iter() {
        course.move_solid(platform.solid, platform.position_at(seconds));
    }
}

/// Система: вращающиеся препятствия и маятники
///
/// Поза считается от `Time<Fixed>`, так что один seed = одна траектория.
pub fn swing_obstacles(
    time: Res<Time<Fixed>>,
    course: Option<ResMut<CourseGeometry>>,
    rotators: Query<&Rotator>,
    pendulums: Query<&Pendulum>,
) {
    let Some(mut course) = course else {
        return;
    };
    let seconds = time.elapsed_secs();

    for rotator in rotators.iter() {
        course.rotate_solid(rotator.solid, rotator.rotation_at(seconds));
    }
    for pendulum in pendulums.iter() {
        let (center, rotation) = pendulum.pose_at(seconds);
        course.move_solid(pendulum.solid, center);
        course.rotate_solid(pendulum.solid, rotation);
    }
}

/// Система: стоящих на движущемся solid'е везёт вместе с ним
///
/// Сбитый (being_hit) персонаж больше не едет.
pub fn carry_riders(
    course: Option<Res<CourseGeometry>>,
    mut riders: Query<(&GroundContactTracker, &LocomotionController, &mut ExternalForces)>,
) {
    let Some(course) = course else {
        return;
    };

    for (ground, controller, mut external) in riders.iter_mut() {
        if controller.being_hit || !ground.is_grounded() {
            continue;
        }
        let Some(solid) = ground.ground_surface().and_then(|id| course.get(id)) else {
            continue;
        };
        if solid.last_displacement != Vec3::ZERO {
            external.push(ExternalPush::Carry(solid.last_displacement));
        }
    }
}

/// Система: ветер в trigger-объёмах
pub fn apply_wind(
    course: Option<Res<CourseGeometry>>,
    zones: Query<&WindZone>,
    mut characters: Query<(&Transform, &mut ExternalForces, Has<BotDecisionAgent>)>,
) {
    let Some(course) = course else {
        return;
    };

    for zone in zones.iter() {
        let Some(volume) = course.get(zone.solid) else {
            continue;
        };

        for (transform, mut external, is_bot) in characters.iter_mut() {
            if is_bot && !zone.affects_bots {
                continue;
            }
            if let Some(acceleration) = zone.acceleration_at(volume, transform.translation) {
                external.push(ExternalPush::Acceleration(acceleration));
            }
        }
    }
}

/// Система: батуты и бамперы по контактам тика
///
/// Срабатывают только на старте контакта (персонаж, solid), как удары
/// персонажей в headless step.
pub fn contact_hazards(
    course: Option<Res<CourseGeometry>>,
    trampolines: Query<&Trampoline>,
    bumpers: Query<&Bumper>,
    mut characters: Query<(Entity, &ContactBuffer, &mut ExternalForces)>,
    mut hit_events: EventWriter<GettingHit>,
    mut touching: Local<HashSet<(Entity, SolidId)>>,
) {
    let trampolines: HashMap<SolidId, &Trampoline> = trampolines.iter().map(|t| (t.solid, t)).collect();
    let bumpers: HashMap<SolidId, &Bumper> = bumpers.iter().map(|b| (b.solid, b)).collect();
    if trampolines.is_empty() && bumpers.is_empty() {
        touching.clear();
        return;
    }

    let mut touching_now = HashSet::new();

    for (entity, buffer, mut external) in characters.iter_mut() {
        for contact in buffer.contacts.iter() {
            let Some(solid) = contact.surface else {
                continue;
            };
            let key = (entity, solid);
            // Несколько сфер капсулы = несколько контактов с одним solid'ом
            if !touching_now.insert(key) || touching.contains(&key) {
                continue;
            }

            if let Some(trampoline) = trampolines.get(&solid) {
                let up = course
                    .as_ref()
                    .and_then(|course| course.get(solid))
                    .map(|solid| solid.rotation * Vec3::Y)
                    .unwrap_or(Vec3::Y);
                if contact.normal.dot(up) >= TRAMPOLINE_MIN_UP {
                    crate::log(&format!("🤸 {:?} trampoline bounce", entity));
                    external.push(ExternalPush::VelocityChange(up * trampoline.bounce_speed));
                }
            }

            if let Some(bumper) = bumpers.get(&solid) {
                let knockback = bumper.knockback(contact.normal);
                crate::log(&format!("🔨 {:?} bumped (Δv {:.1})", entity, knockback.length()));
                if bumper.knockdown {
                    hit_events.write(GettingHit { entity, knockback });
                } else {
                    external.push(ExternalPush::VelocityChange(knockback));
                }
            }
        }
    }

    *touching = touching_now;
}

/// Hazards Plugin
///
/// Environment (до ragdoll/locomotion): платформы, вращение, перенос, ветер.
/// Contacts (после physics step, до ground tracker'а): батуты, бамперы.
pub struct HazardsPlugin;

impl Plugin for HazardsPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            (move_platforms, swing_obstacles, carry_riders, apply_wind)
                .chain()
                .in_set(SimulationSet::Environment),
        )
        .add_systems(FixedUpdate, contact_hazards.in_set(SimulationSet::Contacts));
    }
}
