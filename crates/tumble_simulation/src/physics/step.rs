//! Headless physics step (без Rapier)
//!
//! Порядок внутри SimulationSet::PhysicsStep:
//! 1. integrate_bodies: силы + гравитация → скорость → позиция
//! 2. resolve_course_contacts: выталкивание капсулы из геометрии трассы
//! 3. resolve_character_contacts: персонаж vs персонаж, удары на старте контакта
//!
//! Оба resolve наполняют `ContactBuffer`, который читает ground tracker.

use bevy::prelude::*;
use std::collections::HashSet;

use super::course::CourseGeometry;
use crate::components::{CharacterBody, CharacterShape, CollisionLayer};
use crate::config::SimulationSettings;
use crate::ground::{CharacterImpact, ContactBuffer, SurfaceContact};

/// Затухание угловой скорости за тик (ragdoll кувыркается, но успокаивается)
const ANGULAR_DAMPING: f32 = 0.97;

/// Коэффициент восстановления при столкновении персонажей
const CHARACTER_RESTITUTION: f32 = 0.3;

/// Система интеграции velocity → Transform
pub fn integrate_bodies(
    mut query: Query<(&mut CharacterBody, &mut Transform)>,
    settings: Res<SimulationSettings>,
    time: Res<Time<Fixed>>,
) {
    let delta = time.delta_secs();
    if delta <= 0.0 {
        return;
    }

    for (mut body, mut transform) in query.iter_mut() {
        body.integrate_forces(settings.gravity, delta);

        let shift = body.take_pending_translation();
        transform.translation += body.linear_velocity * delta + shift;

        if body.rotation_locked {
            body.angular_velocity = Vec3::ZERO;
        } else {
            let spin = Quat::from_scaled_axis(body.angular_velocity * delta);
            transform.rotation = (spin * transform.rotation).normalize();
            body.angular_velocity *= ANGULAR_DAMPING;
        }
    }
}

/// Выталкивает одну капсулу из трассы, пишет контакты в буфер
pub fn resolve_capsule_against_course(
    course: &CourseGeometry,
    shape: &CharacterShape,
    body: &mut CharacterBody,
    translation: &mut Vec3,
    buffer: &mut ContactBuffer,
) {
    // Снизу вверх: нижняя сфера даёт пол, верхние: стены и потолок
    for index in 0..3 {
        let sphere = shape.sphere_centers(*translation)[index];
        for contact in course.sphere_contacts(sphere, shape.radius) {
            *translation += contact.normal * contact.depth;

            let into_surface = body.linear_velocity.dot(contact.normal);
            if into_surface < 0.0 {
                body.linear_velocity -= contact.normal * into_surface;
            }

            let layer = course
                .get(contact.solid)
                .map(|solid| solid.layer)
                .unwrap_or(CollisionLayer::Ground);
            buffer.contacts.push(SurfaceContact {
                normal: contact.normal,
                layer,
                surface: Some(contact.solid),
            });
        }
    }
}

/// Система: коллизии персонажей с трассой
pub fn resolve_course_contacts(
    course: Option<Res<CourseGeometry>>,
    mut query: Query<(&mut CharacterBody, &mut Transform, &CharacterShape, &mut ContactBuffer)>,
) {
    let Some(course) = course else {
        return;
    };

    for (mut body, mut transform, shape, mut buffer) in query.iter_mut() {
        let mut translation = transform.translation;
        resolve_capsule_against_course(&course, shape, &mut body, &mut translation, &mut buffer);
        if translation != transform.translation {
            transform.translation = translation;
        }
    }
}

/// Пара персонажей, которые касались на прошлом тике (a < b)
fn pair_key(a: Entity, b: Entity) -> (Entity, Entity) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Система: персонаж vs персонаж
///
/// Капсулы сравниваются как вертикальные цилиндры: горизонтальная дистанция
/// центров + перекрытие по высоте. Удар (`CharacterImpact`) пишется только
/// на тике начала контакта, со скоростями ДО разрешения.
pub fn resolve_character_contacts(
    mut query: Query<(Entity, &mut CharacterBody, &mut Transform, &CharacterShape, &mut ContactBuffer)>,
    mut touching: Local<HashSet<(Entity, Entity)>>,
) {
    let mut touching_now = HashSet::new();

    let mut combinations = query.iter_combinations_mut::<2>();
    while let Some([a, b]) = combinations.fetch_next() {
        let (entity_a, mut body_a, mut transform_a, shape_a, mut buffer_a) = a;
        let (entity_b, mut body_b, mut transform_b, shape_b, mut buffer_b) = b;

        let vertical_gap = (transform_a.translation.y - transform_b.translation.y).abs();
        if vertical_gap >= shape_a.half_height + shape_b.half_height {
            continue;
        }

        let offset = transform_a.translation - transform_b.translation;
        let flat = Vec3::new(offset.x, 0.0, offset.z);
        let distance = flat.length();
        let min_distance = shape_a.radius + shape_b.radius;
        if distance >= min_distance {
            continue;
        }

        let normal = if distance > 1e-5 { flat / distance } else { Vec3::X };
        let key = pair_key(entity_a, entity_b);
        touching_now.insert(key);

        if !touching.contains(&key) {
            buffer_a.impacts.push(CharacterImpact {
                other: entity_b,
                other_speed: body_b.speed(),
                other_is_character: true,
            });
            buffer_b.impacts.push(CharacterImpact {
                other: entity_a,
                other_speed: body_a.speed(),
                other_is_character: true,
            });
        }

        // Разводим поровну
        let push = normal * (min_distance - distance) * 0.5;
        transform_a.translation += push;
        transform_b.translation -= push;

        // Импульс вдоль нормали, только при сближении
        let approach = (body_a.linear_velocity - body_b.linear_velocity).dot(normal);
        if approach < 0.0 {
            let inverse_mass = 1.0 / body_a.mass + 1.0 / body_b.mass;
            let impulse = -(1.0 + CHARACTER_RESTITUTION) * approach / inverse_mass;
            body_a.apply_impulse(normal * impulse);
            body_b.apply_impulse(-normal * impulse);
        }

        buffer_a.contacts.push(SurfaceContact {
            normal,
            layer: CollisionLayer::Character,
            surface: None,
        });
        buffer_b.contacts.push(SurfaceContact {
            normal: -normal,
            layer: CollisionLayer::Character,
            surface: None,
        });
    }

    *touching = touching_now;
}

/// Headless step plugin: шагает тела по `CourseGeometry`
pub struct HeadlessStepPlugin;

impl Plugin for HeadlessStepPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            (integrate_bodies, resolve_course_contacts, resolve_character_contacts)
                .chain()
                .in_set(crate::SimulationSet::PhysicsStep),
        );
    }
}
