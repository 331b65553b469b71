//! Rapier backend: bevy_rapier3d шагает тела, мы только синхронизируем
//!
//! Архитектура:
//! - До rapier step: CharacterBody (силы, импульсы) → Rapier `Velocity`
//! - После step: `Velocity` → CharacterBody, короткий луч вниз = контакт с полом
//! - `CollisionEvent::Started` между персонажами = удар
//!
//! `RapierPhysicsPlugin` добавляет хост (обычно `.in_fixed_schedule()`).

use bevy::ecs::system::SystemParamItem;
use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

use super::query::{FnQuery, NoGeometry, PhysicsQuery, PhysicsQueryBackend, RayHit};
use crate::components::{Character, CharacterBody, CharacterShape, CollisionLayer};
use crate::ground::{CharacterImpact, ContactBuffer, SurfaceContact};
use crate::SimulationSet;

/// Насколько ниже ступней ищем пол (skin)
const GROUND_RAY_DEPTH: f32 = 0.08;

/// Луч через RapierContext (сенсоры и собственное тело игнорируются)
pub fn rapier_raycast(
    context: &RapierContext,
    origin: Vec3,
    direction: Vec3,
    max_distance: f32,
    exclude: Option<Entity>,
) -> Option<RayHit> {
    let direction = direction.normalize_or_zero();
    if direction == Vec3::ZERO {
        return None;
    }

    let mut filter = QueryFilter::default().exclude_sensors();
    if let Some(entity) = exclude {
        filter = filter.exclude_rigid_body(entity);
    }

    context
        .cast_ray_and_get_normal(origin, direction, max_distance, true, filter)
        .map(|(entity, intersection)| RayHit {
            point: intersection.point,
            normal: intersection.normal,
            distance: intersection.time_of_impact,
            surface: Some(entity),
        })
}

/// Backend поверх bevy_rapier3d
pub struct RapierBackend;

impl PhysicsQueryBackend for RapierBackend {
    type Param = ReadRapierContext<'static, 'static>;

    fn step_plugin() -> impl Plugin {
        RapierBridgePlugin
    }

    fn with_query<R>(param: &SystemParamItem<'_, '_, Self::Param>, f: impl FnOnce(&dyn PhysicsQuery) -> R) -> R {
        let Ok(context) = param.single() else {
            return f(&NoGeometry);
        };
        let query = FnQuery(|origin: Vec3, direction: Vec3, max_distance: f32, exclude: Option<Entity>| {
            rapier_raycast(&context, origin, direction, max_distance, exclude)
        });
        f(&query)
    }
}

/// Компоненты Rapier для персонажа: dynamic капсула, yaw свободен
pub fn rapier_character_bundle(shape: &CharacterShape) -> impl Bundle {
    (
        RigidBody::Dynamic,
        Collider::capsule_y(shape.half_segment(), shape.radius),
        LockedAxes::ROTATION_LOCKED_X | LockedAxes::ROTATION_LOCKED_Z,
        Velocity::default(),
        ActiveEvents::COLLISION_EVENTS,
    )
}

/// Система: CharacterBody → Rapier Velocity (до SyncBackend)
///
/// Силы интегрируем сами (гравитацию считает Rapier), импульсы уже в скорости.
pub fn sync_bodies_to_rapier(
    mut query: Query<(&mut CharacterBody, &mut Velocity, &mut Transform)>,
    time: Res<Time<Fixed>>,
) {
    let delta = time.delta_secs();

    for (mut body, mut velocity, mut transform) in query.iter_mut() {
        body.integrate_forces(Vec3::ZERO, delta);
        velocity.linvel = body.linear_velocity;
        velocity.angvel = body.angular_velocity;

        let shift = body.take_pending_translation();
        if shift != Vec3::ZERO {
            transform.translation += shift;
        }
    }
}

/// Система: ragdoll снимает блокировку вращения
pub fn sync_locked_axes(mut query: Query<(&CharacterBody, &mut LockedAxes), Changed<CharacterBody>>) {
    for (body, mut axes) in query.iter_mut() {
        let wanted = if body.rotation_locked {
            LockedAxes::ROTATION_LOCKED_X | LockedAxes::ROTATION_LOCKED_Z
        } else {
            LockedAxes::empty()
        };
        if *axes != wanted {
            *axes = wanted;
        }
    }
}

/// Система: Rapier Velocity → CharacterBody (после step)
pub fn sync_bodies_from_rapier(mut query: Query<(&mut CharacterBody, &Velocity)>) {
    for (mut body, velocity) in query.iter_mut() {
        body.linear_velocity = velocity.linvel;
        body.angular_velocity = velocity.angvel;
    }
}

/// Система: контакт с полом по короткому лучу из-под ступней
pub fn sense_rapier_ground(
    rapier: ReadRapierContext,
    mut query: Query<(Entity, &Transform, &CharacterShape, &mut ContactBuffer)>,
) {
    let Ok(context) = rapier.single() else {
        return;
    };

    for (entity, transform, shape, mut buffer) in query.iter_mut() {
        let origin = shape.feet(transform.translation) + Vec3::Y * 0.05;
        let Some(hit) = rapier_raycast(&context, origin, Vec3::NEG_Y, 0.05 + GROUND_RAY_DEPTH, Some(entity)) else {
            continue;
        };
        buffer.contacts.push(SurfaceContact {
            normal: hit.normal,
            layer: CollisionLayer::Ground,
            surface: None,
        });
    }
}

/// Система: начало контакта двух персонажей → CharacterImpact обоим
pub fn collect_rapier_impacts(
    mut collisions: EventReader<CollisionEvent>,
    mut query: Query<(&CharacterBody, &mut ContactBuffer), With<Character>>,
) {
    for event in collisions.read() {
        let CollisionEvent::Started(a, b, _) = event else {
            continue;
        };
        let (a, b) = (*a, *b);
        let (Ok((body_a, _)), Ok((body_b, _))) = (query.get(a), query.get(b)) else {
            continue;
        };
        let (speed_a, speed_b) = (body_a.speed(), body_b.speed());

        if let Ok((_, mut buffer)) = query.get_mut(a) {
            buffer.impacts.push(CharacterImpact {
                other: b,
                other_speed: speed_b,
                other_is_character: true,
            });
        }
        if let Ok((_, mut buffer)) = query.get_mut(b) {
            buffer.impacts.push(CharacterImpact {
                other: a,
                other_speed: speed_a,
                other_is_character: true,
            });
        }
    }
}

/// Rapier bridge plugin
///
/// Rapier обычно шагает в FixedPostUpdate, поэтому readback и сенсоры
/// стоят в начале следующего FixedUpdate (SimulationSet::Sense).
pub struct RapierBridgePlugin;

impl Plugin for RapierBridgePlugin {
    fn build(&self, app: &mut App) {
        use bevy_rapier3d::plugin::PhysicsSet;

        app.add_systems(
            FixedUpdate,
            (sync_bodies_from_rapier, sense_rapier_ground, collect_rapier_impacts)
                .chain()
                .in_set(SimulationSet::Sense),
        );

        // Наши системы запускаются ДО rapier physics step
        app.add_systems(
            FixedUpdate,
            (sync_locked_axes, sync_bodies_to_rapier)
                .chain()
                .in_set(SimulationSet::PhysicsStep)
                .before(PhysicsSet::SyncBackend),
        );
    }
}
