//! Physics query service: лучи и выбор backend'а
//!
//! Core-системам нужны только лучи (slope, step-up, edge ray).
//! Backend решает, откуда их брать: аналитическая трасса или Rapier.

use bevy::ecs::system::{SystemParam, SystemParamItem};
use bevy::prelude::*;

/// Результат луча
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub point: Vec3,
    /// Нормаль поверхности в точке попадания (unit)
    pub normal: Vec3,
    /// Расстояние от origin вдоль направления
    pub distance: f32,
    /// Entity поверхности, если backend его знает
    pub surface: Option<Entity>,
}

/// Запросы к физическому миру
pub trait PhysicsQuery {
    /// Луч из `origin` вдоль `direction` (нормализуется внутри).
    /// `exclude`: собственное тело кастующего.
    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        exclude: Option<Entity>,
    ) -> Option<RayHit>;

    fn ray_blocked(&self, origin: Vec3, direction: Vec3, max_distance: f32, exclude: Option<Entity>) -> bool {
        self.raycast(origin, direction, max_distance, exclude).is_some()
    }
}

/// Пустой мир: ни одного попадания
pub struct NoGeometry;

impl PhysicsQuery for NoGeometry {
    fn raycast(&self, _: Vec3, _: Vec3, _: f32, _: Option<Entity>) -> Option<RayHit> {
        None
    }
}

/// Адаптер: замыкание как PhysicsQuery (Rapier context живёт только внутри системы)
pub struct FnQuery<F>(pub F);

impl<F> PhysicsQuery for FnQuery<F>
where
    F: Fn(Vec3, Vec3, f32, Option<Entity>) -> Option<RayHit>,
{
    fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32, exclude: Option<Entity>) -> Option<RayHit> {
        (self.0)(origin, direction, max_distance, exclude)
    }
}

/// Physics backend: откуда брать лучи и кто шагает тела
///
/// Системы симуляции generic по backend'у:
/// `apply_locomotion::<HeadlessBackend>` / `apply_locomotion::<RapierBackend>`.
pub trait PhysicsQueryBackend: Send + Sync + 'static {
    /// SystemParam, из которого строится query (ресурс трассы, Rapier context)
    type Param: SystemParam;

    /// Plugin, который интегрирует тела и наполняет ContactBuffer
    fn step_plugin() -> impl Plugin;

    /// Выдаёт `&dyn PhysicsQuery` на время замыкания
    fn with_query<R>(
        param: &SystemParamItem<'_, '_, Self::Param>,
        f: impl FnOnce(&dyn PhysicsQuery) -> R,
    ) -> R;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_geometry_never_hits() {
        assert!(NoGeometry.raycast(Vec3::ZERO, Vec3::NEG_Y, 100.0, None).is_none());
        assert!(!NoGeometry.ray_blocked(Vec3::ZERO, Vec3::X, 1.0, None));
    }

    #[test]
    fn test_fn_query_forwards_arguments() {
        let query = FnQuery(|origin: Vec3, direction: Vec3, max: f32, _exclude: Option<Entity>| {
            Some(RayHit {
                point: origin + direction * max,
                normal: Vec3::Y,
                distance: max,
                surface: None,
            })
        });

        let hit = query.raycast(Vec3::ZERO, Vec3::NEG_Y, 2.0, None).unwrap();
        assert_eq!(hit.point, Vec3::new(0.0, -2.0, 0.0));
        assert_eq!(hit.distance, 2.0);
    }
}
