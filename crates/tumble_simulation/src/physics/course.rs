//! Аналитическая геометрия трассы для headless backend
//!
//! Трасса = набор oriented boxes (пол, рампы, ступени, платформы).
//! Лучи через slab test в локальном пространстве бокса, контакты капсулы
//! через три сферы вдоль её оси.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::query::{PhysicsQuery, RayHit};
use crate::components::CollisionLayer;

/// Индекс solid'а в `CourseGeometry`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Reflect, Serialize, Deserialize)]
pub struct SolidId(pub u32);

/// Oriented box трассы
#[derive(Debug, Clone, Copy, Reflect, Serialize, Deserialize)]
pub struct CourseSolid {
    pub center: Vec3,
    pub half_extents: Vec3,
    pub rotation: Quat,
    pub layer: CollisionLayer,
    /// Entity-владелец (платформа, бампер), если есть
    #[serde(skip)]
    pub owner: Option<Entity>,
    /// Сдвиг за последний physics tick (moving platforms)
    #[serde(skip)]
    pub last_displacement: Vec3,
}

/// Контакт сферы с solid'ом
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolidContact {
    pub solid: SolidId,
    /// Нормаль от поверхности к сфере
    pub normal: Vec3,
    /// Глубина проникновения
    pub depth: f32,
}

impl CourseSolid {
    pub fn cuboid(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            center,
            half_extents: half_extents.abs(),
            rotation: Quat::IDENTITY,
            layer: CollisionLayer::Ground,
            owner: None,
            last_displacement: Vec3::ZERO,
        }
    }

    /// Рампа: бокс, наклонённый вокруг оси X на `angle_deg` (поверхность поднимается вдоль +Z)
    pub fn ramp(center: Vec3, half_extents: Vec3, angle_deg: f32) -> Self {
        Self::cuboid(center, half_extents).with_rotation(Quat::from_rotation_x(-angle_deg.to_radians()))
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation.normalize();
        self
    }

    pub fn with_layer(mut self, layer: CollisionLayer) -> Self {
        self.layer = layer;
        self
    }

    pub fn with_owner(mut self, owner: Entity) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn to_local(&self, point: Vec3) -> Vec3 {
        self.rotation.inverse() * (point - self.center)
    }

    pub fn to_world(&self, local: Vec3) -> Vec3 {
        self.center + self.rotation * local
    }

    pub fn contains(&self, point: Vec3) -> bool {
        let local = self.to_local(point);
        local.abs().cmple(self.half_extents).all()
    }

    /// Верхняя грань по Y в точке (x, z) для горизонтальных боксов
    pub fn top(&self) -> f32 {
        self.center.y + self.half_extents.y
    }

    /// Slab test. Луч, стартующий внутри бокса, этот бокс не видит.
    pub fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<(f32, Vec3)> {
        let inverse = self.rotation.inverse();
        let local_origin = inverse * (origin - self.center);
        let local_dir = inverse * direction;

        let mut t_enter = f32::NEG_INFINITY;
        let mut t_exit = f32::INFINITY;
        let mut enter_normal = Vec3::ZERO;

        for axis in 0..3 {
            let o = local_origin[axis];
            let d = local_dir[axis];
            let h = self.half_extents[axis];

            if d.abs() < 1e-8 {
                if o.abs() > h {
                    return None;
                }
                continue;
            }

            let t_near = (-h - o) / d;
            let t_far = (h - o) / d;
            // Входим через грань, противоположную направлению луча
            let (t0, t1, sign) = if t_near < t_far {
                (t_near, t_far, -1.0)
            } else {
                (t_far, t_near, 1.0)
            };

            if t0 > t_enter {
                t_enter = t0;
                enter_normal = Vec3::ZERO;
                enter_normal[axis] = sign;
            }
            t_exit = t_exit.min(t1);
        }

        if t_enter < 0.0 || t_enter > t_exit || t_enter > max_distance {
            return None;
        }

        Some((t_enter, self.rotation * enter_normal))
    }

    /// Контакт сферы с боксом (None если не пересекаются)
    pub fn sphere_contact(&self, id: SolidId, center: Vec3, radius: f32) -> Option<SolidContact> {
        let local = self.to_local(center);
        let clamped = local.clamp(-self.half_extents, self.half_extents);
        let offset = local - clamped;
        let distance = offset.length();

        if distance > 1e-6 {
            if distance >= radius {
                return None;
            }
            return Some(SolidContact {
                solid: id,
                normal: self.rotation * (offset / distance),
                depth: radius - distance,
            });
        }

        // Центр внутри бокса: выталкиваем через ближайшую грань
        let face_distance = self.half_extents - local.abs();
        let axis = if face_distance.x <= face_distance.y && face_distance.x <= face_distance.z {
            0
        } else if face_distance.y <= face_distance.z {
            1
        } else {
            2
        };
        let mut normal = Vec3::ZERO;
        normal[axis] = if local[axis] >= 0.0 { 1.0 } else { -1.0 };

        Some(SolidContact {
            solid: id,
            normal: self.rotation * normal,
            depth: face_distance[axis] + radius,
        })
    }
}

/// Вся статическая + подвижная геометрия трассы
#[derive(Resource, Debug, Clone, Default, Serialize, Deserialize)]
pub struct CourseGeometry {
    solids: Vec<CourseSolid>,
}

impl CourseGeometry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Плоский пол `half_size` x `half_size` с верхом на y = 0
    pub fn flat_ground(half_size: f32) -> Self {
        let mut course = Self::new();
        course.add(CourseSolid::cuboid(
            Vec3::new(0.0, -0.5, 0.0),
            Vec3::new(half_size, 0.5, half_size),
        ));
        course
    }

    pub fn add(&mut self, solid: CourseSolid) -> SolidId {
        self.solids.push(solid);
        SolidId(self.solids.len() as u32 - 1)
    }

    pub fn with_solid(mut self, solid: CourseSolid) -> Self {
        self.add(solid);
        self
    }

    pub fn get(&self, id: SolidId) -> Option<&CourseSolid> {
        self.solids.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: SolidId) -> Option<&mut CourseSolid> {
        self.solids.get_mut(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.solids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SolidId, &CourseSolid)> {
        self.solids
            .iter()
            .enumerate()
            .map(|(index, solid)| (SolidId(index as u32), solid))
    }

    /// Все твёрдые контакты сферы (triggers не участвуют)
    pub fn sphere_contacts(&self, center: Vec3, radius: f32) -> Vec<SolidContact> {
        self.iter()
            .filter(|(_, solid)| solid.layer != CollisionLayer::Trigger)
            .filter_map(|(id, solid)| solid.sphere_contact(id, center, radius))
            .collect()
    }

    /// Переместить solid в новую позицию, запомнив сдвиг за тик
    pub fn move_solid(&mut self, id: SolidId, new_center: Vec3) {
        if let Some(solid) = self.get_mut(id) {
            solid.last_displacement = new_center - solid.center;
            solid.center = new_center;
        }
    }

    /// Повернуть solid вокруг его центра (вращающиеся препятствия)
    pub fn rotate_solid(&mut self, id: SolidId, rotation: Quat) {
        if let Some(solid) = self.get_mut(id) {
            solid.rotation = rotation.normalize();
        }
    }
}

impl PhysicsQuery for CourseGeometry {
    fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32, exclude: Option<Entity>) -> Option<RayHit> {
        let direction = direction.normalize_or_zero();
        if direction == Vec3::ZERO || max_distance <= 0.0 {
            return None;
        }

        let mut best: Option<RayHit> = None;
        for (_, solid) in self.iter() {
            if solid.layer == CollisionLayer::Trigger {
                continue;
            }
            if exclude.is_some() && solid.owner == exclude {
                continue;
            }
            let Some((distance, normal)) = solid.raycast(origin, direction, max_distance) else {
                continue;
            };
            if best.map_or(true, |hit| distance < hit.distance) {
                best = Some(RayHit {
                    point: origin + direction * distance,
                    normal,
                    distance,
                    surface: solid.owner,
                });
            }
        }
        best
    }
}
