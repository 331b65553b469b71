//! Intent и внешние воздействия: то, что frame tick и окружение отдают в physics tick

use bevy::prelude::*;

/// MovementIntent: оси ввода + запрос dive
///
/// Пишется раз за frame tick (бот или player adapter) через
/// `LocomotionController::set_input`. Physics tick только читает.
#[derive(Debug, Clone, Copy, Default, PartialEq, Reflect)]
pub struct MovementIntent {
    /// Горизонтальная ось (strafe), [-1, 1]
    pub horizontal: f32,
    /// Ось вперёд/назад, [-1, 1]
    pub forward: f32,
    /// Latch запроса dive (потребляется только в воздухе)
    pub dive_requested: bool,
}

impl MovementIntent {
    pub fn new(horizontal: f32, forward: f32) -> Self {
        Self {
            horizontal: horizontal.clamp(-1.0, 1.0),
            forward: forward.clamp(-1.0, 1.0),
            dive_requested: false,
        }
    }

    pub fn axes(&self) -> Vec2 {
        Vec2::new(self.horizontal, self.forward)
    }

    pub fn is_zero(&self) -> bool {
        self.axes().length_squared() <= f32::EPSILON
    }
}

/// Внешнее воздействие на тело от окружения (батут, бампер, вентилятор)
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub enum ExternalPush {
    /// Мгновенное изменение скорости (m/s)
    VelocityChange(Vec3),
    /// Ускорение на этот тик (m/s²)
    Acceleration(Vec3),
    /// Кинематический перенос (движущаяся платформа), метры за тик
    Carry(Vec3),
}

/// Очередь внешних воздействий за тик
///
/// Окружение не пишет в `CharacterBody` напрямую: всё складывается сюда
/// и применяется locomotion controller'ом (единственный писатель тела).
#[derive(Component, Debug, Clone, Default, Reflect)]
#[reflect(Component)]
pub struct ExternalForces {
    pub pushes: Vec<ExternalPush>,
}

impl ExternalForces {
    pub fn push(&mut self, push: ExternalPush) {
        self.pushes.push(push);
    }

    pub fn drain(&mut self) -> std::vec::Drain<'_, ExternalPush> {
        self.pushes.drain(..)
    }
}
