//! LocomotionController: единственный писатель `CharacterBody`
//!
//! Два такта:
//! - frame tick (Update): `set_input`, `jump`, `dive_forward`, `rotate_towards` только
//!   защёлкивают намерения, `JumpDiveState` не трогают
//! - physics tick (FixedUpdate): `physics_tick` применяет всё к телу
//!
//! Окружение (`ExternalForces`) и ragdoll (`BodyCommand`) тоже проходят через physics tick.

use bevy::prelude::*;

use super::config::LocomotionConfig;
use super::jump_dive::JumpDiveState;
use super::step_assist::should_step_up;
use crate::components::{CharacterBody, CharacterShape, ExternalForces, ExternalPush, MovementIntent};
use crate::ground::{ContactBuffer, GroundContactTracker};
use crate::physics::PhysicsQuery;

/// Длина луча склона за ступнями
const SLOPE_RAY_EXTRA: f32 = 1.0;

/// Поворот по yaw, смотрящий вдоль `direction` (Bevy forward = -Z)
pub fn facing_rotation(direction: Vec3) -> Option<Quat> {
    let flat = Vec3::new(direction.x, 0.0, direction.z);
    if flat.length_squared() < 1e-6 {
        return None;
    }
    Some(Quat::from_rotation_y(f32::atan2(-flat.x, -flat.z)))
}

/// Только yaw-составляющая поворота
pub fn yaw_only(rotation: Quat) -> Quat {
    let (yaw, _, _) = rotation.to_euler(EulerRot::YXZ);
    Quat::from_rotation_y(yaw)
}

/// Правка тела от ragdoll manager'а
///
/// Несколько команд за тик сливаются через `merge`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Reflect)]
pub struct BodyCommand {
    /// Обнулить скорости (применяется первым)
    pub stop_momentum: bool,
    pub rotation_locked: Option<bool>,
    pub set_rotation: Option<Quat>,
    pub translate: Vec3,
    pub velocity_change: Vec3,
    pub angular_kick: Vec3,
}

impl BodyCommand {
    pub fn merge(&mut self, other: BodyCommand) {
        self.stop_momentum |= other.stop_momentum;
        self.rotation_locked = other.rotation_locked.or(self.rotation_locked);
        self.set_rotation = other.set_rotation.or(self.set_rotation);
        self.translate += other.translate;
        self.velocity_change += other.velocity_change;
        self.angular_kick += other.angular_kick;
    }

    fn apply(&self, body: &mut CharacterBody, transform: &mut Transform) {
        if self.stop_momentum {
            body.stop();
        }
        if let Some(locked) = self.rotation_locked {
            body.rotation_locked = locked;
        }
        if let Some(rotation) = self.set_rotation {
            transform.rotation = rotation;
        }
        body.pending_translation += self.translate;
        body.apply_velocity_change(self.velocity_change);
        body.angular_velocity += self.angular_kick;
    }
}

/// Окружение physics tick'а
pub struct PhysicsTickContext<'a> {
    pub dt: f32,
    pub gravity: Vec3,
    pub ground: &'a GroundContactTracker,
    pub shape: &'a CharacterShape,
    pub physics: &'a dyn PhysicsQuery,
    /// Своё тело (исключается из лучей)
    pub entity: Option<Entity>,
}

/// Что произошло за physics tick (для логов и тестов)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocomotionTick {
    pub jumped: bool,
    pub dived: bool,
    pub dive_rearmed: bool,
    pub jump_ready: bool,
    pub stepped_up: bool,
}

#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
#[require(CharacterBody, CharacterShape, GroundContactTracker, ContactBuffer, ExternalForces)]
pub struct LocomotionController {
    pub config: LocomotionConfig,
    /// Движение разрешено (снимается на подъём после ragdoll)
    pub can_move: bool,
    /// Ragdoll активен
    pub being_hit: bool,
    /// Подъём после ragdoll
    pub getting_up: bool,

    intent: MovementIntent,
    jump_dive: JumpDiveState,
    /// Ориентир проекции ввода (None = собственный yaw)
    movement_orientation: Option<Quat>,
    /// (направление, скорость поворота) до следующего physics tick
    facing_request: Option<(Vec3, f32)>,
    /// Нормаль пола на момент `jump()`
    pending_jump: Option<Vec3>,
    pending_dive_forward: bool,
    body_command: Option<BodyCommand>,
    on_slope: bool,
}

impl Default for LocomotionController {
    fn default() -> Self {
        Self::new(LocomotionConfig::default())
    }
}

impl LocomotionController {
    pub fn new(config: LocomotionConfig) -> Self {
        Self {
            config,
            can_move: true,
            being_hit: false,
            getting_up: false,
            intent: MovementIntent::default(),
            jump_dive: JumpDiveState::default(),
            movement_orientation: None,
            facing_request: None,
            pending_jump: None,
            pending_dive_forward: false,
            body_command: None,
            on_slope: false,
        }
    }

    pub fn intent(&self) -> MovementIntent {
        self.intent
    }

    pub fn jump_dive(&self) -> &JumpDiveState {
        &self.jump_dive
    }

    pub fn movement_orientation(&self) -> Option<Quat> {
        self.movement_orientation
    }

    /// Кэш последнего physics tick'а (для анимации)
    pub fn is_on_slope(&self) -> bool {
        self.on_slope
    }

    /// Ragdoll или подъём: locomotion не работает
    pub fn is_incapacitated(&self) -> bool {
        self.being_hit || self.getting_up
    }

    // ========================================================================
    // Frame tick операции
    // ========================================================================

    /// Оси ввода (зажимаются в [-1, 1]). Запрос dive сохраняется.
    pub fn set_input(&mut self, horizontal: f32, forward: f32) {
        let dive_requested = self.intent.dive_requested;
        self.intent = MovementIntent::new(horizontal, forward);
        self.intent.dive_requested = dive_requested;
    }

    pub fn request_dive(&mut self, requested: bool) {
        self.intent.dive_requested = requested;
    }

    /// Прыжок: только на земле и когда `ready_to_jump`
    ///
    /// Только защёлка: cooldown и импульс стартуют в physics tick.
    /// Повторный вызов до него или до конца cooldown: no-op.
    pub fn jump(&mut self, ground: &GroundContactTracker) -> bool {
        if self.pending_jump.is_some()
            || self.is_incapacitated()
            || !ground.is_grounded()
            || !self.jump_dive.ready_to_jump
        {
            return false;
        }

        self.pending_jump = Some(ground.floor_normal());
        true
    }

    /// Dive по направлению взгляда (раз на воздушное окно), защёлка до physics tick
    pub fn dive_forward(&mut self) -> bool {
        if self.pending_dive_forward || self.is_incapacitated() || !self.jump_dive.dive_ready() {
            return false;
        }

        self.pending_dive_forward = true;
        true
    }

    /// Поворот к направлению со скоростью `turn_speed` за секунду (slerp фактор)
    pub fn rotate_towards(&mut self, direction: Vec3, turn_speed: f32) {
        if facing_rotation(direction).is_none() {
            return;
        }
        self.facing_request = Some((direction, turn_speed));
    }

    pub fn set_movement_orientation(&mut self, orientation: Option<Quat>) {
        self.movement_orientation = orientation.map(yaw_only);
    }

    /// Нормаль пола под персонажем, если угол меньше max_slope_angle (ровный пол тоже склон)
    pub fn floor_slope(
        &self,
        center: Vec3,
        shape: &CharacterShape,
        physics: &dyn PhysicsQuery,
        exclude: Option<Entity>,
    ) -> Option<Vec3> {
        let hit = physics.raycast(center, Vec3::NEG_Y, shape.half_height + SLOPE_RAY_EXTRA, exclude)?;
        let angle = hit.normal.angle_between(Vec3::Y).to_degrees();
        (angle < self.config.max_slope_angle_deg).then_some(hit.normal)
    }

    pub fn on_slope(
        &self,
        center: Vec3,
        shape: &CharacterShape,
        physics: &dyn PhysicsQuery,
        exclude: Option<Entity>,
    ) -> bool {
        self.floor_slope(center, shape, physics, exclude).is_some()
    }

    // ========================================================================
    // Связь с ragdoll / ground
    // ========================================================================

    pub fn queue_body_command(&mut self, command: BodyCommand) {
        match self.body_command.as_mut() {
            Some(pending) => pending.merge(command),
            None => self.body_command = Some(command),
        }
    }

    /// Команда, ждущая следующего physics tick
    pub fn pending_body_command(&self) -> Option<BodyCommand> {
        self.body_command
    }

    /// Landed: сброс has_jumped, перевзвод dive если скорость позволяет
    pub fn on_landed(&mut self, speed: f32) -> bool {
        self.jump_dive.on_landed();
        speed <= self.config.dive_rearm_speed && self.jump_dive.rearm_dive(self.config.dive_settle_delay)
    }

    /// Конец восстановления: всё снова разрешено
    pub fn restore_after_recovery(&mut self) {
        self.jump_dive.restore();
        self.can_move = true;
        self.being_hit = false;
        self.getting_up = false;
        self.pending_jump = None;
        self.pending_dive_forward = false;
        self.facing_request = None;
    }

    /// Полный сброс (respawn)
    pub fn reset(&mut self) {
        *self = Self::new(self.config);
    }

    // ========================================================================
    // Physics tick
    // ========================================================================

    pub fn physics_tick(
        &mut self,
        body: &mut CharacterBody,
        transform: &mut Transform,
        external: &mut ExternalForces,
        ctx: &PhysicsTickContext,
    ) -> LocomotionTick {
        let mut report = LocomotionTick::default();

        for push in external.drain() {
            match push {
                ExternalPush::VelocityChange(delta) => body.apply_velocity_change(delta),
                ExternalPush::Acceleration(acceleration) => body.apply_acceleration(acceleration),
                ExternalPush::Carry(shift) => body.pending_translation += shift,
            }
        }

        if let Some(command) = self.body_command.take() {
            command.apply(body, transform);
        }

        // Защёлки frame tick'а: состояние прыжка меняется только здесь
        let incapacitated = self.is_incapacitated();
        let jump = self
            .pending_jump
            .take()
            .filter(|_| !incapacitated && self.jump_dive.ready_to_jump);
        if jump.is_some() {
            self.jump_dive.start_jump(self.config.jump_cooldown);
        }
        let dive = std::mem::take(&mut self.pending_dive_forward) && !incapacitated && self.jump_dive.dive_ready();
        if dive {
            self.jump_dive.start_dive(self.config.jump_cooldown);
        }

        report.jump_ready = self.jump_dive.tick(ctx.dt).jump_ready;

        if incapacitated {
            self.facing_request = None;
            self.on_slope = false;
            return report;
        }

        body.apply_acceleration(Vec3::NEG_Y * self.config.ground_bias_acceleration);

        if let Some(floor_normal) = jump {
            self.apply_jump_impulse(body, floor_normal);
            report.jumped = true;
        }
        if dive {
            self.apply_dive_impulse(body, transform);
            report.dived = true;
        }

        self.apply_facing(transform, ctx.dt);

        let grounded = ctx.ground.is_grounded();
        let slope_normal = if grounded {
            self.floor_slope(transform.translation, ctx.shape, ctx.physics, ctx.entity)
        } else {
            None
        };
        self.on_slope = slope_normal.is_some();

        // Без can_move нет ни силы ввода, ни торможения: скорость держит физика
        if self.can_move {
            self.apply_move_force(body, transform, grounded, slope_normal, ctx.gravity);
            report.stepped_up = self.apply_step_assist(body, transform, ctx);
            self.apply_braking(body, ctx.dt);
        }

        let (rearmed, dived) = self.process_dive(body, transform, grounded);
        report.dive_rearmed = rearmed;
        report.dived |= dived;

        report
    }

    /// Базис ввода: (forward, right) по горизонтали
    fn input_basis(&self, transform: &Transform) -> (Vec3, Vec3) {
        let basis = self.movement_orientation.unwrap_or_else(|| yaw_only(transform.rotation));
        (basis * Vec3::NEG_Z, basis * Vec3::X)
    }

    fn input_direction(&self, transform: &Transform) -> Vec3 {
        let (forward, right) = self.input_basis(transform);
        forward * self.intent.forward + right * self.intent.horizontal
    }

    fn apply_jump_impulse(&self, body: &mut CharacterBody, floor_normal: Vec3) {
        if body.linear_velocity.y < 0.5 {
            body.linear_velocity.y = 0.0;
        } else {
            body.linear_velocity.y *= 0.5;
        }

        let share = self.config.jump_vertical_share;
        let jump = self.config.jump_speed;
        body.apply_velocity_change(Vec3::Y * jump * share + floor_normal * jump * (1.0 - share));
    }

    fn apply_dive_impulse(&self, body: &mut CharacterBody, transform: &Transform) {
        let forward = yaw_only(transform.rotation) * Vec3::NEG_Z;

        let delta = if self.config.use_dive_momentum {
            let speed = body.speed();
            let momentum = if speed < self.config.dive_momentum_speed_threshold { 1.0 } else { 0.5 };
            forward * speed * momentum * self.config.dive_momentum_gain
        } else {
            forward * self.config.dive_speed
        };
        body.apply_velocity_change(delta);
    }

    fn apply_facing(&mut self, transform: &mut Transform, dt: f32) {
        let Some((direction, turn_speed)) = self.facing_request.take() else {
            return;
        };
        let Some(target) = facing_rotation(direction) else {
            return;
        };
        let factor = (turn_speed * dt).clamp(0.0, 1.0);
        transform.rotation = transform.rotation.slerp(target, factor).normalize();
    }

    fn apply_move_force(
        &self,
        body: &mut CharacterBody,
        transform: &Transform,
        grounded: bool,
        slope_normal: Option<Vec3>,
        gravity: Vec3,
    ) {
        let config = &self.config;
        let (forward, right) = self.input_basis(transform);

        let surface_velocity = match slope_normal {
            Some(normal) => body.linear_velocity.reject_from_normalized(normal),
            None => body.horizontal_velocity(),
        };
        let surface_speed = surface_velocity.length();
        if surface_speed > config.max_speed {
            return;
        }

        // Покомпонентный cap: не разгоняемся по оси, которая уже на пределе
        let along_right = body.linear_velocity.dot(right);
        let along_forward = body.linear_velocity.dot(forward);
        let mut x = self.intent.horizontal;
        let mut y = self.intent.forward;
        if (x > 0.0 && along_right > config.max_speed) || (x < 0.0 && along_right < -config.max_speed) {
            x = 0.0;
        }
        if (y > 0.0 && along_forward > config.max_speed) || (y < 0.0 && along_forward < -config.max_speed) {
            y = 0.0;
        }

        let input = forward * y + right * x;
        if input.length_squared() <= 0.01 {
            return;
        }
        if grounded && self.jump_dive.is_jumping {
            return;
        }

        let magnitude = input.length().min(1.0);
        let mut direction = input.normalize();
        let mut multiplier = if grounded { 1.0 } else { config.air_control };

        if let Some(normal) = slope_normal {
            direction = direction.reject_from_normalized(normal).normalize_or_zero();
            multiplier *= config.slope_speed_multiplier;

            if config.slope_gravity_compensation > 0.0 {
                let downhill = gravity.reject_from_normalized(normal);
                body.apply_acceleration(-downhill * config.slope_gravity_compensation);
            }
        }

        body.apply_acceleration(direction * config.move_acceleration * magnitude * multiplier);
    }

    fn apply_braking(&self, body: &mut CharacterBody, dt: f32) {
        if self.intent.forward.abs() >= self.config.brake_input_threshold {
            return;
        }

        let horizontal = body.horizontal_velocity();
        let speed = horizontal.length();
        if speed > self.config.min_stop_speed {
            // Не тормозим сильнее, чем до нуля за тик
            let deceleration = self.config.stop_deceleration.min(speed / dt.max(1e-6));
            body.apply_acceleration(-horizontal / speed * deceleration);
        } else {
            body.linear_velocity.x = 0.0;
            body.linear_velocity.z = 0.0;
        }
    }

    fn apply_step_assist(&self, body: &mut CharacterBody, transform: &Transform, ctx: &PhysicsTickContext) -> bool {
        if !ctx.ground.is_grounded() || self.jump_dive.is_jumping || self.intent.axes().length() < 0.1 {
            return false;
        }

        let direction = self.input_direction(transform);
        let feet = ctx.shape.feet(transform.translation);
        if !should_step_up(ctx.physics, feet, direction, ctx.shape.radius, &self.config, ctx.entity) {
            return false;
        }

        body.pending_translation += Vec3::Y * self.config.step_smooth * ctx.dt;
        true
    }

    /// Перевзвод и запрос dive. Возвращает (rearmed, dived).
    fn process_dive(&mut self, body: &mut CharacterBody, transform: &Transform, grounded: bool) -> (bool, bool) {
        let rearmed = grounded
            && body.speed() <= self.config.dive_rearm_speed
            && self.jump_dive.rearm_dive(self.config.dive_settle_delay);

        if !self.intent.dive_requested || grounded || !self.jump_dive.dive_ready() {
            return (rearmed, false);
        }

        self.apply_dive_impulse(body, transform);
        self.jump_dive.start_dive(self.config.jump_cooldown);
        self.intent.dive_requested = false;
        (rearmed, true)
    }
}
