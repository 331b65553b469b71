//! Animation module
//!
//! Симуляция не знает про анимационный граф хоста: она только выставляет
//! именованные параметры через `AnimationSink`. `AnimatorParams`: sink по
//! умолчанию (ECS компонент), хост читает его по `Changed<AnimatorParams>`.

use bevy::prelude::*;

use crate::ground::GroundContactTracker;
use crate::locomotion::LocomotionController;
use crate::SimulationSet;

/// Bool параметры аниматора
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimBool {
    Jump,
    Fall,
    Incline,
    DiveStart,
    GetUp,
}

impl AnimBool {
    /// Имя параметра в графе хоста
    pub fn name(&self) -> &'static str {
        match self {
            AnimBool::Jump => "Jump",
            AnimBool::Fall => "Fall",
            AnimBool::Incline => "Incline",
            AnimBool::DiveStart => "DiveStart",
            AnimBool::GetUp => "GetUp",
        }
    }
}

/// Float параметры аниматора (blend tree движения)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimFloat {
    Horizontal,
    Vertical,
}

impl AnimFloat {
    pub fn name(&self) -> &'static str {
        match self {
            AnimFloat::Horizontal => "horizontal",
            AnimFloat::Vertical => "vertical",
        }
    }
}

/// Приёмник параметров анимации
pub trait AnimationSink {
    fn set_bool(&mut self, param: AnimBool, value: bool);
    /// `dt`: для сглаживания на стороне sink'а
    fn set_float(&mut self, param: AnimFloat, value: f32, dt: f32);
}

/// Снимок состояния персонажа для анимации
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AnimationInputs {
    pub has_jumped: bool,
    pub ready_to_jump: bool,
    pub grounded: bool,
    pub on_slope: bool,
    pub can_dive: bool,
    pub getting_up: bool,
    pub axes: Vec2,
}

impl AnimationInputs {
    pub fn capture(controller: &LocomotionController, ground: &GroundContactTracker) -> Self {
        let jump_dive = controller.jump_dive();
        Self {
            has_jumped: jump_dive.has_jumped,
            ready_to_jump: jump_dive.ready_to_jump,
            grounded: ground.is_grounded(),
            on_slope: controller.is_on_slope(),
            can_dive: jump_dive.can_dive,
            getting_up: controller.getting_up,
            axes: controller.intent().axes(),
        }
    }
}

/// Состояние → параметры
///
/// Fall: в воздухе и готов к прыжку (падение без прыжка или после cooldown),
/// на земле снимается, иначе остаётся как был.
pub fn push_animation(sink: &mut impl AnimationSink, inputs: &AnimationInputs, dt: f32) {
    sink.set_bool(AnimBool::Jump, inputs.has_jumped);
    if inputs.ready_to_jump && !inputs.grounded {
        sink.set_bool(AnimBool::Fall, true);
    } else if inputs.grounded {
        sink.set_bool(AnimBool::Fall, false);
    }
    sink.set_bool(AnimBool::Incline, !inputs.on_slope);
    sink.set_bool(AnimBool::DiveStart, !inputs.can_dive);
    sink.set_bool(AnimBool::GetUp, inputs.getting_up);
    sink.set_float(AnimFloat::Horizontal, inputs.axes.x, dt);
    sink.set_float(AnimFloat::Vertical, inputs.axes.y, dt);
}

/// Параметры аниматора персонажа
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct AnimatorParams {
    pub jump: bool,
    pub fall: bool,
    pub incline: bool,
    pub dive_start: bool,
    pub get_up: bool,
    pub horizontal: f32,
    pub vertical: f32,
    /// Время сглаживания float параметров (0 = мгновенно)
    pub float_damp_time: f32,
}

impl Default for AnimatorParams {
    fn default() -> Self {
        Self {
            jump: false,
            fall: false,
            incline: true,
            dive_start: false,
            get_up: false,
            horizontal: 0.0,
            vertical: 0.0,
            float_damp_time: 0.05,
        }
    }
}

impl AnimationSink for AnimatorParams {
    fn set_bool(&mut self, param: AnimBool, value: bool) {
        let slot = match param {
            AnimBool::Jump => &mut self.jump,
            AnimBool::Fall => &mut self.fall,
            AnimBool::Incline => &mut self.incline,
            AnimBool::DiveStart => &mut self.dive_start,
            AnimBool::GetUp => &mut self.get_up,
        };
        *slot = value;
    }

    fn set_float(&mut self, param: AnimFloat, value: f32, dt: f32) {
        let slot = match param {
            AnimFloat::Horizontal => &mut self.horizontal,
            AnimFloat::Vertical => &mut self.vertical,
        };
        if self.float_damp_time <= 0.0 || dt <= 0.0 {
            *slot = value;
            return;
        }

        let blend = 1.0 - (-dt / self.float_damp_time).exp();
        *slot += (value - *slot) * blend;
        if (*slot - value).abs() < 1e-3 {
            *slot = value;
        }
    }
}

/// Система: controller → AnimatorParams
///
/// `set_if_neq`: Changed<AnimatorParams> срабатывает только при реальной смене.
pub fn update_animator_params(
    time: Res<Time>,
    mut query: Query<(&LocomotionController, &GroundContactTracker, &mut AnimatorParams)>,
) {
    let dt = time.delta_secs();

    for (controller, ground, mut params) in query.iter_mut() {
        let inputs = AnimationInputs::capture(controller, ground);
        let mut next = *params;
        push_animation(&mut next, &inputs, dt);
        params.set_if_neq(next);
    }
}

/// Animation Plugin
pub struct AnimationPlugin;

impl Plugin for AnimationPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<AnimatorParams>();

        app.add_systems(Update, update_animator_params.in_set(SimulationSet::Animate));
    }
}
