//! Deadline-таймеры вместо корутин
//!
//! Каждая задержка (cooldown прыжка, settle после dive, ragdoll): это поле
//! `Countdown`, которое опрашивается один раз за тик. Отмена = `cancel()`,
//! перезапуск = повторный `start()`.

use bevy::prelude::*;

/// Допуск на накопление ошибки f32 (120 тиков по 1/60 ≠ ровно 2.0)
const DEADLINE_EPSILON: f32 = 1e-4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Reflect)]
pub struct Countdown {
    remaining: Option<f32>,
}

impl Countdown {
    pub fn started(duration: f32) -> Self {
        let mut countdown = Self::default();
        countdown.start(duration);
        countdown
    }

    /// Запуск (или перезапуск) на `duration` секунд
    pub fn start(&mut self, duration: f32) {
        self.remaining = Some(duration.max(0.0));
    }

    pub fn cancel(&mut self) {
        self.remaining = None;
    }

    pub fn is_running(&self) -> bool {
        self.remaining.is_some()
    }

    pub fn remaining(&self) -> Option<f32> {
        self.remaining
    }

    /// Продвигает таймер на `dt`. Возвращает `true` ровно на тике срабатывания.
    pub fn tick(&mut self, dt: f32) -> bool {
        let Some(remaining) = self.remaining.as_mut() else {
            return false;
        };

        *remaining -= dt;
        if *remaining <= DEADLINE_EPSILON {
            self.remaining = None;
            return true;
        }
        false
    }
}
