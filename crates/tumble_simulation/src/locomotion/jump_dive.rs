//! Jump / dive state machine
//!
//! Флаги живут в одной структуре, переходы только через методы:
//! - прыжок: ready_to_jump → (cooldown) → ready_to_jump
//! - dive: can_dive → (земля + скорость ≤ rearm) → can_dive, затем settle → wait_delay снят

use bevy::prelude::*;

use crate::components::Countdown;

/// Что сработало за тик таймеров
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JumpDiveTimers {
    pub jump_ready: bool,
    pub dive_settled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct JumpDiveState {
    /// Можно прыгать (снимается на cooldown)
    pub ready_to_jump: bool,
    /// Прыжок/dive был, ещё не приземлились
    pub has_jumped: bool,
    /// Прыжок в процессе (блокирует ground-движение и step-up)
    pub is_jumping: bool,
    /// Dive взведён
    pub can_dive: bool,
    /// Settle после перевзвода ещё не прошёл
    pub wait_delay: bool,
    jump_reset: Countdown,
    dive_settle: Countdown,
}

impl Default for JumpDiveState {
    fn default() -> Self {
        Self {
            ready_to_jump: true,
            has_jumped: false,
            is_jumping: false,
            can_dive: true,
            wait_delay: false,
            jump_reset: Countdown::default(),
            dive_settle: Countdown::default(),
        }
    }
}

impl JumpDiveState {
    pub fn start_jump(&mut self, cooldown: f32) {
        self.ready_to_jump = false;
        self.has_jumped = true;
        self.is_jumping = true;
        self.jump_reset.start(cooldown);
    }

    /// Dive: тратит заряд и блокирует прыжок на cooldown
    pub fn start_dive(&mut self, cooldown: f32) {
        self.has_jumped = true;
        self.can_dive = false;
        self.wait_delay = true;
        self.ready_to_jump = false;
        self.jump_reset.start(cooldown);
    }

    /// Перевзвод dive. `false` если уже взведён.
    pub fn rearm_dive(&mut self, settle_delay: f32) -> bool {
        if self.can_dive {
            return false;
        }
        self.can_dive = true;
        self.dive_settle.start(settle_delay);
        true
    }

    pub fn on_landed(&mut self) {
        self.has_jumped = false;
    }

    /// Продвигает cooldown'ы на dt
    pub fn tick(&mut self, dt: f32) -> JumpDiveTimers {
        let mut fired = JumpDiveTimers::default();

        if self.jump_reset.tick(dt) {
            self.ready_to_jump = true;
            self.is_jumping = false;
            fired.jump_ready = true;
        }
        if self.dive_settle.tick(dt) {
            self.wait_delay = false;
            fired.dive_settled = true;
        }

        fired
    }

    /// Полное восстановление после ragdoll / respawn
    pub fn restore(&mut self) {
        *self = Self::default();
    }

    pub fn dive_ready(&self) -> bool {
        self.can_dive && !self.wait_delay
    }

    pub fn jump_cooldown_remaining(&self) -> Option<f32> {
        self.jump_reset.remaining()
    }
}
