//! Cooldown-gated defensive ability (the "shield")
//!
//! Charges are finite and never regenerate mid-session. Activation is refused
//! while active, while cooling down, or with no charges left; a refused
//! activation leaves every field untouched.

use serde::{Deserialize, Serialize};

use super::state::{GameEvent, Session};

/// Ability balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityTuning {
    pub charges: u32,
    pub duration_ms: u64,
    pub cooldown_ms: u64,
}

impl Default for AbilityTuning {
    fn default() -> Self {
        Self {
            charges: 2,
            duration_ms: 3000,
            cooldown_ms: 5000,
        }
    }
}

/// What changed during a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbilityTransition {
    /// Active window ran out, cooldown started
    Ended,
    /// Cooldown finished with charges remaining
    Ready,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ability {
    pub charges: u32,
    pub active_remaining_ms: u64,
    pub cooldown_remaining_ms: u64,
    duration_ms: u64,
    cooldown_ms: u64,
}

impl Ability {
    pub fn new(tuning: &AbilityTuning) -> Self {
        Self {
            charges: tuning.charges,
            active_remaining_ms: 0,
            cooldown_remaining_ms: 0,
            duration_ms: tuning.duration_ms,
            cooldown_ms: tuning.cooldown_ms,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active_remaining_ms > 0
    }

    /// A zero-length ability is never ready, so it cannot eat charges
    pub fn is_ready(&self) -> bool {
        self.charges > 0
            && self.duration_ms > 0
            && !self.is_active()
            && self.cooldown_remaining_ms == 0
    }

    /// Try to activate; returns false (and changes nothing) when not ready
    pub fn activate(&mut self) -> bool {
        if !self.is_ready() {
            return false;
        }
        self.charges -= 1;
        self.active_remaining_ms = self.duration_ms;
        true
    }

    /// Count both timers down by `dt_ms`
    pub fn tick(&mut self, dt_ms: u64) -> Option<AbilityTransition> {
        // Cooldown first so a cooldown started this tick keeps its full length
        if self.cooldown_remaining_ms > 0 {
            self.cooldown_remaining_ms = self.cooldown_remaining_ms.saturating_sub(dt_ms);
            if self.cooldown_remaining_ms == 0 && self.charges > 0 {
                return Some(AbilityTransition::Ready);
            }
        }

        if self.active_remaining_ms > 0 {
            self.active_remaining_ms = self.active_remaining_ms.saturating_sub(dt_ms);
            if self.active_remaining_ms == 0 {
                self.cooldown_remaining_ms = self.cooldown_ms;
                return Some(AbilityTransition::Ended);
            }
        }

        None
    }

    pub fn status(&self) -> AbilityStatus {
        AbilityStatus {
            charges: self.charges,
            active: self.is_active(),
            ready: self.is_ready(),
            active_remaining_ms: self.active_remaining_ms,
            cooldown_remaining_ms: self.cooldown_remaining_ms,
        }
    }
}

/// HUD view of the ability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AbilityStatus {
    pub charges: u32,
    pub active: bool,
    pub ready: bool,
    pub active_remaining_ms: u64,
    pub cooldown_remaining_ms: u64,
}

/// Player intent: activate the ability. No-op outside `Playing`.
pub fn activate_ability(session: &mut Session) -> bool {
    if !session.is_playing() {
        return false;
    }
    if !session.ability.activate() {
        log::debug!("Ability activation refused: {:?}", session.ability.status());
        return false;
    }
    session.push_event(GameEvent::AbilityActivated {
        charges_left: session.ability.charges,
    });
    true
}

/// Master clock hook
pub(crate) fn tick_ability(session: &mut Session, dt_ms: u64) {
    match session.ability.tick(dt_ms) {
        Some(AbilityTransition::Ended) => session.push_event(GameEvent::AbilityEnded),
        Some(AbilityTransition::Ready) => session.push_event(GameEvent::AbilityReady),
        None => {}
    }
}
