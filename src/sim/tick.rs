//! Session clock and state machine
//!
//! `advance_clock` is the master clock task: it ticks the ability and slow
//! motion, moves everything, runs impact detection and wave checkpoints, then
//! checks the end conditions. Nothing here runs once the session is terminal.

use super::ability::tick_ability;
use super::impact::detect_impacts;
use super::motion::move_all;
use super::state::{EndReason, GameEvent, GamePhase, Session};
use super::wave::advance_waves;
use crate::tuning::WinCondition;

/// Enter `Playing` with a fresh session (also restarts a running or finished one)
pub fn start_game(session: &mut Session) {
    if session.is_playing() {
        log::info!("Restarting '{}' mid-session", session.tuning.game_id);
    }
    session.reset();
    session.phase = GamePhase::Playing;
    log::info!(
        "Game '{}' started (seed {})",
        session.tuning.game_id,
        session.seed
    );
    session.push_event(GameEvent::Started);
}

/// Advance the session clock by `dt_ms`
pub fn advance_clock(session: &mut Session, dt_ms: u64) {
    if !session.is_playing() || dt_ms == 0 {
        return;
    }

    session.clock_ms += dt_ms;
    tick_ability(session, dt_ms);

    move_all(session, dt_ms);
    if session.slow_motion_remaining_ms > 0 {
        session.slow_motion_remaining_ms = session.slow_motion_remaining_ms.saturating_sub(dt_ms);
        if session.slow_motion_remaining_ms == 0 {
            session.push_event(GameEvent::SlowMotionEnded);
        }
    }

    detect_impacts(session);
    advance_waves(session);
    check_time_warning(session);
    check_invariants(session);
    check_end_conditions(session);
}

fn check_time_warning(session: &mut Session) {
    let (Some(remaining), Some(warn_at)) = (session.time_remaining_ms(), session.tuning.time_warning_ms) else {
        return;
    };
    if !session.time_warned && remaining > 0 && remaining <= warn_at {
        session.time_warned = true;
        session.push_event(GameEvent::TimeWarning);
    }
}

/// Live entities must never exceed the spawner cap
fn check_invariants(session: &mut Session) {
    let max = session.tuning.spawner.max_entities;
    let live = session.entities.len();
    debug_assert!(live <= max, "{} live entities exceed cap {}", live, max);
    if live > max {
        log::error!("{} live entities exceed cap {}; ending session", live, max);
        finish(session, EndReason::InvariantViolation);
    }
}

/// Apply loss, win and clock conditions in that order
pub(crate) fn check_end_conditions(session: &mut Session) {
    if !session.is_playing() {
        return;
    }

    if session.tuning.health.is_some() && session.health == 0 {
        finish(session, EndReason::HealthDepleted);
        return;
    }
    if let Some(max) = session.tuning.max_impacts {
        if session.stats.impacts > max {
            finish(session, EndReason::TooManyImpacts);
            return;
        }
    }

    let target_reached = match session.tuning.win {
        WinCondition::ScoreAtLeast(target) => session.score >= target,
        WinCondition::HandledAtLeast(target) => session.stats.correct >= target,
        WinCondition::Survive => false,
    };
    if target_reached {
        finish(session, EndReason::TargetReached);
        return;
    }

    if session.time_remaining_ms() == Some(0) {
        let reason = if session.tuning.win == WinCondition::Survive {
            EndReason::Survived
        } else {
            EndReason::TimeExpired
        };
        finish(session, reason);
    }
}

/// Terminal transition. Only the first call from `Playing` has any effect.
pub(crate) fn finish(session: &mut Session, reason: EndReason) {
    if !session.is_playing() {
        return;
    }

    let won = reason.is_win();
    session.phase = if won { GamePhase::Won } else { GamePhase::Lost };
    session.end_reason = Some(reason);

    session.stats.max_combo = session.max_combo;
    session.stats.final_wave = session.wave;
    session.stats.time_played_ms = session.clock_ms;

    session.entities.clear();
    session.power_ups.clear();
    session.slow_motion_remaining_ms = 0;

    log::info!(
        "Game '{}' over ({:?}): score {}, wave {}, max combo {}",
        session.tuning.game_id,
        reason,
        session.score,
        session.wave,
        session.max_combo
    );
    session.push_event(GameEvent::GameOver {
        won,
        reason,
        score: session.score,
    });
}
