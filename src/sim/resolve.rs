//! Action resolution and scoring
//!
//! Player intents are judged against the target's template. Score is always
//! floored at zero; every deduction goes through `apply_penalty`.

use serde::{Deserialize, Serialize};

use super::entity::{Action, PowerUpEffect};
use super::state::{GameEvent, Session, SpeedBonus};
use super::tick::check_end_conditions;

/// What happens to an entity after a wrong action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WrongActionPolicy {
    /// Entity stays on the field for another try
    #[default]
    Soft,
    /// Entity is removed
    Consume,
}

/// Combo multiplier step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComboTier {
    pub min_combo: u32,
    pub multiplier: f32,
}

impl ComboTier {
    pub fn default_table() -> Vec<ComboTier> {
        [(3, 1.5), (5, 2.0), (7, 2.5), (10, 3.0)]
            .into_iter()
            .map(|(min_combo, multiplier)| ComboTier {
                min_combo,
                multiplier,
            })
            .collect()
    }
}

/// Multiplier for a combo count (1.0 below the first tier)
pub fn multiplier_for(tiers: &[ComboTier], combo: u32) -> f32 {
    tiers
        .iter()
        .rev()
        .find(|t| combo >= t.min_combo)
        .map(|t| t.multiplier)
        .unwrap_or(1.0)
}

/// Point values and penalties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringTuning {
    /// Response under this earns `fast_bonus`
    pub fast_ms: u64,
    pub fast_bonus: u32,
    /// Response under this earns `very_fast_bonus` instead
    pub very_fast_ms: u64,
    pub very_fast_bonus: u32,
    pub critical_bonus: u32,
    pub wrong_penalty: u32,
    #[serde(default)]
    pub expiry_penalty: u32,
    #[serde(default)]
    pub impact_penalty: u32,
    #[serde(default)]
    pub wrong_action: WrongActionPolicy,
    pub combo_tiers: Vec<ComboTier>,
    /// Every Nth combo triggers slow motion
    #[serde(default)]
    pub slow_motion_every_combo: Option<u32>,
}

/// Result of `resolve_action`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Not playing, or no such entity
    Ignored,
    /// Target only yields while the ability is active
    NeedsAbility,
    Correct { points: u64 },
    Wrong { penalty: u64, consumed: bool },
}

/// Subtract from the score, flooring at zero. Returns the amount actually taken.
pub(crate) fn apply_penalty(session: &mut Session, penalty: u32) -> u64 {
    let taken = session.score.min(penalty as u64);
    session.score -= taken;
    taken
}

/// Reset the streak, emitting `ComboLost` if there was one
pub(crate) fn break_combo(session: &mut Session) {
    if session.combo > 0 {
        let combo = session.combo;
        session.push_event(GameEvent::ComboLost { combo });
    }
    session.combo = 0;
    session.multiplier = 1.0;
}

fn speed_bonus(scoring: &ScoringTuning, response_ms: u64) -> (SpeedBonus, u32) {
    if response_ms <= scoring.very_fast_ms {
        (SpeedBonus::VeryFast, scoring.very_fast_bonus)
    } else if response_ms <= scoring.fast_ms {
        (SpeedBonus::Fast, scoring.fast_bonus)
    } else {
        (SpeedBonus::None, 0)
    }
}

pub(crate) fn start_slow_motion(session: &mut Session) {
    if session.slow_motion_remaining_ms == 0 {
        session.push_event(GameEvent::SlowMotionStarted);
    }
    session.slow_motion_remaining_ms = session.tuning.slow_motion.duration_ms;
}

/// Player intent: apply `action` to entity `id`
pub fn resolve_action(session: &mut Session, id: u32, action: Action) -> ActionOutcome {
    if !session.is_playing() {
        return ActionOutcome::Ignored;
    }
    let Some(index) = session.entities.iter().position(|e| e.id == id) else {
        return ActionOutcome::Ignored;
    };

    let entity = &session.entities[index];
    let template = &session.tuning.catalog[entity.kind];
    if template.requires_ability && !session.ability.is_active() {
        session.push_event(GameEvent::NeedsAbility { id });
        return ActionOutcome::NeedsAbility;
    }

    let outcome = if action == template.correct_action {
        let scoring = &session.tuning.scoring;
        let response_ms = entity.age_ms(session.clock_ms);
        let (speed, bonus) = speed_bonus(scoring, response_ms);
        let critical = entity.is_critical;
        let mut base = template.points + bonus;
        if critical {
            base += scoring.critical_bonus;
        }
        let is_boss = template.is_boss;

        session.entities.remove(index);
        session.combo += 1;
        session.max_combo = session.max_combo.max(session.combo);
        let previous = session.multiplier;
        session.multiplier = multiplier_for(&session.tuning.scoring.combo_tiers, session.combo);
        if session.multiplier > previous {
            session.push_event(GameEvent::ComboTier {
                combo: session.combo,
                multiplier: session.multiplier,
            });
        }

        let points = (base as f32 * session.multiplier).round() as u64;
        session.score += points;
        session.stats.correct += 1;
        if speed != SpeedBonus::None {
            session.stats.fast_actions += 1;
        }
        if critical {
            session.stats.criticals_saved += 1;
        }
        if is_boss {
            session.stats.bosses_handled += 1;
        }
        session.push_event(GameEvent::Correct {
            id,
            points,
            speed,
            critical,
        });

        if let Some(every) = session.tuning.scoring.slow_motion_every_combo {
            if every > 0 && session.combo % every == 0 {
                start_slow_motion(session);
            }
        }
        session.update_rank();
        ActionOutcome::Correct { points }
    } else {
        let consumed = session.tuning.scoring.wrong_action == WrongActionPolicy::Consume;
        if consumed {
            session.entities.remove(index);
        }
        break_combo(session);
        let wrong_penalty = session.tuning.scoring.wrong_penalty;
        let penalty = apply_penalty(session, wrong_penalty);
        session.stats.incorrect += 1;
        session.push_event(GameEvent::Wrong {
            id,
            penalty,
            consumed,
        });
        ActionOutcome::Wrong { penalty, consumed }
    };

    check_end_conditions(session);
    outcome
}

/// Player intent: collect power-up `id`. Returns false if it no longer exists.
pub fn collect_power_up(session: &mut Session, id: u32) -> bool {
    if !session.is_playing() {
        return false;
    }
    let Some(index) = session.power_ups.iter().position(|p| p.id == id) else {
        return false;
    };
    let power_up = session.power_ups.remove(index);
    session.stats.power_ups_collected += 1;
    log::debug!("Collected power-up #{} {:?}", id, power_up.effect);

    match power_up.effect {
        PowerUpEffect::Heal { amount } => {
            if let Some(max) = session.tuning.health {
                session.health = session.health.saturating_add(amount).min(max);
            }
        }
        PowerUpEffect::SlowMotion => start_slow_motion(session),
        PowerUpEffect::MassClear => {
            let catalog = &session.tuning.catalog;
            session.entities.retain(|e| catalog[e.kind].is_boss);
        }
    }
    session.push_event(GameEvent::PowerUpCollected {
        id,
        effect: power_up.effect,
    });
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::entity::Entity;
    use crate::sim::tick::start_game;
    use crate::tuning::GameTuning;
    use glam::Vec2;

    fn playing(tuning: GameTuning) -> Session {
        let mut session = Session::new(tuning, 11);
        start_game(&mut session);
        session.drain_events();
        session
    }

    fn place(session: &mut Session, kind: usize, spawn_time_ms: u64) -> u32 {
        let id = session.next_entity_id();
        let pos = session.tuning.field.compose(session.tuning.field.spawn_at, 50.0);
        session.entities.push(Entity {
            id,
            kind,
            position: pos,
            base_position: pos,
            spawn_time_ms,
            ttl_ms: None,
            is_critical: false,
            motion_age: 0.0,
        });
        id
    }

    #[test]
    fn test_fast_response_earns_fast_bonus() {
        let mut session = playing(GameTuning::meeting_defense());
        let id = place(&mut session, 0, 0);
        session.clock_ms = 500;

        let outcome = resolve_action(&mut session, id, Action::Decline);
        let fast_bonus = session.tuning.scoring.fast_bonus as u64;
        assert_eq!(outcome, ActionOutcome::Correct { points: 100 + fast_bonus });
        assert_eq!(session.score, 100 + fast_bonus);
        assert_eq!(session.combo, 1);
        assert_eq!(session.stats.fast_actions, 1);
        assert!(session.entity(id).is_none());
    }

    #[test]
    fn test_very_fast_tier_wins_over_fast() {
        let scoring = GameTuning::meeting_defense().scoring;
        assert_eq!(speed_bonus(&scoring, 300).0, SpeedBonus::VeryFast);
        assert_eq!(speed_bonus(&scoring, 301).0, SpeedBonus::Fast);
        assert_eq!(speed_bonus(&scoring, 601), (SpeedBonus::None, 0));
    }

    #[test]
    fn test_multiplier_tiers() {
        let tiers = ComboTier::default_table();
        assert_eq!(multiplier_for(&tiers, 2), 1.0);
        assert_eq!(multiplier_for(&tiers, 3), 1.5);
        assert_eq!(multiplier_for(&tiers, 6), 2.0);
        assert_eq!(multiplier_for(&tiers, 9), 2.5);
        assert_eq!(multiplier_for(&tiers, 40), 3.0);
    }

    #[test]
    fn test_wrong_action_floors_score_and_resets_combo() {
        let mut session = playing(GameTuning::meeting_defense());
        session.combo = 4;
        session.multiplier = 1.5;
        session.score = 10;
        let id = place(&mut session, 0, 0);

        let outcome = resolve_action(&mut session, id, Action::Accept);
        assert_eq!(
            outcome,
            ActionOutcome::Wrong {
                penalty: 10,
                consumed: true
            }
        );
        assert_eq!(session.score, 0);
        assert_eq!(session.combo, 0);
        assert_eq!(session.multiplier, 1.0);
        assert!(session.entities.is_empty());
    }

    #[test]
    fn test_soft_policy_keeps_entity() {
        let mut session = playing(GameTuning::inbox_triage());
        let id = place(&mut session, 1, 0);
        let outcome = resolve_action(&mut session, id, Action::Delegate);
        assert!(matches!(outcome, ActionOutcome::Wrong { consumed: false, .. }));
        assert!(session.entity(id).is_some());
        assert_eq!(session.stats.incorrect, 1);
    }

    #[test]
    fn test_boss_needs_active_ability() {
        let mut session = playing(GameTuning::meeting_defense());
        let boss = session.tuning.catalog.iter().position(|t| t.is_boss).unwrap();
        let id = place(&mut session, boss, 0);
        session.clock_ms = 5_000;

        assert_eq!(resolve_action(&mut session, id, Action::Decline), ActionOutcome::NeedsAbility);
        assert_eq!(session.score, 0);
        assert!(session.entity(id).is_some());

        assert!(crate::sim::ability::activate_ability(&mut session));
        assert!(matches!(
            resolve_action(&mut session, id, Action::Decline),
            ActionOutcome::Correct { points: 300 }
        ));
        assert_eq!(session.stats.bosses_handled, 1);
        assert_eq!(session.stats.boss_blocked, 0);
    }

    #[test]
    fn test_unknown_id_is_ignored() {
        let mut session = playing(GameTuning::meeting_defense());
        session.score = 42;
        assert_eq!(resolve_action(&mut session, 999, Action::Decline), ActionOutcome::Ignored);
        assert_eq!(session.score, 42);
    }

    #[test]
    fn test_tenth_combo_triggers_slow_motion() {
        let mut tuning = GameTuning::meeting_defense();
        tuning.win = crate::tuning::WinCondition::ScoreAtLeast(u64::MAX);
        let mut session = playing(tuning);
        for _ in 0..10 {
            let now = session.clock_ms;
            let id = place(&mut session, 0, now);
            session.clock_ms += 1000;
            resolve_action(&mut session, id, Action::Decline);
        }
        assert_eq!(session.combo, 10);
        assert_eq!(session.multiplier, 3.0);
        assert!(session.slow_motion_remaining_ms > 0);
        let events = session.drain_events();
        let tiers = events
            .iter()
            .filter(|e| matches!(e, GameEvent::ComboTier { .. }))
            .count();
        assert_eq!(tiers, 4);
        assert!(events.contains(&GameEvent::SlowMotionStarted));
    }

    #[test]
    fn test_mass_clear_spares_bosses() {
        let mut session = playing(GameTuning::meeting_defense());
        let boss = session.tuning.catalog.iter().position(|t| t.is_boss).unwrap();
        place(&mut session, 0, 0);
        let boss_id = place(&mut session, boss, 0);
        let id = session.next_entity_id();
        session.power_ups.push(crate::sim::entity::PowerUp {
            id,
            effect: PowerUpEffect::MassClear,
            position: Vec2::new(90.0, 50.0),
            base_position: Vec2::new(90.0, 50.0),
            spawn_time_ms: 0,
            speed: 30.0,
        });

        assert!(collect_power_up(&mut session, id));
        assert_eq!(session.entities.len(), 1);
        assert_eq!(session.entities[0].id, boss_id);
        assert!(!collect_power_up(&mut session, id));
    }

    #[test]
    fn test_heal_caps_at_starting_health() {
        let mut session = playing(GameTuning::meeting_defense());
        session.health = 7;
        let id = session.next_entity_id();
        session.power_ups.push(crate::sim::entity::PowerUp {
            id,
            effect: PowerUpEffect::Heal { amount: 3 },
            position: Vec2::ZERO,
            base_position: Vec2::ZERO,
            spawn_time_ms: 0,
            speed: 0.0,
        });
        collect_power_up(&mut session, id);
        assert_eq!(session.health, 8);
    }

    #[test]
    fn test_heal_at_max_health_saturates() {
        let mut tuning = GameTuning::meeting_defense();
        tuning.health = Some(u32::MAX);
        let mut session = playing(tuning);
        assert_eq!(session.health, u32::MAX);
        let id = session.next_entity_id();
        session.power_ups.push(crate::sim::entity::PowerUp {
            id,
            effect: PowerUpEffect::Heal { amount: 5 },
            position: Vec2::ZERO,
            base_position: Vec2::ZERO,
            spawn_time_ms: 0,
            speed: 0.0,
        });
        assert!(collect_power_up(&mut session, id));
        assert_eq!(session.health, u32::MAX);
    }
}
