//! Boundary impacts and TTL expiry
//!
//! Runs once per clock tick after movement. Removed entities are collected
//! first and applied in spawn order so the outcome does not depend on how the
//! collection is traversed.

use super::resolve::{apply_penalty, break_combo};
use super::state::{GameEvent, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fate {
    Crossed,
    Expired,
}

/// Remove every entity that reached the boundary or outlived its TTL
pub fn detect_impacts(session: &mut Session) {
    let field = session.tuning.field;
    let clock_ms = session.clock_ms;

    let mut removed = Vec::new();
    session.entities.retain(|e| {
        let fate = if field.crossed(e.position) {
            Fate::Crossed
        } else if e.is_expired(clock_ms) {
            Fate::Expired
        } else {
            return true;
        };
        removed.push((e.id, e.kind, fate));
        false
    });
    // Missed power-ups just vanish
    session.power_ups.retain(|p| !field.crossed(p.position));

    for (id, kind, fate) in removed {
        match fate {
            Fate::Crossed => crossed(session, id, kind),
            Fate::Expired => {
                break_combo(session);
                let expiry_penalty = session.tuning.scoring.expiry_penalty;
                let penalty = apply_penalty(session, expiry_penalty);
                session.stats.expired += 1;
                log::debug!("Entity #{} expired (-{})", id, penalty);
                session.push_event(GameEvent::Expired { id, penalty });
            }
        }
    }
}

fn crossed(session: &mut Session, id: u32, kind: usize) {
    let template = &session.tuning.catalog[kind];
    if template.is_boss && session.ability.is_active() {
        session.stats.boss_blocked += 1;
        log::debug!("Boss #{} blocked by shield", id);
        session.push_event(GameEvent::Blocked { id });
        return;
    }

    let damage = template.damage;
    if session.tuning.health.is_some() {
        session.health = session.health.saturating_sub(damage);
    }
    session.stats.damage_taken += damage;
    session.stats.impacts += 1;
    break_combo(session);
    let impact_penalty = session.tuning.scoring.impact_penalty;
    apply_penalty(session, impact_penalty);
    log::debug!("Entity #{} impacted for {} damage", id, damage);
    session.push_event(GameEvent::Impact { id, damage });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::entity::Entity;
    use crate::sim::tick::start_game;
    use crate::tuning::GameTuning;
    use glam::Vec2;

    fn entity(id: u32, kind: usize, position: Vec2, ttl_ms: Option<u64>) -> Entity {
        Entity {
            id,
            kind,
            position,
            base_position: position,
            spawn_time_ms: 0,
            ttl_ms,
            is_critical: false,
            motion_age: 0.0,
        }
    }

    #[test]
    fn test_crossing_deals_damage_and_breaks_combo() {
        let mut session = Session::new(GameTuning::meeting_defense(), 1);
        start_game(&mut session);
        session.combo = 4;
        session.entities.push(entity(1, 0, Vec2::new(9.0, 50.0), None));
        session.entities.push(entity(2, 0, Vec2::new(60.0, 50.0), None));

        detect_impacts(&mut session);
        assert_eq!(session.health, 7);
        assert_eq!(session.stats.impacts, 1);
        assert_eq!(session.stats.damage_taken, 1);
        assert_eq!(session.combo, 0);
        assert_eq!(session.entities.len(), 1);
        assert_eq!(session.entities[0].id, 2);
    }

    #[test]
    fn test_shield_blocks_boss() {
        let mut session = Session::new(GameTuning::meeting_defense(), 1);
        start_game(&mut session);
        let boss = session.tuning.catalog.iter().position(|t| t.is_boss).unwrap();
        session.ability.activate();
        session.entities.push(entity(1, boss, Vec2::new(5.0, 50.0), None));

        detect_impacts(&mut session);
        assert_eq!(session.health, 8);
        assert_eq!(session.stats.boss_blocked, 1);
        assert!(session.entities.is_empty());
        assert!(session.drain_events().contains(&GameEvent::Blocked { id: 1 }));
    }

    #[test]
    fn test_expiry_applies_penalty() {
        let mut session = Session::new(GameTuning::inbox_triage(), 1);
        start_game(&mut session);
        session.score = 20;
        session.clock_ms = 3_001;
        session.entities.push(entity(1, 0, Vec2::new(50.0, 10.0), Some(3_000)));

        detect_impacts(&mut session);
        assert_eq!(session.score, 15);
        assert_eq!(session.stats.expired, 1);
        assert!(session.entities.is_empty());
    }
}
