//! Periodic entity spawner
//!
//! Template choice is a weighted draw over the catalog entries eligible for the
//! current wave; later waves add weight to harder templates. The live entity
//! count never exceeds `max_entities`.

use glam::Vec2;
use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use serde::{Deserialize, Serialize};

use super::entity::{Entity, EntityTemplate, PowerUp, PowerUpEffect};
use super::motion::PlayField;
use super::state::{EndReason, GameEvent, Session};
use super::tick::finish;

/// What a spawn tick does when the field is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Skip the tick; nothing is lost
    #[default]
    Skip,
    /// The session is lost (inbox overflow)
    Lose,
}

/// Power-up catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerUpTemplate {
    pub effect: PowerUpEffect,
    pub weight: u32,
    pub speed: f32,
}

fn default_ttl_factor() -> f32 {
    0.6
}

/// Spawner balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnerTuning {
    /// Wave 1 spawn interval
    pub initial_interval_ms: u64,
    pub max_entities: usize,
    #[serde(default)]
    pub overflow: OverflowPolicy,
    /// Critical probability per wave (index 0 = wave 1, last entry repeats)
    pub critical_chance: Vec<f32>,
    /// TTL multiplier applied to critical entities
    #[serde(default = "default_ttl_factor")]
    pub critical_ttl_factor: f32,
    /// Chance per spawn tick of also spawning a power-up
    #[serde(default)]
    pub power_up_chance: f32,
    #[serde(default)]
    pub power_ups: Vec<PowerUpTemplate>,
}

/// Current spawn configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spawner {
    pub interval_ms: u64,
    pub wave: u32,
}

impl Spawner {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            wave: 1,
        }
    }

    pub fn configure(&mut self, interval_ms: u64, wave: u32) {
        self.interval_ms = interval_ms;
        self.wave = wave;
    }
}

/// Result of one spawn tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnOutcome {
    Spawned(u32),
    /// Field full, tick skipped
    AtCapacity,
    /// Field full and the overflow policy ended the session
    Overflow,
    /// Not playing, or no template eligible this wave
    Idle,
}

/// Critical probability for a wave
pub fn critical_chance(tuning: &SpawnerTuning, wave: u32) -> f32 {
    let idx = (wave.max(1) - 1) as usize;
    tuning
        .critical_chance
        .get(idx)
        .or(tuning.critical_chance.last())
        .copied()
        .unwrap_or(0.0)
        .clamp(0.0, 1.0)
}

/// Weighted template pick for a wave
pub fn choose_template<R: Rng>(catalog: &[EntityTemplate], wave: u32, rng: &mut R) -> Option<usize> {
    let weights: Vec<u32> = catalog.iter().map(|t| t.spawn_weight(wave)).collect();
    let dist = WeightedIndex::new(&weights).ok()?;
    Some(dist.sample(rng))
}

fn choose_power_up<R: Rng>(templates: &[PowerUpTemplate], rng: &mut R) -> Option<PowerUpTemplate> {
    let dist = WeightedIndex::new(templates.iter().map(|t| t.weight)).ok()?;
    Some(templates[dist.sample(rng)])
}

fn spawn_position<R: Rng>(field: &PlayField, rng: &mut R) -> Vec2 {
    let lateral = if field.lateral_max > field.lateral_min {
        rng.random_range(field.lateral_min..field.lateral_max)
    } else {
        field.lateral_min
    };
    field.compose(field.spawn_at, lateral)
}

/// Spawn timer callback
pub fn spawn_tick(session: &mut Session) -> SpawnOutcome {
    if !session.is_playing() {
        return SpawnOutcome::Idle;
    }

    if session.entities.len() >= session.tuning.spawner.max_entities {
        return match session.tuning.spawner.overflow {
            OverflowPolicy::Skip => SpawnOutcome::AtCapacity,
            OverflowPolicy::Lose => {
                log::info!("Spawner overflow with {} live entities", session.entities.len());
                finish(session, EndReason::Overflow);
                SpawnOutcome::Overflow
            }
        };
    }

    let wave = session.spawner.wave;
    let field = session.tuning.field;
    let Some(kind) = choose_template(&session.tuning.catalog, wave, &mut session.rng) else {
        return SpawnOutcome::Idle;
    };

    let chance = critical_chance(&session.tuning.spawner, wave) as f64;
    let is_critical = session.rng.random_bool(chance);
    let ttl_factor = session.tuning.spawner.critical_ttl_factor;
    let ttl_ms = session.tuning.catalog[kind].ttl_ms.map(|ttl| {
        if is_critical {
            (ttl as f32 * ttl_factor).round() as u64
        } else {
            ttl
        }
    });
    let position = spawn_position(&field, &mut session.rng);

    let id = session.next_entity_id();
    session.entities.push(Entity {
        id,
        kind,
        position,
        base_position: position,
        spawn_time_ms: session.clock_ms,
        ttl_ms,
        is_critical,
        motion_age: 0.0,
    });
    session.stats.spawned += 1;
    log::debug!(
        "Spawned #{} {} (critical: {}) at {:?}",
        id,
        session.tuning.catalog[kind].name,
        is_critical,
        position
    );
    session.push_event(GameEvent::Spawned {
        id,
        kind,
        is_critical,
    });

    let power_up_chance = session.tuning.spawner.power_up_chance.clamp(0.0, 1.0) as f64;
    if power_up_chance > 0.0 && session.rng.random_bool(power_up_chance) {
        if let Some(template) = choose_power_up(&session.tuning.spawner.power_ups, &mut session.rng) {
            let position = spawn_position(&field, &mut session.rng);
            let power_up_id = session.next_entity_id();
            session.power_ups.push(PowerUp {
                id: power_up_id,
                effect: template.effect,
                position,
                base_position: position,
                spawn_time_ms: session.clock_ms,
                speed: template.speed,
            });
            session.push_event(GameEvent::PowerUpSpawned {
                id: power_up_id,
                effect: template.effect,
            });
        }
    }

    SpawnOutcome::Spawned(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::tick::start_game;
    use crate::tuning::GameTuning;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_critical_chance_table_repeats_last() {
        let tuning = GameTuning::meeting_defense().spawner;
        assert!((critical_chance(&tuning, 1) - 0.08).abs() < 1e-6);
        assert!((critical_chance(&tuning, 3) - 0.25).abs() < 1e-6);
        assert!((critical_chance(&tuning, 9) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_choose_template_respects_min_wave() {
        let catalog = GameTuning::meeting_defense().catalog;
        let boss = catalog.iter().position(|t| t.is_boss).unwrap();
        let mut rng = Pcg32::seed_from_u64(7);
        for _ in 0..500 {
            assert_ne!(choose_template(&catalog, 1, &mut rng), Some(boss));
        }
    }

    #[test]
    fn test_huge_wave_bias_still_picks() {
        let mut catalog = GameTuning::meeting_defense().catalog;
        catalog.iter_mut().for_each(|t| t.wave_bias = u32::MAX);
        let mut rng = Pcg32::seed_from_u64(3);
        for wave in [1, 3, 50, u32::MAX] {
            let pick = choose_template(&catalog, wave, &mut rng);
            assert!(pick.is_some_and(|i| i < catalog.len()));
        }
    }

    #[test]
    fn test_spawn_stops_at_capacity() {
        let mut session = Session::new(GameTuning::meeting_defense(), 1);
        start_game(&mut session);
        let max = session.tuning.spawner.max_entities;
        for _ in 0..max * 3 {
            spawn_tick(&mut session);
        }
        assert_eq!(session.entities.len(), max);
        assert_eq!(spawn_tick(&mut session), SpawnOutcome::AtCapacity);
        assert!(session.is_playing());
    }

    #[test]
    fn test_overflow_policy_loses() {
        let mut session = Session::new(GameTuning::inbox_triage(), 1);
        start_game(&mut session);
        let max = session.tuning.spawner.max_entities;
        for _ in 0..max {
            assert!(matches!(spawn_tick(&mut session), SpawnOutcome::Spawned(_)));
        }
        assert_eq!(spawn_tick(&mut session), SpawnOutcome::Overflow);
        assert_eq!(session.end_reason, Some(EndReason::Overflow));
    }

    #[test]
    fn test_spawn_is_idle_before_start() {
        let mut session = Session::new(GameTuning::meeting_defense(), 1);
        assert_eq!(spawn_tick(&mut session), SpawnOutcome::Idle);
        assert!(session.entities.is_empty());
    }

    #[test]
    fn test_spawned_entity_starts_at_spawn_edge() {
        let mut session = Session::new(GameTuning::meeting_defense(), 3);
        start_game(&mut session);
        session.clock_ms = 1234;
        spawn_tick(&mut session);
        let e = &session.entities[0];
        assert_eq!(e.spawn_time_ms, 1234);
        assert!((session.tuning.field.primary(e.position) - session.tuning.field.spawn_at).abs() < 1e-5);
        let lateral = session.tuning.field.lateral(e.position);
        assert!(lateral >= session.tuning.field.lateral_min && lateral < session.tuning.field.lateral_max);
    }
}
