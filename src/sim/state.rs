//! Session state and core simulation types
//!
//! The session is the aggregate root: everything a clock or spawn tick may
//! mutate lives here, so timers only ever need a handle to the session.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::ability::{Ability, AbilityStatus};
use super::entity::{Entity, PowerUp, PowerUpEffect};
use super::spawner::Spawner;
use super::wave::WaveScheduler;
use crate::tuning::GameTuning;

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    /// Waiting for `start_game`
    Start,
    /// Active gameplay
    Playing,
    Won,
    Lost,
}

impl GamePhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, GamePhase::Won | GamePhase::Lost)
    }
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    TargetReached,
    Survived,
    HealthDepleted,
    TooManyImpacts,
    Overflow,
    TimeExpired,
    /// Live entity count escaped the spawner cap
    InvariantViolation,
}

impl EndReason {
    pub fn is_win(&self) -> bool {
        matches!(self, EndReason::TargetReached | EndReason::Survived)
    }
}

/// Per-session counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub correct: u32,
    pub incorrect: u32,
    pub fast_actions: u32,
    pub criticals_saved: u32,
    /// Bosses turned away by the shield at the boundary
    pub boss_blocked: u32,
    /// Bosses resolved correctly while the shield was up
    #[serde(default)]
    pub bosses_handled: u32,
    pub damage_taken: u32,
    pub impacts: u32,
    pub expired: u32,
    pub spawned: u32,
    pub power_ups_collected: u32,
    /// Filled in when the session ends
    pub max_combo: u32,
    pub final_wave: u32,
    pub time_played_ms: u64,
}

/// Response-time bonus tier earned by a correct action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedBonus {
    None,
    Fast,
    VeryFast,
}

/// Everything observable that happened during a tick or input.
/// Renderers and audio drain these; the engine never reacts to its own events.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    Started,
    Spawned {
        id: u32,
        kind: usize,
        is_critical: bool,
    },
    PowerUpSpawned {
        id: u32,
        effect: PowerUpEffect,
    },
    Correct {
        id: u32,
        points: u64,
        speed: SpeedBonus,
        critical: bool,
    },
    Wrong {
        id: u32,
        penalty: u64,
        consumed: bool,
    },
    /// Action refused until the ability is active
    NeedsAbility {
        id: u32,
    },
    ComboTier {
        combo: u32,
        multiplier: f32,
    },
    ComboLost {
        combo: u32,
    },
    Impact {
        id: u32,
        damage: u32,
    },
    Blocked {
        id: u32,
    },
    Expired {
        id: u32,
        penalty: u64,
    },
    AbilityActivated {
        charges_left: u32,
    },
    AbilityEnded,
    AbilityReady,
    PowerUpCollected {
        id: u32,
        effect: PowerUpEffect,
    },
    SlowMotionStarted,
    SlowMotionEnded,
    WaveAdvanced {
        wave: u32,
        spawn_interval_ms: u64,
    },
    RankUp {
        rank: String,
    },
    TimeWarning,
    GameOver {
        won: bool,
        reason: EndReason,
        score: u64,
    },
}

/// Complete session state
#[derive(Debug, Clone)]
pub struct Session {
    pub tuning: GameTuning,
    pub seed: u64,
    pub phase: GamePhase,
    /// Elapsed ms since `start_game`
    pub clock_ms: u64,
    pub score: u64,
    pub combo: u32,
    pub max_combo: u32,
    pub multiplier: f32,
    pub wave: u32,
    pub health: u32,
    pub ability: Ability,
    pub stats: Stats,
    pub entities: Vec<Entity>,
    pub power_ups: Vec<PowerUp>,
    pub slow_motion_remaining_ms: u64,
    pub spawner: Spawner,
    pub waves: WaveScheduler,
    pub end_reason: Option<EndReason>,
    /// Index into the tuning rank ladder
    pub rank: usize,
    pub(crate) time_warned: bool,
    pub(crate) rng: Pcg32,
    events: Vec<GameEvent>,
    next_id: u32,
}

impl Session {
    /// Create a session in the `Start` phase
    pub fn new(tuning: GameTuning, seed: u64) -> Self {
        let ability = Ability::new(&tuning.ability);
        let spawner = Spawner::new(tuning.spawner.initial_interval_ms);
        let health = tuning.health.unwrap_or(0);
        Self {
            tuning,
            seed,
            phase: GamePhase::Start,
            clock_ms: 0,
            score: 0,
            combo: 0,
            max_combo: 0,
            multiplier: 1.0,
            wave: 1,
            health,
            ability,
            stats: Stats::default(),
            entities: Vec::new(),
            power_ups: Vec::new(),
            slow_motion_remaining_ms: 0,
            spawner,
            waves: WaveScheduler::default(),
            end_reason: None,
            rank: 0,
            time_warned: false,
            rng: Pcg32::seed_from_u64(seed),
            events: Vec::new(),
            next_id: 1,
        }
    }

    /// Reset every per-session field (used when entering `Playing`)
    pub(crate) fn reset(&mut self) {
        self.clock_ms = 0;
        self.score = 0;
        self.combo = 0;
        self.max_combo = 0;
        self.multiplier = 1.0;
        self.wave = 1;
        self.health = self.tuning.health.unwrap_or(0);
        self.ability = Ability::new(&self.tuning.ability);
        self.stats = Stats::default();
        self.entities.clear();
        self.power_ups.clear();
        self.slow_motion_remaining_ms = 0;
        self.spawner = Spawner::new(self.tuning.spawner.initial_interval_ms);
        self.waves.reset();
        self.end_reason = None;
        self.rank = 0;
        self.time_warned = false;
        // Fresh stream per run so restarts don't replay the same spawns
        self.seed = self.seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
        self.rng = Pcg32::seed_from_u64(self.seed);
    }

    pub fn is_playing(&self) -> bool {
        self.phase == GamePhase::Playing
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn push_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Take every event emitted since the last drain
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn entity(&self, id: u32) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    /// Time left on the session clock (None for untimed games)
    pub fn time_remaining_ms(&self) -> Option<u64> {
        self.tuning
            .duration_ms
            .map(|d| d.saturating_sub(self.clock_ms))
    }

    pub fn rank_label(&self) -> Option<&str> {
        self.tuning.ranks.get(self.rank).map(|r| r.label.as_str())
    }

    /// Move up the rank ladder after a score change
    pub(crate) fn update_rank(&mut self) {
        let reached = self
            .tuning
            .ranks
            .iter()
            .rposition(|r| self.score >= r.min_score)
            .unwrap_or(0);
        if reached > self.rank {
            self.rank = reached;
            let label = self.tuning.ranks[reached].label.clone();
            log::info!("Rank up: {}", label);
            self.push_event(GameEvent::RankUp { rank: label });
        }
    }

    /// Render/HUD view of the current frame
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            game_id: self.tuning.game_id.clone(),
            phase: self.phase,
            score: self.score,
            time_remaining_ms: self.time_remaining_ms(),
            clock_ms: self.clock_ms,
            entities: self
                .entities
                .iter()
                .map(|e| EntityView {
                    id: e.id,
                    kind: self.tuning.catalog[e.kind].name.clone(),
                    position: e.position,
                    is_critical: e.is_critical,
                    is_boss: self.tuning.catalog[e.kind].is_boss,
                })
                .collect(),
            power_ups: self
                .power_ups
                .iter()
                .map(|p| PowerUpView {
                    id: p.id,
                    effect: p.effect,
                    position: p.position,
                })
                .collect(),
            combo: self.combo,
            multiplier: self.multiplier,
            wave: self.wave,
            health: self.tuning.health.map(|_| self.health),
            ability: self.ability.status(),
            slow_motion: self.slow_motion_remaining_ms > 0,
            stats: self.stats.clone(),
            rank: self.rank_label().map(str::to_owned),
            end_reason: self.end_reason,
        }
    }
}

/// Entity as seen by a renderer
#[derive(Debug, Clone, Serialize)]
pub struct EntityView {
    pub id: u32,
    pub kind: String,
    pub position: Vec2,
    pub is_critical: bool,
    pub is_boss: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PowerUpView {
    pub id: u32,
    pub effect: PowerUpEffect,
    pub position: Vec2,
}

/// Per-frame HUD and draw state
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub game_id: String,
    pub phase: GamePhase,
    pub score: u64,
    pub time_remaining_ms: Option<u64>,
    pub clock_ms: u64,
    pub entities: Vec<EntityView>,
    pub power_ups: Vec<PowerUpView>,
    pub combo: u32,
    pub multiplier: f32,
    pub wave: u32,
    pub health: Option<u32>,
    pub ability: AbilityStatus,
    pub slow_motion: bool,
    pub stats: Stats,
    pub rank: Option<String>,
    pub end_reason: Option<EndReason>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_waits_in_start() {
        let session = Session::new(GameTuning::meeting_defense(), 5);
        assert_eq!(session.phase, GamePhase::Start);
        assert_eq!(session.wave, 1);
        assert_eq!(session.health, 8);
        assert_eq!(session.multiplier, 1.0);
        assert!(session.entities.is_empty());
    }

    #[test]
    fn test_ids_are_monotonic() {
        let mut session = Session::new(GameTuning::meeting_defense(), 5);
        let a = session.next_entity_id();
        let b = session.next_entity_id();
        assert!(b > a);
    }

    #[test]
    fn test_rank_only_moves_up() {
        let mut session = Session::new(GameTuning::meeting_defense(), 5);
        session.score = 600;
        session.update_rank();
        let reached = session.rank;
        assert!(reached > 0);
        assert!(matches!(
            session.drain_events().as_slice(),
            [GameEvent::RankUp { .. }]
        ));

        session.score = 0;
        session.update_rank();
        assert_eq!(session.rank, reached);
        assert!(session.drain_events().is_empty());
    }

    #[test]
    fn test_snapshot_serializes() {
        let session = Session::new(GameTuning::inbox_triage(), 5);
        let json = serde_json::to_string(&session.snapshot()).unwrap();
        assert!(json.contains("\"phase\":\"start\""));
        assert!(json.contains("\"time_remaining_ms\":30000"));
    }
}
