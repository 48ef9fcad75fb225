//! Data-driven game balance
//!
//! A `GameTuning` fully describes one game variant: catalog, spawner, wave
//! table, scoring and end conditions. Two built-in presets ship with the
//! crate; anything else loads from JSON and is validated before use.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::sim::ability::AbilityTuning;
use crate::sim::entity::{Action, EntityTemplate, Pattern, PowerUpEffect};
use crate::sim::motion::{Axis, PlayField};
use crate::sim::resolve::{ComboTier, ScoringTuning, WrongActionPolicy};
use crate::sim::spawner::{OverflowPolicy, PowerUpTemplate, SpawnerTuning};
use crate::sim::state::Stats;
use crate::sim::wave::WaveCheckpoint;

/// How a session is won
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinCondition {
    ScoreAtLeast(u64),
    HandledAtLeast(u32),
    /// Still standing when the clock runs out
    Survive,
}

/// Second number stored next to the personal best score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecondaryMetric {
    #[default]
    MaxCombo,
    WaveReached,
    Handled,
}

impl SecondaryMetric {
    pub fn measure(&self, stats: &Stats) -> u64 {
        match self {
            SecondaryMetric::MaxCombo => stats.max_combo as u64,
            SecondaryMetric::WaveReached => stats.final_wave as u64,
            SecondaryMetric::Handled => stats.correct as u64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlowMotionTuning {
    /// Speed multiplier while active
    pub factor: f32,
    pub duration_ms: u64,
}

impl Default for SlowMotionTuning {
    fn default() -> Self {
        Self {
            factor: 0.3,
            duration_ms: 2000,
        }
    }
}

/// One step of the rank ladder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rank {
    pub min_score: u64,
    pub label: String,
}

fn default_tick_ms() -> u64 {
    crate::consts::DEFAULT_TICK_MS
}

/// Complete balance for one game variant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameTuning {
    /// Leaderboard and storage key
    pub game_id: String,
    /// Session length (None = untimed)
    #[serde(default)]
    pub duration_ms: Option<u64>,
    /// Master clock period
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    pub field: PlayField,
    pub catalog: Vec<EntityTemplate>,
    pub spawner: SpawnerTuning,
    /// Wave 2+ checkpoints, sorted by `at_ms`
    #[serde(default)]
    pub waves: Vec<WaveCheckpoint>,
    pub scoring: ScoringTuning,
    #[serde(default)]
    pub ability: AbilityTuning,
    #[serde(default)]
    pub slow_motion: SlowMotionTuning,
    /// Starting health pool (None = no health)
    #[serde(default)]
    pub health: Option<u32>,
    /// Session is lost once impacts exceed this
    #[serde(default)]
    pub max_impacts: Option<u32>,
    pub win: WinCondition,
    #[serde(default)]
    pub secondary_metric: SecondaryMetric,
    #[serde(default)]
    pub ranks: Vec<Rank>,
    /// Remaining time at which a single warning fires
    #[serde(default)]
    pub time_warning_ms: Option<u64>,
}

/// Tuning load/validation failure
#[derive(Debug)]
pub enum TuningError {
    Parse(serde_json::Error),
    Invalid(String),
}

impl fmt::Display for TuningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TuningError::Parse(e) => write!(f, "tuning parse error: {}", e),
            TuningError::Invalid(msg) => write!(f, "invalid tuning: {}", msg),
        }
    }
}

impl std::error::Error for TuningError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TuningError::Parse(e) => Some(e),
            TuningError::Invalid(_) => None,
        }
    }
}

impl From<serde_json::Error> for TuningError {
    fn from(e: serde_json::Error) -> Self {
        TuningError::Parse(e)
    }
}

fn invalid(msg: impl Into<String>) -> Result<(), TuningError> {
    Err(TuningError::Invalid(msg.into()))
}

fn email(subject: &str, action: Action, ttl_ms: u64, weight: u32) -> EntityTemplate {
    EntityTemplate {
        name: subject.to_owned(),
        speed: 2.5,
        points: 10,
        damage: 1,
        pattern: Pattern::Straight,
        is_boss: false,
        requires_ability: false,
        correct_action: action,
        ttl_ms: Some(ttl_ms),
        weight,
        min_wave: 1,
        wave_bias: 0,
    }
}

fn meeting(name: &str, speed: f32, pattern: Pattern) -> EntityTemplate {
    EntityTemplate {
        name: name.to_owned(),
        // Catalog speeds are per 50ms tick; templates use units per second
        speed: speed * 20.0,
        points: 100,
        damage: 1,
        pattern,
        is_boss: false,
        requires_ability: false,
        correct_action: Action::Decline,
        ttl_ms: None,
        weight: 3,
        min_wave: 1,
        wave_bias: 0,
    }
}

fn ranks(ladder: &[(u64, &str)]) -> Vec<Rank> {
    ladder
        .iter()
        .map(|&(min_score, label)| Rank {
            min_score,
            label: label.to_owned(),
        })
        .collect()
}

impl GameTuning {
    /// Inbox triage: delegate work, delete noise before the inbox overflows
    pub fn inbox_triage() -> Self {
        Self {
            game_id: "inbox_triage".into(),
            duration_ms: Some(30_000),
            tick_ms: crate::consts::DEFAULT_TICK_MS,
            field: PlayField {
                axis: Axis::Y,
                spawn_at: 0.0,
                boundary: 100.0,
                lateral_min: 20.0,
                lateral_max: 80.0,
            },
            catalog: vec![
                email("URGENT: Server Down", Action::Delegate, 8_000, 2),
                email("Win a free iPhone!", Action::Delete, 12_000, 2),
                email("Weekly Digest", Action::Delete, 12_000, 2),
                email("Q4 Report Draft", Action::Delegate, 12_000, 2),
                email("Sync?", Action::Delegate, 12_000, 1),
                email("Your Order #1234", Action::Delete, 12_000, 1),
            ],
            spawner: SpawnerTuning {
                initial_interval_ms: 1200,
                max_entities: 5,
                overflow: OverflowPolicy::Lose,
                critical_chance: vec![0.05, 0.1, 0.15],
                critical_ttl_factor: 0.6,
                power_up_chance: 0.0,
                power_ups: Vec::new(),
            },
            waves: vec![
                WaveCheckpoint {
                    at_ms: 10_000,
                    wave: 2,
                    spawn_interval_ms: 1000,
                },
                WaveCheckpoint {
                    at_ms: 20_000,
                    wave: 3,
                    spawn_interval_ms: 800,
                },
            ],
            scoring: ScoringTuning {
                fast_ms: 1500,
                fast_bonus: 2,
                very_fast_ms: 750,
                very_fast_bonus: 5,
                critical_bonus: 5,
                wrong_penalty: 5,
                expiry_penalty: 5,
                impact_penalty: 5,
                wrong_action: WrongActionPolicy::Soft,
                combo_tiers: ComboTier::default_table(),
                slow_motion_every_combo: None,
            },
            ability: AbilityTuning {
                charges: 0,
                duration_ms: 0,
                cooldown_ms: 0,
            },
            slow_motion: SlowMotionTuning::default(),
            health: None,
            max_impacts: None,
            win: WinCondition::ScoreAtLeast(150),
            secondary_metric: SecondaryMetric::Handled,
            ranks: ranks(&[
                (0, "Inbox Hostage"),
                (50, "Triage Trainee"),
                (100, "Delegation Pro"),
                (150, "Inbox Zero Hero"),
            ]),
            time_warning_ms: Some(5_000),
        }
    }

    /// Meeting defense: decline meetings before they eat the day's focus hours
    pub fn meeting_defense() -> Self {
        let mut all_hands = meeting("All Hands", 1.5, Pattern::Straight);
        all_hands.is_boss = true;
        all_hands.requires_ability = true;
        all_hands.points = 300;
        all_hands.damage = 2;
        all_hands.weight = 1;
        all_hands.min_wave = 2;
        all_hands.wave_bias = 1;

        let mut touch_base = meeting(
            "Touch Base",
            4.0,
            Pattern::Zigzag {
                amplitude: 5.0,
                frequency: 1.0,
            },
        );
        touch_base.weight = 2;
        touch_base.min_wave = 2;
        touch_base.wave_bias = 1;

        let mut status_update = meeting("Status Update", 2.5, Pattern::Accelerate { factor: 0.8 });
        status_update.weight = 2;
        status_update.wave_bias = 1;

        Self {
            game_id: "meeting_defense".into(),
            duration_ms: None,
            tick_ms: crate::consts::DEFAULT_TICK_MS,
            field: PlayField {
                axis: Axis::X,
                spawn_at: 100.0,
                boundary: 10.0,
                lateral_min: 10.0,
                lateral_max: 90.0,
            },
            catalog: vec![
                meeting("Quick Sync", 3.0, Pattern::Straight),
                meeting(
                    "Brainstorm",
                    2.0,
                    Pattern::Sine {
                        amplitude: 6.0,
                        frequency: 0.5,
                    },
                ),
                touch_base,
                status_update,
                all_hands,
            ],
            spawner: SpawnerTuning {
                initial_interval_ms: 1500,
                max_entities: 8,
                overflow: OverflowPolicy::Skip,
                critical_chance: vec![0.08, 0.15, 0.25],
                critical_ttl_factor: 0.6,
                power_up_chance: 0.08,
                power_ups: vec![
                    PowerUpTemplate {
                        effect: PowerUpEffect::Heal { amount: 1 },
                        weight: 2,
                        speed: 30.0,
                    },
                    PowerUpTemplate {
                        effect: PowerUpEffect::SlowMotion,
                        weight: 2,
                        speed: 30.0,
                    },
                    PowerUpTemplate {
                        effect: PowerUpEffect::MassClear,
                        weight: 1,
                        speed: 30.0,
                    },
                ],
            },
            waves: vec![
                WaveCheckpoint {
                    at_ms: 20_000,
                    wave: 2,
                    spawn_interval_ms: 1200,
                },
                WaveCheckpoint {
                    at_ms: 40_000,
                    wave: 3,
                    spawn_interval_ms: 900,
                },
                WaveCheckpoint {
                    at_ms: 60_000,
                    wave: 4,
                    spawn_interval_ms: 700,
                },
            ],
            scoring: ScoringTuning {
                fast_ms: 600,
                fast_bonus: 25,
                very_fast_ms: 300,
                very_fast_bonus: 50,
                critical_bonus: 50,
                wrong_penalty: 25,
                expiry_penalty: 0,
                impact_penalty: 0,
                wrong_action: WrongActionPolicy::Consume,
                combo_tiers: ComboTier::default_table(),
                slow_motion_every_combo: Some(10),
            },
            ability: AbilityTuning::default(),
            slow_motion: SlowMotionTuning::default(),
            health: Some(8),
            max_impacts: None,
            win: WinCondition::ScoreAtLeast(1500),
            secondary_metric: SecondaryMetric::WaveReached,
            ranks: ranks(&[
                (0, "Calendar Victim"),
                (300, "Meeting Dodger"),
                (600, "Focus Guardian"),
                (1000, "Time Lord"),
                (1500, "Deep Work Master"),
            ]),
            time_warning_ms: None,
        }
    }

    /// Built-in preset by name
    pub fn preset(name: &str) -> Option<Self> {
        match name.to_lowercase().replace('-', "_").as_str() {
            "inbox_triage" | "inbox" | "triage" => Some(Self::inbox_triage()),
            "meeting_defense" | "meetings" | "calendar" => Some(Self::meeting_defense()),
            _ => None,
        }
    }

    /// Parse and validate a JSON tuning
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Self = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Check every cross-field constraint the engine relies on
    pub fn validate(&self) -> Result<(), TuningError> {
        if self.game_id.trim().is_empty() {
            return invalid("game_id is empty");
        }
        if self.tick_ms == 0 {
            return invalid("tick_ms must be positive");
        }
        if self.duration_ms == Some(0) {
            return invalid("duration_ms must be positive");
        }
        if self.catalog.is_empty() {
            return invalid("catalog is empty");
        }
        if self.catalog.iter().all(|t| t.spawn_weight(1) == 0) {
            return invalid("no template can spawn in wave 1");
        }
        if let Some(t) = self.catalog.iter().find(|t| !(t.speed.is_finite() && t.speed >= 0.0)) {
            return invalid(format!("template '{}' has an invalid speed", t.name));
        }
        if self.catalog.iter().any(|t| t.requires_ability) && self.ability.charges == 0 {
            return invalid("a template requires the ability but the ability has no charges");
        }
        let ability_usable =
            self.ability.charges > 0 || self.catalog.iter().any(|t| t.requires_ability);
        if ability_usable && self.ability.duration_ms == 0 {
            return invalid("ability.duration_ms must be positive when the ability has charges");
        }

        let f = &self.field;
        if !(0.0..=100.0).contains(&f.lateral_min)
            || !(0.0..=100.0).contains(&f.lateral_max)
            || f.lateral_min > f.lateral_max
        {
            return invalid("lateral range must lie within 0..=100");
        }
        if (f.boundary - f.spawn_at).abs() <= f32::EPSILON {
            return invalid("spawn edge and boundary coincide");
        }

        let s = &self.spawner;
        if s.initial_interval_ms == 0 {
            return invalid("spawner.initial_interval_ms must be positive");
        }
        if s.max_entities == 0 {
            return invalid("spawner.max_entities must be positive");
        }
        if s.critical_chance.iter().any(|p| !(0.0..=1.0).contains(p)) {
            return invalid("critical chances must lie within 0..=1");
        }
        if s.critical_chance.windows(2).any(|w| w[0] >= w[1]) {
            return invalid("critical chances must strictly increase by wave");
        }
        if !(0.0..=1.0).contains(&s.power_up_chance) {
            return invalid("power_up_chance must lie within 0..=1");
        }
        if s.power_up_chance > 0.0 && s.power_ups.iter().all(|p| p.weight == 0) {
            return invalid("power_up_chance is set but no power-up has weight");
        }

        let mut last_at = 0;
        let mut last_wave = 1;
        for checkpoint in &self.waves {
            if checkpoint.at_ms <= last_at {
                return invalid("wave checkpoints must have strictly increasing at_ms > 0");
            }
            if checkpoint.wave <= last_wave {
                return invalid("wave numbers must strictly increase from 2");
            }
            if checkpoint.spawn_interval_ms == 0 {
                return invalid(format!("wave {} has a zero spawn interval", checkpoint.wave));
            }
            last_at = checkpoint.at_ms;
            last_wave = checkpoint.wave;
        }

        let sc = &self.scoring;
        if sc.very_fast_ms > sc.fast_ms {
            return invalid("very_fast_ms must not exceed fast_ms");
        }
        if sc.combo_tiers.windows(2).any(|w| w[0].min_combo >= w[1].min_combo) {
            return invalid("combo tiers must be sorted by min_combo");
        }
        if sc
            .combo_tiers
            .iter()
            .any(|t| t.multiplier.is_nan() || t.multiplier < 1.0)
        {
            return invalid("combo multipliers must be at least 1");
        }
        if sc.slow_motion_every_combo == Some(0) {
            return invalid("slow_motion_every_combo must be positive");
        }

        let factor = self.slow_motion.factor;
        if factor <= 0.0 || !(0.0..=1.0).contains(&factor) {
            return invalid("slow_motion.factor must lie within (0, 1]");
        }
        if self.health == Some(0) {
            return invalid("health must be positive when set");
        }
        if self.win == WinCondition::Survive && self.duration_ms.is_none() {
            return invalid("survive requires a duration");
        }
        if self.ranks.windows(2).any(|w| w[0].min_score >= w[1].min_score) {
            return invalid("ranks must be sorted by min_score");
        }
        Ok(())
    }
}
