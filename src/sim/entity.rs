//! Spawnable game objects
//!
//! Entities are the targets the player has to act on; power-ups share their
//! positional lifecycle but fire a one-shot effect when collected. Both are
//! passive data: the spawner creates them, the mover mutates them in place and
//! the impact detector or action resolver removes them.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Player intent applied to an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Accept,
    Reject,
    Delegate,
    Delete,
    Decline,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::Accept,
        Action::Reject,
        Action::Delegate,
        Action::Delete,
        Action::Decline,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Accept => "accept",
            Action::Reject => "reject",
            Action::Delegate => "delegate",
            Action::Delete => "delete",
            Action::Decline => "decline",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == s.to_lowercase())
    }
}

/// Motion pattern, fixed per template
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Pattern {
    /// Linear approach toward the boundary
    #[default]
    Straight,
    /// Linear approach plus a triangle-wave lateral offset
    Zigzag { amplitude: f32, frequency: f32 },
    /// Linear approach plus a sinusoidal lateral offset
    Sine { amplitude: f32, frequency: f32 },
    /// Speeds up as the entity nears the boundary
    Accelerate { factor: f32 },
}

fn default_damage() -> u32 {
    1
}

fn default_weight() -> u32 {
    1
}

fn default_min_wave() -> u32 {
    1
}

/// Upper bound on a single template's spawn weight
pub const MAX_SPAWN_WEIGHT: u32 = 1_000_000;

/// Catalog entry describing one kind of entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityTemplate {
    /// Display name ("Quick Sync", "Win a free iPhone!")
    pub name: String,
    /// Approach speed in play-field percent per second
    pub speed: f32,
    /// Base points for a correct action
    pub points: u32,
    /// Health lost when this entity impacts
    #[serde(default = "default_damage")]
    pub damage: u32,
    #[serde(default)]
    pub pattern: Pattern,
    #[serde(default)]
    pub is_boss: bool,
    /// Actions on this entity are refused unless the ability is active
    #[serde(default)]
    pub requires_ability: bool,
    /// The action that counts as correct
    pub correct_action: Action,
    /// Self-expiry age (None = lives until impact or action)
    #[serde(default)]
    pub ttl_ms: Option<u64>,
    /// Base spawn weight
    #[serde(default = "default_weight")]
    pub weight: u32,
    /// First wave this template may appear in
    #[serde(default = "default_min_wave")]
    pub min_wave: u32,
    /// Extra weight per wave past `min_wave`
    #[serde(default)]
    pub wave_bias: u32,
}

impl EntityTemplate {
    /// Spawn weight for the given wave (0 = not eligible), capped at `MAX_SPAWN_WEIGHT`
    pub fn spawn_weight(&self, wave: u32) -> u32 {
        if wave < self.min_wave {
            return 0;
        }
        self.wave_bias
            .saturating_mul(wave - self.min_wave)
            .saturating_add(self.weight)
            .min(MAX_SPAWN_WEIGHT)
    }
}

/// A live target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: u32,
    /// Index into the tuning catalog
    pub kind: usize,
    pub position: Vec2,
    /// Spawn position; oscillating patterns offset from it
    pub base_position: Vec2,
    pub spawn_time_ms: u64,
    /// Effective time-to-live (shortened for criticals)
    pub ttl_ms: Option<u64>,
    pub is_critical: bool,
    /// Seconds of motion applied so far (slowed by slow motion)
    #[serde(default)]
    pub motion_age: f32,
}

impl Entity {
    /// Milliseconds since spawn on the session clock
    pub fn age_ms(&self, clock_ms: u64) -> u64 {
        clock_ms.saturating_sub(self.spawn_time_ms)
    }

    /// True once the age strictly exceeds the TTL
    pub fn is_expired(&self, clock_ms: u64) -> bool {
        self.ttl_ms.is_some_and(|ttl| self.age_ms(clock_ms) > ttl)
    }
}

/// One-shot power-up effects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PowerUpEffect {
    /// Restore health (capped at the starting pool)
    Heal { amount: u32 },
    /// Global slow motion for a bounded time
    SlowMotion,
    /// Remove every non-boss entity on the field
    MassClear,
}

/// A live power-up
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerUp {
    pub id: u32,
    pub effect: PowerUpEffect,
    pub position: Vec2,
    pub base_position: Vec2,
    pub spawn_time_ms: u64,
    pub speed: f32,
}
