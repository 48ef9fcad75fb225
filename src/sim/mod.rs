//! Deterministic game simulation
//!
//! All gameplay logic lives here. This module must stay pure and deterministic:
//! - Session clock only (no wall time)
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering, timer or platform dependencies

pub mod ability;
pub mod entity;
pub mod impact;
pub mod motion;
pub mod resolve;
pub mod spawner;
pub mod state;
pub mod tick;
pub mod wave;

pub use ability::{Ability, AbilityStatus, AbilityTuning, activate_ability};
pub use entity::{Action, Entity, EntityTemplate, Pattern, PowerUp, PowerUpEffect};
pub use impact::detect_impacts;
pub use motion::{Axis, PlayField};
pub use resolve::{ActionOutcome, ComboTier, ScoringTuning, WrongActionPolicy, collect_power_up, resolve_action};
pub use spawner::{OverflowPolicy, SpawnOutcome, SpawnerTuning, spawn_tick};
pub use state::{EndReason, GameEvent, GamePhase, Session, Snapshot, SpeedBonus, Stats};
pub use tick::{advance_clock, start_game};
pub use wave::WaveCheckpoint;
