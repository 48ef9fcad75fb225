//! Training Arcade - timed, wave-based arcade mini-game engine
//!
//! Core modules:
//! - `sim`: Deterministic simulation (spawning, motion, scoring, game state)
//! - `tuning`: Data-driven game balance and presets
//! - `scheduler` / `runner`: Timer plumbing around one session
//! - `report`: Leaderboard submission and personal bests
//! - `storage` / `settings` / `lock`: Local persistence
//! - `audio`: Sound cue trigger points
//! - `platform`: Browser/native platform abstraction

pub mod audio;
pub mod lock;
pub mod platform;
pub mod report;
pub mod runner;
pub mod scheduler;
pub mod settings;
pub mod sim;
pub mod storage;
pub mod tuning;

pub use report::{PersonalBest, ScoreReporter};
pub use runner::{FrameSink, GameRunner};
pub use scheduler::{Scheduler, Task, VirtualScheduler};
pub use settings::Settings;
pub use sim::{Action, GameEvent, GamePhase, Session, Snapshot};
pub use tuning::GameTuning;

/// Engine-wide constants
pub mod consts {
    /// Name used for the native data directory
    pub const APP_NAME: &str = "training-arcade";

    /// Default master clock period (20 Hz)
    pub const DEFAULT_TICK_MS: u64 = 50;

    /// Built-in tuning presets
    pub const PRESETS: [&str; 2] = ["inbox_triage", "meeting_defense"];
}
