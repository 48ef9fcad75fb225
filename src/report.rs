//! Score reporting
//!
//! At game over the final score goes to the leaderboard service and the local
//! personal best is updated. Both are best-effort: failures are logged and the
//! game-over flow never sees them.

use std::cell::Cell;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::storage::{KeyValueStore, load_json, save_json};

/// Best result recorded on this device for one game
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalBest {
    pub score: u64,
    /// Game-specific second number (max combo, wave reached, items handled)
    #[serde(default)]
    pub secondary: u64,
}

impl PersonalBest {
    /// Fold in a finished session. Returns true if either field strictly improved.
    pub fn merge(&mut self, score: u64, secondary: u64) -> bool {
        let improved = score > self.score || secondary > self.secondary;
        self.score = self.score.max(score);
        self.secondary = self.secondary.max(secondary);
        improved
    }
}

/// Leaderboard submission failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    Network(String),
    Rejected { status: u16, message: String },
    /// No leaderboard configured (offline, signed out)
    Unavailable,
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::Network(msg) => write!(f, "network error: {}", msg),
            SubmitError::Rejected { status, message } => {
                write!(f, "score rejected ({}): {}", status, message)
            }
            SubmitError::Unavailable => write!(f, "leaderboard unavailable"),
        }
    }
}

impl std::error::Error for SubmitError {}

/// Remote leaderboard
pub trait ScoreSubmitter {
    fn submit_score(&mut self, game_id: &str, score: u64) -> Result<(), SubmitError>;
}

/// Leaderboard stand-in that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSubmitter;

impl ScoreSubmitter for LogSubmitter {
    fn submit_score(&mut self, game_id: &str, score: u64) -> Result<(), SubmitError> {
        log::info!("Leaderboard submit: {} = {}", game_id, score);
        Ok(())
    }
}

/// Local personal best persistence. Reads never fail; a broken store reads as empty.
pub trait PersonalBestStore {
    fn get(&self, game_id: &str) -> PersonalBest;
    fn set(&mut self, game_id: &str, best: PersonalBest);
}

/// Personal bests kept in a `KeyValueStore`
#[derive(Debug)]
pub struct KvPersonalBestStore<S> {
    store: S,
    warned: Cell<bool>,
}

impl<S: KeyValueStore> KvPersonalBestStore<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            warned: Cell::new(false),
        }
    }

    pub fn key(game_id: &str) -> String {
        format!("{}_best", game_id)
    }

    fn warn_once(&self, what: &str, err: &dyn fmt::Display) {
        if !self.warned.replace(true) {
            log::warn!("Personal best {} failed: {}", what, err);
        }
    }
}

impl<S: KeyValueStore> PersonalBestStore for KvPersonalBestStore<S> {
    fn get(&self, game_id: &str) -> PersonalBest {
        match load_json(&self.store, &Self::key(game_id)) {
            Ok(best) => best.unwrap_or_default(),
            Err(e) => {
                self.warn_once("load", &e);
                PersonalBest::default()
            }
        }
    }

    fn set(&mut self, game_id: &str, best: PersonalBest) {
        if let Err(e) = save_json(&self.store, &Self::key(game_id), &best) {
            self.warn_once("save", &e);
        }
    }
}

/// What the reporter did with a finished session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Report {
    pub previous_best: PersonalBest,
    pub personal_best: PersonalBest,
    pub new_best: bool,
    pub submitted: bool,
}

/// Game-over sink: personal best first, then the leaderboard
pub struct ScoreReporter<P, S> {
    bests: P,
    submitter: S,
}

impl<P: PersonalBestStore, S: ScoreSubmitter> ScoreReporter<P, S> {
    pub fn new(bests: P, submitter: S) -> Self {
        Self { bests, submitter }
    }

    pub fn personal_best(&self, game_id: &str) -> PersonalBest {
        self.bests.get(game_id)
    }

    pub fn submitter(&self) -> &S {
        &self.submitter
    }

    pub fn report(&mut self, game_id: &str, score: u64, secondary: u64) -> Report {
        let previous_best = self.bests.get(game_id);
        let mut personal_best = previous_best;
        let new_best = personal_best.merge(score, secondary);
        if new_best {
            log::info!(
                "New personal best for {}: {} ({})",
                game_id,
                personal_best.score,
                personal_best.secondary
            );
            self.bests.set(game_id, personal_best);
        }

        let submitted = match self.submitter.submit_score(game_id, score) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Score submission for {} failed: {}", game_id, e);
                false
            }
        };

        Report {
            previous_best,
            personal_best,
            new_best,
            submitted,
        }
    }
}
