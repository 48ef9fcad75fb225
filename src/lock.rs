//! Active-session lock
//!
//! Two live instances of the same game sharing one store (two browser tabs,
//! two CLI runs) would race on the personal best. The owner writes a
//! heartbeat every `HEARTBEAT_INTERVAL_MS`; a heartbeat older than
//! `STALE_AFTER_MS` is treated as abandoned and may be taken over.

use std::cell::Cell;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::storage::{KeyValueStore, load_json, save_json};

pub const HEARTBEAT_INTERVAL_MS: u64 = 1000;
pub const STALE_AFTER_MS: u64 = 3000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct Heartbeat {
    owner: u64,
    at_ms: u64,
}

/// Heartbeat lock on one game id
#[derive(Debug)]
pub struct SessionLock<S: KeyValueStore> {
    store: S,
    key: String,
    owner: u64,
    held: bool,
    last_beat_ms: Option<u64>,
    warned: Cell<bool>,
}

impl<S: KeyValueStore> SessionLock<S> {
    /// `owner` must be unique per running instance
    pub fn new(store: S, game_id: &str, owner: u64) -> Self {
        Self {
            store,
            key: format!("{}_active", game_id),
            owner,
            held: false,
            last_beat_ms: None,
            warned: Cell::new(false),
        }
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    /// Heartbeats run every second; a broken store is reported once
    fn warn_once(&self, what: &str, err: &dyn fmt::Display) {
        if !self.warned.replace(true) {
            log::warn!("Session lock {} failed for {}: {}", what, self.key, err);
        } else {
            log::debug!("Session lock {} failed for {}: {}", what, self.key, err);
        }
    }

    fn read(&self) -> Option<Heartbeat> {
        match load_json(&self.store, &self.key) {
            Ok(beat) => beat,
            Err(e) => {
                self.warn_once("read", &e);
                None
            }
        }
    }

    fn write(&mut self, now_ms: u64) {
        let beat = Heartbeat {
            owner: self.owner,
            at_ms: now_ms,
        };
        if let Err(e) = save_json(&self.store, &self.key, &beat) {
            self.warn_once("write", &e);
        }
        self.last_beat_ms = Some(now_ms);
    }

    /// Claim the lock unless another owner has a fresh heartbeat
    pub fn try_acquire(&mut self, now_ms: u64) -> bool {
        if let Some(beat) = self.read() {
            let age = now_ms.saturating_sub(beat.at_ms);
            if beat.owner != self.owner && age < STALE_AFTER_MS {
                log::info!("{} is active elsewhere ({}ms ago)", self.key, age);
                self.held = false;
                return false;
            }
        }
        self.write(now_ms);
        self.held = true;
        true
    }

    /// Refresh the heartbeat if due. Returns false once the lock was taken over.
    pub fn heartbeat(&mut self, now_ms: u64) -> bool {
        if !self.held {
            return false;
        }
        if let Some(beat) = self.read() {
            if beat.owner != self.owner && Some(beat.at_ms) > self.last_beat_ms {
                log::warn!("{} taken over by another instance", self.key);
                self.held = false;
                return false;
            }
        }
        let due = self
            .last_beat_ms
            .is_none_or(|last| now_ms.saturating_sub(last) >= HEARTBEAT_INTERVAL_MS);
        if due {
            self.write(now_ms);
        }
        true
    }

    /// Drop the heartbeat if it is still ours
    pub fn release(&mut self) {
        if !self.held {
            return;
        }
        self.held = false;
        if self.read().is_some_and(|beat| beat.owner == self.owner) {
            if let Err(e) = self.store.remove(&self.key) {
                self.warn_once("release", &e);
            }
        }
    }
}

impl<S: KeyValueStore> Drop for SessionLock<S> {
    fn drop(&mut self) {
        self.release();
    }
}
