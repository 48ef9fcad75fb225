//! Wave checkpoints
//!
//! A static table maps clock checkpoints to a new wave number and spawn
//! interval. The cursor only ever moves forward, so a checkpoint fires once
//! per session no matter how often the clock samples past it.

use serde::{Deserialize, Serialize};

use super::state::{GameEvent, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveCheckpoint {
    /// Session clock time at which the wave begins
    pub at_ms: u64,
    pub wave: u32,
    pub spawn_interval_ms: u64,
}

/// Tracks which checkpoints have already fired
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WaveScheduler {
    cursor: usize,
}

impl WaveScheduler {
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Number of checkpoints already applied
    pub fn advanced(&self) -> usize {
        self.cursor
    }

    /// Next checkpoint crossed by `clock_ms` that has not fired yet
    pub fn poll(&mut self, table: &[WaveCheckpoint], clock_ms: u64) -> Option<WaveCheckpoint> {
        let next = table.get(self.cursor)?;
        if clock_ms < next.at_ms {
            return None;
        }
        self.cursor += 1;
        Some(*next)
    }
}

/// Apply every checkpoint the clock has crossed since the last call
pub(crate) fn advance_waves(session: &mut Session) {
    while let Some(checkpoint) = session.waves.poll(&session.tuning.waves, session.clock_ms) {
        session.wave = checkpoint.wave;
        session
            .spawner
            .configure(checkpoint.spawn_interval_ms, checkpoint.wave);
        log::info!(
            "Wave {} at {}ms (spawn every {}ms)",
            checkpoint.wave,
            session.clock_ms,
            checkpoint.spawn_interval_ms
        );
        session.push_event(GameEvent::WaveAdvanced {
            wave: checkpoint.wave,
            spawn_interval_ms: checkpoint.spawn_interval_ms,
        });
    }
}
