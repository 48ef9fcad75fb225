//! Audio trigger points
//!
//! The engine never synthesizes sound. Game events map to named cues, and a
//! `CuePlayer` forwards them to whatever backend the host provides, applying
//! the player's volume settings and a per-cue debounce.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::settings::Settings;
use crate::sim::{GameEvent, SpeedBonus};

/// Default minimum gap between two plays of the same cue
pub const DEFAULT_DEBOUNCE_MS: u64 = 30;

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundCue {
    /// Session started
    Start,
    /// Input refused (boss without shield)
    Tap,
    /// Correct action
    Correct,
    /// Correct action inside the very-fast window
    Score,
    /// Wrong action
    Wrong,
    /// Entered a new combo tier
    Combo,
    /// Critical entity appeared
    Critical,
    /// Entity reached the boundary
    Fail,
    /// Entity expired unhandled
    Pass,
    /// Shield raised
    Shield,
    /// Boss bounced off the shield
    Zap,
    /// Power-up collected
    PowerUp,
    /// Slow motion kicked in
    Frenzy,
    /// Shield ready again
    Tick,
    /// Rank or wave up
    LevelUp,
    TimeWarning,
    GameOver,
    /// New personal best
    HighScore,
}

impl SoundCue {
    pub fn as_str(&self) -> &'static str {
        match self {
            SoundCue::Start => "start",
            SoundCue::Tap => "tap",
            SoundCue::Correct => "correct",
            SoundCue::Score => "score",
            SoundCue::Wrong => "wrong",
            SoundCue::Combo => "combo",
            SoundCue::Critical => "critical",
            SoundCue::Fail => "fail",
            SoundCue::Pass => "pass",
            SoundCue::Shield => "shield",
            SoundCue::Zap => "zap",
            SoundCue::PowerUp => "power_up",
            SoundCue::Frenzy => "frenzy",
            SoundCue::Tick => "tick",
            SoundCue::LevelUp => "level_up",
            SoundCue::TimeWarning => "time_warning",
            SoundCue::GameOver => "game_over",
            SoundCue::HighScore => "high_score",
        }
    }
}

/// Cue for an engine event, if it has one
pub fn cue_for(event: &GameEvent) -> Option<SoundCue> {
    let cue = match event {
        GameEvent::Started => SoundCue::Start,
        GameEvent::Spawned {
            is_critical: true, ..
        } => SoundCue::Critical,
        GameEvent::Correct {
            speed: SpeedBonus::VeryFast,
            ..
        } => SoundCue::Score,
        GameEvent::Correct { .. } => SoundCue::Correct,
        GameEvent::Wrong { .. } => SoundCue::Wrong,
        GameEvent::NeedsAbility { .. } => SoundCue::Tap,
        GameEvent::ComboTier { .. } => SoundCue::Combo,
        GameEvent::Impact { .. } => SoundCue::Fail,
        GameEvent::Expired { .. } => SoundCue::Pass,
        GameEvent::Blocked { .. } => SoundCue::Zap,
        GameEvent::AbilityActivated { .. } => SoundCue::Shield,
        GameEvent::AbilityReady => SoundCue::Tick,
        GameEvent::PowerUpCollected { .. } => SoundCue::PowerUp,
        GameEvent::SlowMotionStarted => SoundCue::Frenzy,
        GameEvent::WaveAdvanced { .. } | GameEvent::RankUp { .. } => SoundCue::LevelUp,
        GameEvent::TimeWarning => SoundCue::TimeWarning,
        GameEvent::GameOver { .. } => SoundCue::GameOver,
        GameEvent::Spawned { .. }
        | GameEvent::PowerUpSpawned { .. }
        | GameEvent::ComboLost { .. }
        | GameEvent::AbilityEnded
        | GameEvent::SlowMotionEnded => return None,
    };
    Some(cue)
}

/// Host audio backend
pub trait CueSink {
    fn play(&mut self, cue: SoundCue, volume: f32);
}

/// Backend that only logs cue names
#[derive(Debug, Default, Clone, Copy)]
pub struct LogCueSink;

impl CueSink for LogCueSink {
    fn play(&mut self, cue: SoundCue, volume: f32) {
        log::trace!("cue {} @ {:.2}", cue.as_str(), volume);
    }
}

/// Volume-aware, debounced cue dispatcher
#[derive(Debug)]
pub struct CuePlayer<K> {
    sink: K,
    volume: f32,
    debounce_ms: u64,
    last_played: HashMap<SoundCue, u64>,
}

impl<K: CueSink> CuePlayer<K> {
    pub fn new(sink: K, settings: &Settings) -> Self {
        Self {
            sink,
            volume: settings.effective_volume(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            last_played: HashMap::new(),
        }
    }

    pub fn with_debounce(mut self, debounce_ms: u64) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }

    /// Pick up volume/mute changes
    pub fn apply_settings(&mut self, settings: &Settings) {
        self.volume = settings.effective_volume();
    }

    pub fn is_muted(&self) -> bool {
        self.volume <= 0.0
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Play a cue unless muted or played within the debounce window
    pub fn play(&mut self, cue: SoundCue, now_ms: u64) -> bool {
        if self.is_muted() {
            return false;
        }
        if let Some(&last) = self.last_played.get(&cue) {
            if now_ms.saturating_sub(last) < self.debounce_ms {
                return false;
            }
        }
        self.last_played.insert(cue, now_ms);
        self.sink.play(cue, self.volume);
        true
    }

    /// Play the cues for a batch of events. Returns how many were played.
    pub fn handle_events(&mut self, events: &[GameEvent], now_ms: u64) -> usize {
        events
            .iter()
            .filter_map(cue_for)
            .filter(|&cue| self.play(cue, now_ms))
            .count()
    }
}
