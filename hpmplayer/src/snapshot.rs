use std::time::Duration;

use serde::Serialize;

/// Logical playback phase exposed to the UI.
///
/// `Idle` only exists before the first selection. After that, a new
/// selection always goes through `Buffering`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "reason")]
pub enum Phase {
    Idle,
    Buffering,
    Playing,
    Paused,
    Ended,
    Error(String),
}

impl Phase {
    pub fn is_error(&self) -> bool {
        matches!(self, Phase::Error(_))
    }

    /// Phases in which the engine holds loaded media.
    pub fn has_media(&self) -> bool {
        matches!(
            self,
            Phase::Buffering | Phase::Playing | Phase::Paused | Phase::Ended
        )
    }

    pub fn label(&self) -> &str {
        match self {
            Phase::Idle => "idle",
            Phase::Buffering => "buffering",
            Phase::Playing => "playing",
            Phase::Paused => "paused",
            Phase::Ended => "ended",
            Phase::Error(_) => "error",
        }
    }
}

/// Immutable view of the engine, republished on every effective change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineSnapshot {
    /// Incremented on every publish
    pub version: u64,
    pub phase: Phase,
    pub position: Duration,
    pub duration: Option<Duration>,
    pub is_live: bool,
}

impl Default for EngineSnapshot {
    fn default() -> Self {
        Self {
            version: 0,
            phase: Phase::Idle,
            position: Duration::ZERO,
            duration: None,
            is_live: false,
        }
    }
}

impl EngineSnapshot {
    /// Same observable state, ignoring `version`.
    pub fn same_state(&self, other: &EngineSnapshot) -> bool {
        self.phase == other.phase
            && self.position == other.position
            && self.duration == other.duration
            && self.is_live == other.is_live
    }

    /// Whether position, duration and seek controls should be shown.
    pub fn shows_timeline(&self) -> bool {
        !self.is_live && self.phase.has_media()
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.duration.map(|d| d.saturating_sub(self.position))
    }
}
