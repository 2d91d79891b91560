//! Playback engine contract.
//!
//! The engine is the platform media player: it decodes, buffers, streams and
//! owns the lock screen session. The coordinator drives it through
//! [`PlaybackEngine`] and learns what actually happens through
//! [`EngineListener`] callbacks.
//!
//! Commands return as soon as they are dispatched. Their effect arrives later
//! as one [`EngineEvent`] per engine notification, delivered in emission
//! order, possibly from an engine thread.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;

use crate::errors::EngineError;
use crate::media::MediaDescriptor;

/// Relative seek step used when an engine does not define its own.
pub const DEFAULT_SEEK_INCREMENT: Duration = Duration::from_secs(15);

/// Raw engine state, before it is folded into a [`crate::Phase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EngineState {
    /// Nothing loaded, or stopped
    Idle,
    /// Loading or rebuffering
    Buffering,
    /// Media ready; playing or paused depending on `is_playing`
    Ready,
    /// Reached the end of the media
    Ended,
}

/// One field reported by an engine notification.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineChange {
    State(EngineState),
    IsPlaying(bool),
    /// Position after a discontinuity or a progress tick
    Position(Duration),
    /// Known media duration; `None` while unknown or for live media
    Duration(Option<Duration>),
    /// `Some` reports a playback error, `None` clears it
    Error(Option<String>),
}

/// Everything an engine reported in one notification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineEvent {
    pub changes: Vec<EngineChange>,
}

impl EngineEvent {
    pub fn new(changes: Vec<EngineChange>) -> Self {
        Self { changes }
    }

    pub fn single(change: EngineChange) -> Self {
        Self {
            changes: vec![change],
        }
    }
}

/// Current engine state, read once when a coordinator attaches.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineStatus {
    pub state: EngineState,
    pub is_playing: bool,
    pub position: Duration,
    pub duration: Option<Duration>,
    pub error: Option<String>,
}

impl Default for EngineStatus {
    fn default() -> Self {
        Self {
            state: EngineState::Idle,
            is_playing: false,
            position: Duration::ZERO,
            duration: None,
            error: None,
        }
    }
}

impl EngineStatus {
    /// Replays this status as a single event.
    pub fn to_event(&self) -> EngineEvent {
        EngineEvent::new(vec![
            EngineChange::State(self.state),
            EngineChange::IsPlaying(self.is_playing),
            EngineChange::Position(self.position),
            EngineChange::Duration(self.duration),
            EngineChange::Error(self.error.clone()),
        ])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

pub trait EngineListener: Send + Sync {
    fn on_event(&self, event: &EngineEvent);
}

pub trait PlaybackEngine: Send + Sync {
    /// Replaces the current media. The first event about the new media must
    /// carry `State(Buffering)` or `State(Ready)`; anything reported before
    /// that is taken to concern the previous one.
    fn load(&self, media: &MediaDescriptor) -> Result<(), EngineError>;
    fn play(&self) -> Result<(), EngineError>;
    fn pause(&self) -> Result<(), EngineError>;
    fn stop(&self) -> Result<(), EngineError>;
    fn seek(&self, position: Duration) -> Result<(), EngineError>;

    fn seek_back_increment(&self) -> Duration {
        DEFAULT_SEEK_INCREMENT
    }

    fn seek_forward_increment(&self) -> Duration {
        DEFAULT_SEEK_INCREMENT
    }

    fn status(&self) -> EngineStatus;

    fn add_listener(&self, listener: Arc<dyn EngineListener>) -> ListenerId;

    /// Unknown ids are ignored.
    fn remove_listener(&self, id: ListenerId);
}

/// Listener bookkeeping for engine implementations.
///
/// Listeners are invoked outside the internal lock, so a listener may call
/// back into the engine.
#[derive(Default)]
pub struct ListenerSet {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(ListenerId, Arc<dyn EngineListener>)>>,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, listener: Arc<dyn EngineListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        id
    }

    pub fn remove(&self, id: ListenerId) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(lid, _)| *lid != id);
    }

    pub fn len(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn emit(&self, event: &EngineEvent) {
        let targets: Vec<Arc<dyn EngineListener>> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        for listener in targets {
            listener.on_event(event);
        }
    }
}
