//! Engine snapshot bridge.
//!
//! [`SnapshotPublisher`] is the single writer of [`EngineSnapshot`]s. It folds
//! raw engine fields into a [`Phase`] and publishes at most one new snapshot
//! per engine event, and only when something observable changed.
//!
//! [`SnapshotBridge`] is one attachment to one engine: it registers exactly one
//! listener, seeds the publisher from the engine's current status, and
//! unregisters the listener on detach or drop. Callbacks that arrive after
//! detach are discarded.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, trace, warn};

use crate::engine::{
    EngineChange, EngineEvent, EngineListener, EngineState, EngineStatus, ListenerId,
    PlaybackEngine,
};
use crate::snapshot::{EngineSnapshot, Phase};

pub(crate) const LIVE_ENDED_REASON: &str = "live stream ended";
pub(crate) const SESSION_LOST_REASON: &str = "playback session lost";

/// Raw engine fields, as last reported.
#[derive(Debug, Clone)]
struct FoldState {
    session_active: bool,
    /// Set by a new load until the engine acknowledges it
    awaiting_load: bool,
    is_live: bool,
    state: EngineState,
    is_playing: bool,
    position: Duration,
    duration: Option<Duration>,
    error: Option<String>,
}

impl Default for FoldState {
    fn default() -> Self {
        Self {
            session_active: false,
            awaiting_load: false,
            is_live: false,
            state: EngineState::Idle,
            is_playing: false,
            position: Duration::ZERO,
            duration: None,
            error: None,
        }
    }
}

/// Whether `event` is the engine taking up a newly loaded media.
fn acknowledges_load(event: &EngineEvent) -> bool {
    event.changes.iter().any(|change| {
        matches!(
            change,
            EngineChange::State(EngineState::Buffering | EngineState::Ready)
        )
    })
}

impl FoldState {
    fn absorb(&mut self, change: &EngineChange) {
        match change {
            EngineChange::State(state) => self.state = *state,
            EngineChange::IsPlaying(playing) => self.is_playing = *playing,
            EngineChange::Position(position) => self.position = *position,
            EngineChange::Duration(duration) => self.duration = *duration,
            EngineChange::Error(error) => self.error = error.clone(),
        }
    }

    fn phase(&self, previous: &Phase) -> Phase {
        if let Some(reason) = &self.error {
            return Phase::Error(reason.clone());
        }
        match self.state {
            EngineState::Ended if self.is_live => Phase::Error(LIVE_ENDED_REASON.to_string()),
            EngineState::Ended => Phase::Ended,
            EngineState::Buffering => Phase::Buffering,
            EngineState::Ready if self.is_playing => Phase::Playing,
            EngineState::Ready => Phase::Paused,
            // Un stop suivi d'un nouveau chargement repasse par Buffering
            EngineState::Idle if self.session_active => previous.clone(),
            EngineState::Idle => Phase::Idle,
        }
    }

    fn snapshot(&self, previous: &EngineSnapshot) -> EngineSnapshot {
        EngineSnapshot {
            version: previous.version,
            phase: self.phase(&previous.phase),
            position: self.position,
            duration: if self.is_live { None } else { self.duration },
            is_live: self.is_live,
        }
    }
}

/// Single writer of engine snapshots.
pub struct SnapshotPublisher {
    fold: Mutex<FoldState>,
    tx: watch::Sender<Arc<EngineSnapshot>>,
}

impl Default for SnapshotPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotPublisher {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Arc::new(EngineSnapshot::default()));
        Self {
            fold: Mutex::new(FoldState::default()),
            tx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, FoldState> {
        self.fold.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn current(&self) -> Arc<EngineSnapshot> {
        self.tx.borrow().clone()
    }

    /// ```rust
    /// use hpmplayer::{Phase, SnapshotPublisher};
    ///
    /// # tokio_test::block_on(async {
    /// let publisher = SnapshotPublisher::new();
    /// let mut rx = publisher.subscribe();
    ///
    /// publisher.begin_session(false);
    /// rx.changed().await.unwrap();
    /// assert_eq!(rx.borrow().phase, Phase::Buffering);
    /// assert_eq!(rx.borrow().version, 1);
    /// # });
    /// ```
    pub fn subscribe(&self) -> watch::Receiver<Arc<EngineSnapshot>> {
        self.tx.subscribe()
    }

    /// Must be called with the fold lock held, so publishes keep event order.
    fn publish(&self, fold: &FoldState) -> bool {
        self.tx.send_if_modified(|current| {
            let candidate = fold.snapshot(current);
            if candidate.same_state(current) {
                return false;
            }
            trace!(phase = candidate.phase.label(), version = current.version + 1, "Snapshot published");
            *current = Arc::new(EngineSnapshot {
                version: current.version + 1,
                ..candidate
            });
            true
        })
    }

    /// Folds one engine event into at most one new snapshot.
    ///
    /// Between a new load and the engine's first `Buffering` or `Ready` for
    /// it, events still describe the previous media and are discarded.
    pub fn apply(&self, event: &EngineEvent) -> bool {
        let mut fold = self.lock();
        if fold.awaiting_load {
            if !acknowledges_load(event) {
                trace!("Dropping engine event from the previous media");
                return false;
            }
            fold.awaiting_load = false;
            fold.error = None;
        }
        for change in &event.changes {
            fold.absorb(change);
        }
        self.publish(&fold)
    }

    /// Starts a new load: `Buffering`, position zero, no duration, no error.
    pub fn begin_session(&self, is_live: bool) -> bool {
        let mut fold = self.lock();
        *fold = FoldState {
            session_active: true,
            awaiting_load: true,
            is_live,
            state: EngineState::Buffering,
            ..FoldState::default()
        };
        self.publish(&fold)
    }

    /// Records an engine command failure.
    pub fn fail(&self, reason: impl Into<String>) -> bool {
        let mut fold = self.lock();
        fold.error = Some(reason.into());
        self.publish(&fold)
    }

    /// Adopts the state of a freshly attached engine.
    ///
    /// An idle engine under an existing selection means the session it was
    /// playing is gone; that surfaces as an error so the UI offers a retry.
    pub fn seed(&self, status: &EngineStatus, is_live: bool) -> bool {
        let mut fold = self.lock();
        fold.is_live = is_live;
        fold.awaiting_load = false;
        let lost = fold.session_active && status.state == EngineState::Idle && status.error.is_none();
        for change in &status.to_event().changes {
            fold.absorb(change);
        }
        if status.state != EngineState::Idle {
            fold.session_active = true;
        }
        if lost {
            fold.error = Some(SESSION_LOST_REASON.to_string());
        }
        self.publish(&fold)
    }
}

struct BridgeListener {
    publisher: Arc<SnapshotPublisher>,
    active: AtomicBool,
}

impl EngineListener for BridgeListener {
    fn on_event(&self, event: &EngineEvent) {
        if !self.active.load(Ordering::Acquire) {
            trace!("Dropping engine event received after detach");
            return;
        }
        self.publisher.apply(event);
    }
}

/// One listener registration on one engine instance.
pub struct SnapshotBridge {
    engine: Weak<dyn PlaybackEngine>,
    listener: Arc<BridgeListener>,
    listener_id: ListenerId,
}

impl SnapshotBridge {
    /// Registers the listener and seeds the publisher from `engine.status()`.
    pub fn attach(
        engine: &Arc<dyn PlaybackEngine>,
        publisher: Arc<SnapshotPublisher>,
        is_live: bool,
    ) -> Self {
        let listener = Arc::new(BridgeListener {
            publisher: publisher.clone(),
            active: AtomicBool::new(true),
        });
        let listener_id = engine.add_listener(listener.clone());
        publisher.seed(&engine.status(), is_live);
        debug!(listener = listener_id.0, "Snapshot bridge attached");

        Self {
            engine: Arc::downgrade(engine),
            listener,
            listener_id,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.listener.active.load(Ordering::Acquire)
    }

    /// Whether this bridge is bound to `engine`.
    pub fn is_bound_to(&self, engine: &Arc<dyn PlaybackEngine>) -> bool {
        self.is_attached() && Weak::ptr_eq(&self.engine, &Arc::downgrade(engine))
    }

    /// Unregisters the listener. Safe to call more than once, and after the
    /// engine itself has been dropped.
    pub fn detach(&self) {
        if !self.listener.active.swap(false, Ordering::AcqRel) {
            return;
        }
        match self.engine.upgrade() {
            Some(engine) => {
                engine.remove_listener(self.listener_id);
                debug!(listener = self.listener_id.0, "Snapshot bridge detached");
            }
            None => warn!(
                listener = self.listener_id.0,
                "Engine already released while detaching"
            ),
        }
    }
}

impl Drop for SnapshotBridge {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(changes: Vec<EngineChange>) -> EngineEvent {
        EngineEvent::new(changes)
    }

    #[test]
    fn test_initial_snapshot_is_idle() {
        let publisher = SnapshotPublisher::new();
        let snap = publisher.current();
        assert_eq!(snap.phase, Phase::Idle);
        assert_eq!(snap.version, 0);
    }

    #[test]
    fn test_one_publish_per_event() {
        let publisher = SnapshotPublisher::new();
        publisher.begin_session(false);
        let before = publisher.current().version;

        publisher.apply(&ev(vec![
            EngineChange::State(EngineState::Ready),
            EngineChange::IsPlaying(true),
            EngineChange::Duration(Some(Duration::from_secs(300))),
            EngineChange::Position(Duration::from_secs(1)),
        ]));

        let snap = publisher.current();
        assert_eq!(snap.version, before + 1);
        assert_eq!(snap.phase, Phase::Playing);
        assert_eq!(snap.duration, Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_unchanged_event_not_published() {
        let publisher = SnapshotPublisher::new();
        publisher.begin_session(false);
        publisher.apply(&ev(vec![EngineChange::State(EngineState::Ready)]));
        let version = publisher.current().version;

        assert!(!publisher.apply(&ev(vec![EngineChange::State(EngineState::Ready)])));
        assert_eq!(publisher.current().version, version);
    }

    #[test]
    fn test_idle_ignored_once_session_started() {
        let publisher = SnapshotPublisher::new();
        publisher.begin_session(false);
        publisher.apply(&ev(vec![
            EngineChange::State(EngineState::Ready),
            EngineChange::IsPlaying(false),
        ]));
        publisher.apply(&ev(vec![EngineChange::State(EngineState::Idle)]));
        assert_eq!(publisher.current().phase, Phase::Paused);
    }

    #[test]
    fn test_live_end_is_error() {
        let publisher = SnapshotPublisher::new();
        publisher.begin_session(true);
        publisher.apply(&ev(vec![EngineChange::State(EngineState::Ready)]));
        publisher.apply(&ev(vec![EngineChange::State(EngineState::Ended)]));
        assert_eq!(
            publisher.current().phase,
            Phase::Error(LIVE_ENDED_REASON.to_string())
        );
    }

    #[test]
    fn test_live_duration_hidden() {
        let publisher = SnapshotPublisher::new();
        publisher.begin_session(true);
        publisher.apply(&ev(vec![
            EngineChange::State(EngineState::Buffering),
            EngineChange::Duration(Some(Duration::from_secs(5))),
        ]));
        assert_eq!(publisher.current().duration, None);
    }

    #[test]
    fn test_error_then_new_session() {
        let publisher = SnapshotPublisher::new();
        publisher.begin_session(false);
        publisher.apply(&ev(vec![
            EngineChange::State(EngineState::Buffering),
            EngineChange::Error(Some("404".into())),
        ]));
        assert!(publisher.current().phase.is_error());

        publisher.begin_session(false);
        assert_eq!(publisher.current().phase, Phase::Buffering);
    }

    #[test]
    fn test_previous_media_events_dropped_until_load_acknowledged() {
        let publisher = SnapshotPublisher::new();
        publisher.begin_session(false);
        publisher.apply(&ev(vec![
            EngineChange::State(EngineState::Ready),
            EngineChange::IsPlaying(true),
            EngineChange::Position(Duration::from_secs(80)),
        ]));

        publisher.begin_session(true);
        let version = publisher.current().version;
        assert!(!publisher.apply(&ev(vec![EngineChange::Error(Some("late".into()))])));
        assert!(!publisher.apply(&ev(vec![EngineChange::Position(Duration::from_secs(81))])));
        assert_eq!(publisher.current().version, version);
        assert_eq!(publisher.current().phase, Phase::Buffering);

        publisher.apply(&ev(vec![EngineChange::State(EngineState::Buffering)]));
        publisher.apply(&ev(vec![
            EngineChange::State(EngineState::Ready),
            EngineChange::IsPlaying(true),
        ]));
        let snap = publisher.current();
        assert_eq!(snap.phase, Phase::Playing);
        assert_eq!(snap.position, Duration::ZERO);
    }

    #[test]
    fn test_load_error_in_acknowledging_event_kept() {
        let publisher = SnapshotPublisher::new();
        publisher.begin_session(false);
        publisher.apply(&ev(vec![
            EngineChange::State(EngineState::Buffering),
            EngineChange::Error(Some("unsupported format".into())),
        ]));
        assert_eq!(
            publisher.current().phase,
            Phase::Error("unsupported format".into())
        );
    }

    #[test]
    fn test_seed_running_engine() {
        let publisher = SnapshotPublisher::new();
        let status = EngineStatus {
            state: EngineState::Ready,
            is_playing: true,
            position: Duration::from_secs(42),
            duration: Some(Duration::from_secs(600)),
            error: None,
        };
        publisher.seed(&status, false);
        let snap = publisher.current();
        assert_eq!(snap.phase, Phase::Playing);
        assert_eq!(snap.position, Duration::from_secs(42));

        // Puis le moteur s'arrête : Idle n'est plus jamais publié
        publisher.apply(&ev(vec![EngineChange::State(EngineState::Idle)]));
        assert_eq!(publisher.current().phase, Phase::Playing);
    }

    #[test]
    fn test_seed_idle_engine_after_session_reports_loss() {
        let publisher = SnapshotPublisher::new();
        publisher.begin_session(false);
        publisher.seed(&EngineStatus::default(), false);
        assert_eq!(
            publisher.current().phase,
            Phase::Error(SESSION_LOST_REASON.to_string())
        );
    }

    #[test]
    fn test_seed_idle_engine_without_session() {
        let publisher = SnapshotPublisher::new();
        assert!(!publisher.seed(&EngineStatus::default(), false));
        assert_eq!(publisher.current().phase, Phase::Idle);
    }
}
