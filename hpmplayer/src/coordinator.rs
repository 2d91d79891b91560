//! Playback state coordinator.
//!
//! The coordinator owns the current [`PlaybackSelection`] and decides, for each
//! UI intent, whether the engine must load new media, resume, pause or seek.
//! It never writes the phase from a command: the snapshot only moves through
//! the [`SnapshotPublisher`], fed by engine callbacks, a new load, or a command
//! failure.
//!
//! The engine is borrowed: the coordinator keeps a [`Weak`] reference to the
//! instance supplied through [`PlaybackCoordinator::attach`] and never keeps
//! it alive on its own.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Weak};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::bridge::{SnapshotBridge, SnapshotPublisher};
use crate::engine::PlaybackEngine;
use crate::errors::{EngineError, PlayerError};
use crate::item::{PlayableItem, PlaybackSelection};
use crate::media::MediaDescriptor;
use crate::snapshot::{EngineSnapshot, Phase};
use crate::time_utils::clamp_position;

/// What `toggle_pause` does with a paused live stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LivePausePolicy {
    /// Keep the stream loaded and resume with `play()`.
    #[default]
    Resume,
    /// Reload the stream so playback rejoins the live edge.
    Reload,
}

impl fmt::Display for LivePausePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LivePausePolicy::Resume => write!(f, "resume"),
            LivePausePolicy::Reload => write!(f, "reload"),
        }
    }
}

impl FromStr for LivePausePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "resume" => Ok(LivePausePolicy::Resume),
            "reload" => Ok(LivePausePolicy::Reload),
            other => Err(format!("unknown live pause policy: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoordinatorOptions {
    pub live_pause_policy: LivePausePolicy,
}

/// Why a command had no effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum NoOpReason {
    /// Seeking is meaningless on a live stream
    LiveStream,
    NothingSelected,
    PhaseHasNoEffect(Phase),
}

/// What a command actually dispatched to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CommandOutcome {
    /// A transport command (pause) was sent
    Dispatched,
    /// The loaded media was resumed with `play()`
    Resumed,
    /// New media was loaded (stop, load, play)
    Loaded,
    /// A seek to the given, already clamped, position was sent
    Seeking(Duration),
    Ignored(NoOpReason),
}

impl CommandOutcome {
    pub fn is_ignored(&self) -> bool {
        matches!(self, CommandOutcome::Ignored(_))
    }
}

pub struct PlaybackCoordinator {
    options: CoordinatorOptions,
    engine: Option<Weak<dyn PlaybackEngine>>,
    bridge: Option<SnapshotBridge>,
    publisher: Arc<SnapshotPublisher>,
    selection_tx: watch::Sender<Option<Arc<PlaybackSelection>>>,
}

impl Default for PlaybackCoordinator {
    fn default() -> Self {
        Self::new(CoordinatorOptions::default())
    }
}

impl PlaybackCoordinator {
    pub fn new(options: CoordinatorOptions) -> Self {
        let (selection_tx, _) = watch::channel(None);
        Self {
            options,
            engine: None,
            bridge: None,
            publisher: Arc::new(SnapshotPublisher::new()),
            selection_tx,
        }
    }

    pub fn options(&self) -> CoordinatorOptions {
        self.options
    }

    // ---------------------------------------------------------------
    // Readers
    // ---------------------------------------------------------------

    pub fn current_snapshot(&self) -> Arc<EngineSnapshot> {
        self.publisher.current()
    }

    pub fn selection(&self) -> Option<Arc<PlaybackSelection>> {
        self.selection_tx.borrow().clone()
    }

    pub fn subscribe_snapshot(&self) -> watch::Receiver<Arc<EngineSnapshot>> {
        self.publisher.subscribe()
    }

    pub fn subscribe_selection(&self) -> watch::Receiver<Option<Arc<PlaybackSelection>>> {
        self.selection_tx.subscribe()
    }

    /// True while the current selection is a live stream.
    pub fn is_live(&self) -> bool {
        self.selection()
            .map(|s| s.item.is_live())
            .unwrap_or(false)
    }

    // ---------------------------------------------------------------
    // Engine binding
    // ---------------------------------------------------------------

    /// Binds to `engine`, replacing any previous attachment.
    ///
    /// Attaching the instance that is already bound is a no-op.
    pub fn attach(&mut self, engine: &Arc<dyn PlaybackEngine>) {
        if let Some(bridge) = &self.bridge {
            if bridge.is_bound_to(engine) {
                debug!("Engine already attached");
                return;
            }
        }
        self.detach();

        let bridge = SnapshotBridge::attach(engine, self.publisher.clone(), self.is_live());
        self.engine = Some(Arc::downgrade(engine));
        self.bridge = Some(bridge);
        info!(
            phase = self.current_snapshot().phase.label(),
            "Playback engine attached"
        );
    }

    /// Releases the engine listener. Calling it again does nothing.
    pub fn detach(&mut self) {
        self.engine = None;
        if let Some(bridge) = self.bridge.take() {
            bridge.detach();
            info!("Playback engine detached");
        }
    }

    pub fn is_attached(&self) -> bool {
        self.bridge.as_ref().is_some_and(SnapshotBridge::is_attached)
            && self.engine.as_ref().is_some_and(|e| e.strong_count() > 0)
    }

    fn engine(&self) -> Result<Arc<dyn PlaybackEngine>, PlayerError> {
        self.engine
            .as_ref()
            .and_then(Weak::upgrade)
            .ok_or(PlayerError::Detached)
    }

    /// Turns an engine failure into an `Error` phase and an error result.
    fn engine_failed(&self, command: &str, err: EngineError) -> PlayerError {
        warn!(command, "Engine command failed: {}", err);
        self.publisher.fail(err.0.clone());
        PlayerError::Engine(err)
    }

    // ---------------------------------------------------------------
    // Commands
    // ---------------------------------------------------------------

    /// Starts `item`, or resumes it when it is the paused current selection.
    pub fn select_and_play(
        &mut self,
        item: PlayableItem,
        origin_index: i64,
    ) -> Result<CommandOutcome, PlayerError> {
        let descriptor = MediaDescriptor::from_item(&item)?;
        let engine = self.engine()?;
        let identity = item.identity();

        let same_item = self
            .selection()
            .is_some_and(|current| current.identity() == identity);
        let phase = self.current_snapshot().phase.clone();

        if same_item && phase == Phase::Paused && !self.reloads_on_resume(&item) {
            debug!(item = %identity, "Same item paused, resuming");
            engine.play().map_err(|e| self.engine_failed("play", e))?;
            return Ok(CommandOutcome::Resumed);
        }

        info!(item = %identity, origin = origin_index, "Loading {}", item.display_name());
        self.load(&engine, descriptor, PlaybackSelection::new(item, origin_index))?;
        Ok(CommandOutcome::Loaded)
    }

    /// Pauses while playing or buffering, resumes while paused.
    pub fn toggle_pause(&mut self) -> Result<CommandOutcome, PlayerError> {
        let phase = self.current_snapshot().phase.clone();
        match phase {
            Phase::Playing | Phase::Buffering => {
                let engine = self.engine()?;
                engine.pause().map_err(|e| self.engine_failed("pause", e))?;
                Ok(CommandOutcome::Dispatched)
            }
            Phase::Paused => {
                let engine = self.engine()?;
                if let Some(selection) = self.selection() {
                    if self.reloads_on_resume(&selection.item) {
                        debug!(item = %selection.identity(), "Reloading live stream on resume");
                        let descriptor = MediaDescriptor::from_item(&selection.item)?;
                        self.load(&engine, descriptor, (*selection).clone())?;
                        return Ok(CommandOutcome::Loaded);
                    }
                }
                engine.play().map_err(|e| self.engine_failed("play", e))?;
                Ok(CommandOutcome::Resumed)
            }
            other => {
                debug!(phase = other.label(), "Toggle ignored");
                Ok(CommandOutcome::Ignored(NoOpReason::PhaseHasNoEffect(other)))
            }
        }
    }

    /// Seeks the current episode to `position`, clamped to its duration.
    pub fn seek(&mut self, position: Duration) -> Result<CommandOutcome, PlayerError> {
        let selection = match self.seekable_selection() {
            Ok(selection) => selection,
            Err(reason) => return Ok(CommandOutcome::Ignored(reason)),
        };
        let snapshot = self.current_snapshot();
        if !snapshot.phase.has_media() {
            return Ok(CommandOutcome::Ignored(NoOpReason::PhaseHasNoEffect(
                snapshot.phase.clone(),
            )));
        }

        let known_duration = snapshot.duration.or_else(|| selection.item.duration());
        let target = clamp_position(position, known_duration);
        let engine = self.engine()?;
        engine
            .seek(target)
            .map_err(|e| self.engine_failed("seek", e))?;
        debug!(target_ms = target.as_millis() as u64, "Seek dispatched");
        Ok(CommandOutcome::Seeking(target))
    }

    /// Jumps forward by the engine's increment.
    pub fn skip_forward(&mut self) -> Result<CommandOutcome, PlayerError> {
        if let Err(reason) = self.seekable_selection() {
            return Ok(CommandOutcome::Ignored(reason));
        }
        let step = self.engine()?.seek_forward_increment();
        let target = self.current_snapshot().position.saturating_add(step);
        self.seek(target)
    }

    /// Jumps backward by the engine's increment, stopping at zero.
    pub fn skip_backward(&mut self) -> Result<CommandOutcome, PlayerError> {
        if let Err(reason) = self.seekable_selection() {
            return Ok(CommandOutcome::Ignored(reason));
        }
        let step = self.engine()?.seek_back_increment();
        let target = self.current_snapshot().position.saturating_sub(step);
        self.seek(target)
    }

    /// The current selection, if it is something that can be sought in.
    fn seekable_selection(&self) -> Result<Arc<PlaybackSelection>, NoOpReason> {
        let Some(selection) = self.selection() else {
            return Err(NoOpReason::NothingSelected);
        };
        if selection.item.is_live() {
            debug!(item = %selection.identity(), "Seek ignored on live stream");
            return Err(NoOpReason::LiveStream);
        }
        Ok(selection)
    }

    fn reloads_on_resume(&self, item: &PlayableItem) -> bool {
        item.is_live() && self.options.live_pause_policy == LivePausePolicy::Reload
    }

    /// Replace the selection, publish `Buffering`, then stop, load, play.
    ///
    /// The selection is replaced first so that a failing engine command still
    /// leaves it pointing at the attempted item.
    fn load(
        &mut self,
        engine: &Arc<dyn PlaybackEngine>,
        descriptor: MediaDescriptor,
        selection: PlaybackSelection,
    ) -> Result<(), PlayerError> {
        self.selection_tx.send_replace(Some(Arc::new(selection)));
        self.publisher.begin_session(descriptor.is_live);

        engine.stop().map_err(|e| self.engine_failed("stop", e))?;
        engine
            .load(&descriptor)
            .map_err(|e| self.engine_failed("load", e))?;
        engine.play().map_err(|e| self.engine_failed("play", e))?;
        Ok(())
    }
}

impl Drop for PlaybackCoordinator {
    fn drop(&mut self) {
        self.detach();
    }
}
