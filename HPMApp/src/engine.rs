//! Simulated playback engine.
//!
//! Stands in for the platform media player so the shell can be driven end to
//! end. Commands travel over a channel to a worker thread, which answers with
//! the same kind of callbacks a real engine would send: a short buffering
//! phase, progress ticks, and `Ended` when an episode runs out.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, select, tick, unbounded};
use hpmplayer::{
    EngineChange, EngineError, EngineEvent, EngineListener, EngineState, EngineStatus, ListenerId,
    ListenerSet, MediaDescriptor, PlaybackEngine,
};
use tracing::{debug, info, warn};

/// Length given to every simulated episode
pub const SIMULATED_EPISODE_LENGTH: Duration = Duration::from_secs(30 * 60);

const BUFFERING_DELAY: Duration = Duration::from_millis(400);
const TICK: Duration = Duration::from_millis(250);

enum SimCommand {
    Load(MediaDescriptor),
    Play,
    Pause,
    Stop,
    Seek(Duration),
    Shutdown,
}

struct Shared {
    status: Mutex<EngineStatus>,
    listeners: ListenerSet,
}

pub struct SimulatedEngine {
    cmd_tx: Sender<SimCommand>,
    shared: Arc<Shared>,
    skip_increment: Duration,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SimulatedEngine {
    pub fn new(skip_increment: Duration) -> Self {
        let (cmd_tx, cmd_rx) = unbounded();
        let shared = Arc::new(Shared {
            status: Mutex::new(EngineStatus::default()),
            listeners: ListenerSet::new(),
        });

        let worker_shared = shared.clone();
        let worker = thread::Builder::new()
            .name("hpm-sim-engine".into())
            .spawn(move || Worker::new(worker_shared).run(cmd_rx))
            .map_err(|e| warn!("Failed to spawn simulated engine thread: {}", e))
            .ok();

        Self {
            cmd_tx,
            shared,
            skip_increment,
            worker: Mutex::new(worker),
        }
    }

    fn send(&self, command: SimCommand) -> Result<(), EngineError> {
        self.cmd_tx
            .send(command)
            .map_err(|_| EngineError::new("simulated engine is offline"))
    }
}

impl PlaybackEngine for SimulatedEngine {
    fn load(&self, media: &MediaDescriptor) -> Result<(), EngineError> {
        info!(media = %media.media_id, uri = %media.uri, "▶️ Loading media");
        self.send(SimCommand::Load(media.clone()))
    }

    fn play(&self) -> Result<(), EngineError> {
        self.send(SimCommand::Play)
    }

    fn pause(&self) -> Result<(), EngineError> {
        self.send(SimCommand::Pause)
    }

    fn stop(&self) -> Result<(), EngineError> {
        self.send(SimCommand::Stop)
    }

    fn seek(&self, position: Duration) -> Result<(), EngineError> {
        self.send(SimCommand::Seek(position))
    }

    fn seek_back_increment(&self) -> Duration {
        self.skip_increment
    }

    fn seek_forward_increment(&self) -> Duration {
        self.skip_increment
    }

    fn status(&self) -> EngineStatus {
        self.shared
            .status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn add_listener(&self, listener: Arc<dyn EngineListener>) -> ListenerId {
        self.shared.listeners.add(listener)
    }

    fn remove_listener(&self, id: ListenerId) {
        self.shared.listeners.remove(id);
    }
}

impl Drop for SimulatedEngine {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(SimCommand::Shutdown);
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("Simulated engine thread panicked");
            }
        }
    }
}

struct Worker {
    shared: Arc<Shared>,
    loaded: Option<MediaDescriptor>,
    ready_at: Option<Instant>,
    wants_play: bool,
    last_tick: Instant,
}

impl Worker {
    fn new(shared: Arc<Shared>) -> Self {
        Self {
            shared,
            loaded: None,
            ready_at: None,
            wants_play: false,
            last_tick: Instant::now(),
        }
    }

    fn run(mut self, cmd_rx: Receiver<SimCommand>) {
        let ticker = tick(TICK);
        loop {
            select! {
                recv(cmd_rx) -> msg => match msg {
                    Ok(SimCommand::Shutdown) | Err(_) => break,
                    Ok(command) => self.handle(command),
                },
                recv(ticker) -> _ => self.on_tick(Instant::now()),
            }
        }
        debug!("Simulated engine stopped");
    }

    /// Applies the changes to the shared status, then notifies listeners.
    fn publish(&self, changes: Vec<EngineChange>) {
        {
            let mut status = self
                .shared
                .status
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            for change in &changes {
                match change {
                    EngineChange::State(s) => status.state = *s,
                    EngineChange::IsPlaying(p) => status.is_playing = *p,
                    EngineChange::Position(p) => status.position = *p,
                    EngineChange::Duration(d) => status.duration = *d,
                    EngineChange::Error(e) => status.error = e.clone(),
                }
            }
        }
        self.shared.listeners.emit(&EngineEvent::new(changes));
    }

    fn status(&self) -> EngineStatus {
        self.shared
            .status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn length(&self) -> Option<Duration> {
        match &self.loaded {
            Some(media) if !media.is_live => Some(SIMULATED_EPISODE_LENGTH),
            _ => None,
        }
    }

    fn handle(&mut self, command: SimCommand) {
        let status = self.status();
        match command {
            SimCommand::Load(media) => {
                self.loaded = Some(media);
                self.wants_play = false;
                self.ready_at = Some(Instant::now() + BUFFERING_DELAY);
                self.publish(vec![
                    EngineChange::State(EngineState::Buffering),
                    EngineChange::IsPlaying(false),
                    EngineChange::Position(Duration::ZERO),
                    EngineChange::Duration(None),
                    EngineChange::Error(None),
                ]);
            }
            SimCommand::Play => {
                self.wants_play = true;
                if status.state == EngineState::Ready && !status.is_playing {
                    self.last_tick = Instant::now();
                    self.publish(vec![EngineChange::IsPlaying(true)]);
                }
            }
            SimCommand::Pause => {
                self.wants_play = false;
                if status.is_playing {
                    self.publish(vec![EngineChange::IsPlaying(false)]);
                }
            }
            SimCommand::Stop => {
                self.loaded = None;
                self.ready_at = None;
                self.wants_play = false;
                if status.state != EngineState::Idle {
                    self.publish(vec![
                        EngineChange::State(EngineState::Idle),
                        EngineChange::IsPlaying(false),
                    ]);
                }
            }
            SimCommand::Seek(position) => {
                let Some(length) = self.length() else {
                    debug!("Seek ignored: nothing seekable loaded");
                    return;
                };
                let position = position.min(length);
                let mut changes = vec![EngineChange::Position(position)];
                if status.state == EngineState::Ended && position < length {
                    changes.push(EngineChange::State(EngineState::Ready));
                }
                self.publish(changes);
            }
            SimCommand::Shutdown => {}
        }
    }

    fn on_tick(&mut self, now: Instant) {
        if let Some(ready_at) = self.ready_at {
            if now >= ready_at {
                self.ready_at = None;
                self.last_tick = now;
                self.publish(vec![
                    EngineChange::State(EngineState::Ready),
                    EngineChange::IsPlaying(self.wants_play),
                    EngineChange::Duration(self.length()),
                ]);
            }
            return;
        }

        let status = self.status();
        if status.state != EngineState::Ready || !status.is_playing {
            return;
        }

        let elapsed = now.saturating_duration_since(self.last_tick);
        self.last_tick = now;
        let position = status.position + elapsed;
        match self.length() {
            Some(length) if position >= length => self.publish(vec![
                EngineChange::Position(length),
                EngineChange::State(EngineState::Ended),
                EngineChange::IsPlaying(false),
            ]),
            _ => self.publish(vec![EngineChange::Position(position)]),
        }
    }
}
