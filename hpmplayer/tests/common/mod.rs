//! Shared fixtures: a recording engine and a few items.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hpmplayer::{
    EngineChange, EngineError, EngineEvent, EngineListener, EngineState, EngineStatus, ListenerId,
    ListenerSet, MediaDescriptor, PlayableItem, PlaybackEngine, StreamSources,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Load(String),
    Play,
    Pause,
    Stop,
    Seek(Duration),
}

/// Engine double: records every command, never emits on its own.
///
/// Tests drive callbacks explicitly with [`RecordingEngine::emit`].
#[derive(Default)]
pub struct RecordingEngine {
    commands: Mutex<Vec<Command>>,
    status: Mutex<EngineStatus>,
    fail_on: Mutex<Option<&'static str>>,
    leak_listeners: AtomicBool,
    listeners: ListenerSet,
}

impl RecordingEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn as_engine(self: &Arc<Self>) -> Arc<dyn PlaybackEngine> {
        self.clone()
    }

    pub fn commands(&self) -> Vec<Command> {
        self.commands.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.commands.lock().unwrap().clear();
    }

    pub fn count(&self, pred: impl Fn(&Command) -> bool) -> usize {
        self.commands().iter().filter(|c| pred(c)).count()
    }

    pub fn loads(&self) -> usize {
        self.count(|c| matches!(c, Command::Load(_)))
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Makes the named command ("load", "play", ...) fail from now on.
    pub fn fail_on(&self, command: &'static str) {
        *self.fail_on.lock().unwrap() = Some(command);
    }

    pub fn heal(&self) {
        *self.fail_on.lock().unwrap() = None;
    }

    /// Ignores `remove_listener`, so callbacks keep reaching detached bridges.
    pub fn leak_listeners(&self) {
        self.leak_listeners.store(true, Ordering::SeqCst);
    }

    pub fn set_status(&self, status: EngineStatus) {
        *self.status.lock().unwrap() = status;
    }

    pub fn emit(&self, changes: Vec<EngineChange>) {
        self.listeners.emit(&EngineEvent::new(changes));
    }

    pub fn emit_playing(&self, duration: Option<Duration>) {
        self.emit(vec![
            EngineChange::State(EngineState::Ready),
            EngineChange::IsPlaying(true),
            EngineChange::Duration(duration),
        ]);
    }

    pub fn emit_paused(&self) {
        self.emit(vec![EngineChange::IsPlaying(false)]);
    }

    fn record(&self, name: &'static str, command: Command) -> Result<(), EngineError> {
        self.commands.lock().unwrap().push(command);
        if *self.fail_on.lock().unwrap() == Some(name) {
            return Err(EngineError::new(format!("{} failed", name)));
        }
        Ok(())
    }
}

impl PlaybackEngine for RecordingEngine {
    fn load(&self, media: &MediaDescriptor) -> Result<(), EngineError> {
        self.record("load", Command::Load(media.media_id.clone()))
    }

    fn play(&self) -> Result<(), EngineError> {
        self.record("play", Command::Play)
    }

    fn pause(&self) -> Result<(), EngineError> {
        self.record("pause", Command::Pause)
    }

    fn stop(&self) -> Result<(), EngineError> {
        self.record("stop", Command::Stop)
    }

    fn seek(&self, position: Duration) -> Result<(), EngineError> {
        self.record("seek", Command::Seek(position))
    }

    fn status(&self) -> EngineStatus {
        self.status.lock().unwrap().clone()
    }

    fn add_listener(&self, listener: Arc<dyn EngineListener>) -> ListenerId {
        self.listeners.add(listener)
    }

    fn remove_listener(&self, id: ListenerId) {
        if self.leak_listeners.load(Ordering::SeqCst) {
            return;
        }
        self.listeners.remove(id);
    }
}

pub fn station(id: i64) -> PlayableItem {
    PlayableItem::Stream {
        id,
        name: format!("Station {}", id),
        artwork: None,
        sources: StreamSources {
            hls: Some(format!("https://hls.example.org/{}/playlist.m3u8", id)),
            aac: None,
            mp3: None,
        },
        live: None,
    }
}

pub fn episode(id: i64, duration: Option<Duration>) -> PlayableItem {
    PlayableItem::Episode {
        id,
        podcast_name: "Houston Matters".into(),
        title: format!("Episode {}", id),
        artwork: None,
        enclosure_url: format!("https://audio.example.org/{}.mp3", id),
        published_at: None,
        duration,
    }
}
