//! Playback state coordinator for the HPM live streams and podcast episodes.
//!
//! The platform media engine does the actual decoding and streaming. This
//! crate decides what the engine should be doing and republishes what it
//! reports:
//!
//! - [`PlayableItem`] / [`PlaybackSelection`]: what the listener picked
//! - [`PlaybackEngine`]: the contract an engine adapter implements
//! - [`SnapshotBridge`]: folds engine callbacks into [`EngineSnapshot`]s
//! - [`PlaybackCoordinator`]: select, resume, pause, seek and skip
//!
//! Readers never lock anything: snapshots and the selection are published as
//! `Arc`s through `tokio::sync::watch` channels.

pub mod bridge;
pub mod config_ext;
pub mod coordinator;
pub mod engine;
pub mod errors;
pub mod item;
pub mod media;
pub mod snapshot;
pub mod time_utils;

pub use bridge::{SnapshotBridge, SnapshotPublisher};
pub use config_ext::PlayerConfigExt;
pub use coordinator::{
    CommandOutcome, CoordinatorOptions, LivePausePolicy, NoOpReason, PlaybackCoordinator,
};
pub use engine::{
    DEFAULT_SEEK_INCREMENT, EngineChange, EngineEvent, EngineListener, EngineState, EngineStatus,
    ListenerId, ListenerSet, PlaybackEngine,
};
pub use errors::{EngineError, PlayerError};
pub use item::{
    AudioKind, ItemIdentity, LiveMetadata, PlayableItem, PlaybackSelection, StreamSources,
};
pub use media::{Delivery, MediaDescriptor, MediaMetadata};
pub use snapshot::{EngineSnapshot, Phase};
