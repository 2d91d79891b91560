//! Integration tests for the playback coordinator, driven through a
//! recording engine.

mod common;

use std::time::Duration;

use common::{Command, RecordingEngine, episode, station};
use hpmplayer::{
    AudioKind, CommandOutcome, CoordinatorOptions, EngineChange, EngineState, EngineStatus,
    LivePausePolicy, NoOpReason, Phase, PlayableItem, PlaybackCoordinator, PlayerError,
    StreamSources,
};

fn attached(options: CoordinatorOptions) -> (std::sync::Arc<RecordingEngine>, PlaybackCoordinator) {
    let engine = RecordingEngine::new();
    let mut coordinator = PlaybackCoordinator::new(options);
    coordinator.attach(&engine.as_engine());
    (engine, coordinator)
}

fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}

#[test]
fn test_same_item_while_paused_loads_once() {
    let (engine, mut coordinator) = attached(CoordinatorOptions::default());

    let outcome = coordinator.select_and_play(episode(1, None), 1).unwrap();
    assert_eq!(outcome, CommandOutcome::Loaded);
    engine.emit_playing(Some(secs(300)));
    assert_eq!(coordinator.current_snapshot().phase, Phase::Playing);

    assert_eq!(coordinator.toggle_pause().unwrap(), CommandOutcome::Dispatched);
    engine.emit_paused();
    assert_eq!(coordinator.current_snapshot().phase, Phase::Paused);

    let outcome = coordinator.select_and_play(episode(1, None), 1).unwrap();
    assert_eq!(outcome, CommandOutcome::Resumed);
    assert_eq!(engine.loads(), 1);
    assert_eq!(engine.commands().last(), Some(&Command::Play));
}

#[test]
fn test_switching_items_stops_then_loads() {
    let (engine, mut coordinator) = attached(CoordinatorOptions::default());

    coordinator.select_and_play(episode(1, None), 1).unwrap();
    engine.emit_playing(Some(secs(300)));
    engine.clear();

    coordinator.select_and_play(episode(2, None), 4).unwrap();
    assert_eq!(
        engine.commands(),
        vec![
            Command::Stop,
            Command::Load("episode:2".into()),
            Command::Play
        ]
    );

    let selection = coordinator.selection().unwrap();
    assert_eq!(selection.item.id(), 2);
    assert_eq!(selection.origin_index, 4);
    assert_eq!(coordinator.current_snapshot().phase, Phase::Buffering);
}

#[test]
fn test_same_id_other_kind_reloads() {
    let (engine, mut coordinator) = attached(CoordinatorOptions::default());

    coordinator.select_and_play(station(0), 0).unwrap();
    engine.emit_playing(None);
    coordinator.toggle_pause().unwrap();
    engine.emit_paused();

    let outcome = coordinator.select_and_play(episode(0, None), 0).unwrap();
    assert_eq!(outcome, CommandOutcome::Loaded);
    assert_eq!(engine.loads(), 2);
    assert_eq!(coordinator.selection().unwrap().audio_kind(), AudioKind::Episode);
}

#[test]
fn test_playing_item_reselected_reloads() {
    let (engine, mut coordinator) = attached(CoordinatorOptions::default());

    coordinator.select_and_play(episode(1, None), 1).unwrap();
    engine.emit_playing(None);

    assert_eq!(
        coordinator.select_and_play(episode(1, None), 1).unwrap(),
        CommandOutcome::Loaded
    );
    assert_eq!(engine.loads(), 2);
}

#[test]
fn test_seek_on_stream_is_ignored() {
    let (engine, mut coordinator) = attached(CoordinatorOptions::default());

    coordinator.select_and_play(station(0), 0).unwrap();
    engine.emit_playing(None);
    let before = coordinator.current_snapshot();

    let outcome = coordinator.seek(secs(10)).unwrap();
    assert_eq!(outcome, CommandOutcome::Ignored(NoOpReason::LiveStream));
    assert_eq!(
        coordinator.skip_forward().unwrap(),
        CommandOutcome::Ignored(NoOpReason::LiveStream)
    );
    assert_eq!(engine.count(|c| matches!(c, Command::Seek(_))), 0);
    assert_eq!(*coordinator.current_snapshot(), *before);
}

#[test]
fn test_toggle_in_idle_has_no_effect() {
    let (engine, mut coordinator) = attached(CoordinatorOptions::default());

    let outcome = coordinator.toggle_pause().unwrap();
    assert_eq!(
        outcome,
        CommandOutcome::Ignored(NoOpReason::PhaseHasNoEffect(Phase::Idle))
    );
    assert!(engine.commands().is_empty());
    assert_eq!(coordinator.current_snapshot().version, 0);
}

#[test]
fn test_toggle_while_buffering_pauses() {
    let (engine, mut coordinator) = attached(CoordinatorOptions::default());

    coordinator.select_and_play(episode(3, None), 3).unwrap();
    engine.clear();

    assert_eq!(coordinator.toggle_pause().unwrap(), CommandOutcome::Dispatched);
    assert_eq!(engine.commands(), vec![Command::Pause]);
    // la phase ne bouge qu'au rappel du moteur
    assert_eq!(coordinator.current_snapshot().phase, Phase::Buffering);
}

#[test]
fn test_engine_error_keeps_selection() {
    let (engine, mut coordinator) = attached(CoordinatorOptions::default());

    coordinator.select_and_play(episode(9, None), 9).unwrap();
    assert_eq!(coordinator.current_snapshot().phase, Phase::Buffering);

    engine.emit_playing(Some(secs(600)));
    assert_eq!(coordinator.current_snapshot().phase, Phase::Playing);

    engine.emit(vec![EngineChange::Error(Some("decoder failure".into()))]);
    assert_eq!(
        coordinator.current_snapshot().phase,
        Phase::Error("decoder failure".into())
    );
    assert_eq!(coordinator.selection().unwrap().item.id(), 9);

    // Toggle does nothing in Error; a fresh select is the retry
    assert!(coordinator.toggle_pause().unwrap().is_ignored());
    assert_eq!(
        coordinator.select_and_play(episode(9, None), 9).unwrap(),
        CommandOutcome::Loaded
    );
    assert_eq!(coordinator.current_snapshot().phase, Phase::Buffering);
}

#[test]
fn test_late_error_from_previous_item_does_not_stick() {
    let (engine, mut coordinator) = attached(CoordinatorOptions::default());

    coordinator.select_and_play(episode(1, None), 1).unwrap();
    engine.emit_playing(Some(secs(600)));

    coordinator.select_and_play(station(0), 0).unwrap();
    // Rappel de l'épisode arrivé après le changement d'élément
    engine.emit(vec![EngineChange::Error(Some("old decoder failure".into()))]);
    assert_eq!(coordinator.current_snapshot().phase, Phase::Buffering);

    engine.emit(vec![EngineChange::State(EngineState::Buffering)]);
    engine.emit_playing(None);
    assert_eq!(coordinator.current_snapshot().phase, Phase::Playing);
    assert_eq!(coordinator.selection().unwrap().item.id(), 0);

    engine.emit(vec![EngineChange::Error(Some("stream dropped".into()))]);
    assert_eq!(
        coordinator.current_snapshot().phase,
        Phase::Error("stream dropped".into())
    );
}

#[test]
fn test_failed_load_surfaces_error() {
    let (engine, mut coordinator) = attached(CoordinatorOptions::default());
    engine.fail_on("load");

    let err = coordinator.select_and_play(episode(5, None), 5).unwrap_err();
    assert!(matches!(err, PlayerError::Engine(_)));
    assert_eq!(
        coordinator.current_snapshot().phase,
        Phase::Error("load failed".into())
    );
    assert_eq!(coordinator.selection().unwrap().item.id(), 5);

    engine.heal();
    coordinator.select_and_play(episode(5, None), 5).unwrap();
    assert_eq!(coordinator.current_snapshot().phase, Phase::Buffering);
}

#[test]
fn test_skip_forward_clamps_to_duration() {
    let (engine, mut coordinator) = attached(CoordinatorOptions::default());

    coordinator.select_and_play(episode(1, None), 1).unwrap();
    engine.emit_playing(Some(Duration::from_millis(300_000)));
    engine.emit(vec![EngineChange::Position(Duration::from_millis(290_000))]);

    let outcome = coordinator.skip_forward().unwrap();
    assert_eq!(outcome, CommandOutcome::Seeking(Duration::from_millis(300_000)));
    assert_eq!(
        engine.commands().last(),
        Some(&Command::Seek(Duration::from_millis(300_000)))
    );
}

#[test]
fn test_skip_backward_stops_at_zero() {
    let (engine, mut coordinator) = attached(CoordinatorOptions::default());

    coordinator.select_and_play(episode(1, None), 1).unwrap();
    engine.emit_playing(Some(secs(300)));
    engine.emit(vec![EngineChange::Position(secs(5))]);

    assert_eq!(
        coordinator.skip_backward().unwrap(),
        CommandOutcome::Seeking(Duration::ZERO)
    );
}

#[test]
fn test_skip_on_detached_stream_is_ignored() {
    let (engine, mut coordinator) = attached(CoordinatorOptions::default());
    coordinator.select_and_play(station(0), 0).unwrap();
    coordinator.detach();
    engine.clear();

    assert_eq!(
        coordinator.skip_forward().unwrap(),
        CommandOutcome::Ignored(NoOpReason::LiveStream)
    );
    assert_eq!(
        coordinator.skip_backward().unwrap(),
        CommandOutcome::Ignored(NoOpReason::LiveStream)
    );
    assert_eq!(
        coordinator.seek(secs(10)).unwrap(),
        CommandOutcome::Ignored(NoOpReason::LiveStream)
    );
    assert!(engine.commands().is_empty());
}

#[test]
fn test_skip_without_selection() {
    let mut coordinator = PlaybackCoordinator::default();
    assert_eq!(
        coordinator.skip_forward().unwrap(),
        CommandOutcome::Ignored(NoOpReason::NothingSelected)
    );
}

#[test]
fn test_seek_uses_feed_duration_until_engine_knows() {
    let (engine, mut coordinator) = attached(CoordinatorOptions::default());

    coordinator.select_and_play(episode(1, Some(secs(100))), 1).unwrap();
    engine.emit_playing(None);

    assert_eq!(
        coordinator.seek(secs(500)).unwrap(),
        CommandOutcome::Seeking(secs(100))
    );
}

#[test]
fn test_seek_without_selection() {
    let (engine, mut coordinator) = attached(CoordinatorOptions::default());
    assert_eq!(
        coordinator.seek(secs(5)).unwrap(),
        CommandOutcome::Ignored(NoOpReason::NothingSelected)
    );
    assert!(engine.commands().is_empty());
}

#[test]
fn test_is_live_follows_selection() {
    let (engine, mut coordinator) = attached(CoordinatorOptions::default());

    assert!(station(0).is_live());
    assert!(!episode(1, None).is_live());

    coordinator.select_and_play(station(0), 0).unwrap();
    engine.emit_playing(Some(secs(12)));
    let snapshot = coordinator.current_snapshot();
    assert!(snapshot.is_live);
    assert_eq!(snapshot.duration, None);
    assert!(!snapshot.shows_timeline());

    coordinator.select_and_play(episode(1, None), 1).unwrap();
    assert!(!coordinator.current_snapshot().is_live);
    assert!(!coordinator.is_live());
}

#[test]
fn test_live_stream_end_is_error_episode_end_is_ended() {
    let (engine, mut coordinator) = attached(CoordinatorOptions::default());

    coordinator.select_and_play(station(1), 1).unwrap();
    engine.emit_playing(None);
    engine.emit(vec![EngineChange::State(EngineState::Ended)]);
    assert!(coordinator.current_snapshot().phase.is_error());

    coordinator.select_and_play(episode(1, None), 1).unwrap();
    engine.emit_playing(Some(secs(60)));
    engine.emit(vec![
        EngineChange::State(EngineState::Ended),
        EngineChange::IsPlaying(false),
    ]);
    assert_eq!(coordinator.current_snapshot().phase, Phase::Ended);
}

#[test]
fn test_invalid_source_leaves_state_untouched() {
    let (engine, mut coordinator) = attached(CoordinatorOptions::default());

    let broken = PlayableItem::Stream {
        id: 4,
        name: "Broken".into(),
        artwork: None,
        sources: StreamSources {
            hls: Some("not a url".into()),
            aac: None,
            mp3: None,
        },
        live: None,
    };
    let err = coordinator.select_and_play(broken, 4).unwrap_err();
    assert!(err.is_invalid_source());
    assert!(engine.commands().is_empty());
    assert!(coordinator.selection().is_none());
    assert_eq!(coordinator.current_snapshot().version, 0);
}

#[test]
fn test_select_without_engine_is_detached() {
    let mut coordinator = PlaybackCoordinator::default();
    let err = coordinator.select_and_play(station(0), 0).unwrap_err();
    assert!(matches!(err, PlayerError::Detached));
    assert!(coordinator.selection().is_none());
}

#[test]
fn test_dropped_engine_counts_as_detached() {
    let (engine, mut coordinator) = attached(CoordinatorOptions::default());
    assert!(coordinator.is_attached());

    drop(engine);
    assert!(!coordinator.is_attached());
    assert!(matches!(
        coordinator.select_and_play(station(0), 0),
        Err(PlayerError::Detached)
    ));
    coordinator.detach();
}

#[test]
fn test_detach_is_idempotent() {
    let (engine, mut coordinator) = attached(CoordinatorOptions::default());
    assert_eq!(engine.listener_count(), 1);

    coordinator.detach();
    coordinator.detach();
    assert_eq!(engine.listener_count(), 0);
    assert!(!coordinator.is_attached());
}

#[test]
fn test_late_callbacks_after_detach_are_dropped() {
    let (engine, mut coordinator) = attached(CoordinatorOptions::default());
    engine.leak_listeners();

    coordinator.select_and_play(episode(1, None), 1).unwrap();
    let before = coordinator.current_snapshot();
    coordinator.detach();

    // L'enregistrement a fuité : le rappel atteint encore le pont détaché
    assert_eq!(engine.listener_count(), 1);
    engine.emit_playing(Some(secs(100)));
    assert_eq!(*coordinator.current_snapshot(), *before);
}

#[test]
fn test_attach_twice_registers_one_listener() {
    let engine = RecordingEngine::new();
    let shared = engine.as_engine();
    let mut coordinator = PlaybackCoordinator::default();

    coordinator.attach(&shared);
    coordinator.attach(&shared);
    assert_eq!(engine.listener_count(), 1);

    let other = RecordingEngine::new();
    coordinator.attach(&other.as_engine());
    assert_eq!(engine.listener_count(), 0);
    assert_eq!(other.listener_count(), 1);
}

#[test]
fn test_attach_seeds_from_running_engine() {
    let engine = RecordingEngine::new();
    engine.set_status(EngineStatus {
        state: EngineState::Ready,
        is_playing: true,
        position: secs(42),
        duration: Some(secs(1800)),
        error: None,
    });

    let mut coordinator = PlaybackCoordinator::default();
    coordinator.attach(&engine.as_engine());

    let snapshot = coordinator.current_snapshot();
    assert_eq!(snapshot.phase, Phase::Playing);
    assert_eq!(snapshot.position, secs(42));
    assert_eq!(snapshot.duration, Some(secs(1800)));
    assert!(engine.commands().is_empty());
}

#[test]
fn test_reattach_to_fresh_engine_reports_lost_session() {
    let (engine, mut coordinator) = attached(CoordinatorOptions::default());
    coordinator.select_and_play(episode(1, None), 1).unwrap();
    engine.emit_playing(Some(secs(100)));

    let fresh = RecordingEngine::new();
    coordinator.attach(&fresh.as_engine());

    assert!(coordinator.current_snapshot().phase.is_error());
    assert_eq!(coordinator.selection().unwrap().item.id(), 1);
    assert_eq!(
        coordinator.select_and_play(episode(1, None), 1).unwrap(),
        CommandOutcome::Loaded
    );
    assert_eq!(fresh.loads(), 1);
}

#[test]
fn test_live_pause_resume_policy() {
    let (engine, mut coordinator) = attached(CoordinatorOptions::default());

    coordinator.select_and_play(station(0), 0).unwrap();
    engine.emit_playing(None);
    coordinator.toggle_pause().unwrap();
    engine.emit_paused();

    assert_eq!(coordinator.toggle_pause().unwrap(), CommandOutcome::Resumed);
    assert_eq!(engine.loads(), 1);
}

#[test]
fn test_live_pause_reload_policy() {
    let (engine, mut coordinator) = attached(CoordinatorOptions {
        live_pause_policy: LivePausePolicy::Reload,
    });

    coordinator.select_and_play(station(0), 2).unwrap();
    engine.emit_playing(None);
    coordinator.toggle_pause().unwrap();
    engine.emit_paused();

    assert_eq!(coordinator.toggle_pause().unwrap(), CommandOutcome::Loaded);
    assert_eq!(engine.loads(), 2);
    assert_eq!(coordinator.selection().unwrap().origin_index, 2);

    // Episodes still resume in place
    coordinator.select_and_play(episode(1, None), 1).unwrap();
    engine.emit_playing(Some(secs(60)));
    coordinator.toggle_pause().unwrap();
    engine.emit_paused();
    assert_eq!(coordinator.toggle_pause().unwrap(), CommandOutcome::Resumed);
}

#[test]
fn test_one_publish_per_engine_event() {
    let (engine, mut coordinator) = attached(CoordinatorOptions::default());
    let mut rx = coordinator.subscribe_snapshot();

    coordinator.select_and_play(episode(1, None), 1).unwrap();
    let version = rx.borrow_and_update().version;

    engine.emit(vec![
        EngineChange::State(EngineState::Ready),
        EngineChange::IsPlaying(true),
        EngineChange::Duration(Some(secs(300))),
        EngineChange::Position(secs(3)),
    ]);
    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update().version, version + 1);

    // Same values again: nothing new to publish
    engine.emit(vec![EngineChange::Position(secs(3))]);
    assert!(!rx.has_changed().unwrap());
}

#[test]
fn test_selection_subscribers_see_replacements() {
    let (_engine, mut coordinator) = attached(CoordinatorOptions::default());
    let mut rx = coordinator.subscribe_selection();
    assert!(rx.borrow_and_update().is_none());

    coordinator.select_and_play(station(2), 2).unwrap();
    assert!(rx.has_changed().unwrap());
    let selection = rx.borrow_and_update().clone().unwrap();
    assert_eq!(selection.identity().to_string(), "stream:2");
}

#[tokio::test]
async fn test_snapshot_updates_across_threads() {
    let (engine, mut coordinator) = attached(CoordinatorOptions::default());
    let mut rx = coordinator.subscribe_snapshot();
    coordinator.select_and_play(episode(1, None), 1).unwrap();
    rx.borrow_and_update();

    let emitter = engine.clone();
    std::thread::spawn(move || emitter.emit_playing(Some(secs(30))))
        .join()
        .unwrap();

    rx.changed().await.unwrap();
    assert_eq!(rx.borrow().phase, Phase::Playing);
}
