//! Periodic now-playing refresh
//!
//! The poller runs on the tokio runtime and refreshes the now-playing
//! document at a fixed interval. It is started when the application comes to
//! the foreground and stopped when it goes to the background; dropping the
//! poller stops it too. It only writes now-playing metadata into
//! [`StationData`] and never touches playback.

use crate::station_data::{RefreshOutcome, StationData};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

struct PollerTask {
    stop_token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Cancellable fixed-interval refresh of now-playing metadata
pub struct NowPlayingPoller {
    data: Arc<StationData>,
    interval: Duration,
    task: Option<PollerTask>,
}

impl NowPlayingPoller {
    pub fn new(data: Arc<StationData>, interval: Duration) -> Self {
        Self {
            data,
            interval,
            task: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// True while the refresh task is alive
    pub fn is_running(&self) -> bool {
        self.task
            .as_ref()
            .map(|task| !task.handle.is_finished())
            .unwrap_or(false)
    }

    /// Starts the refresh loop. The first refresh happens immediately.
    ///
    /// Must be called from within a tokio runtime. Returns `false` when the
    /// poller was already running.
    pub fn start(&mut self) -> bool {
        if self.is_running() {
            return false;
        }

        let stop_token = CancellationToken::new();
        let task_token = stop_token.clone();
        let data = self.data.clone();
        let period = self.interval;

        let handle = tokio::spawn(async move {
            info!(interval_secs = period.as_secs(), "Now-playing poller started");
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = task_token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                tokio::select! {
                    _ = task_token.cancelled() => break,
                    outcome = data.refresh_now_playing() => {
                        if outcome == RefreshOutcome::KeptStale {
                            debug!("Now-playing unchanged this cycle");
                        }
                    }
                }
            }

            info!("Now-playing poller stopped");
        });

        self.task = Some(PollerTask { stop_token, handle });
        true
    }

    /// Stops the refresh loop. Idempotent.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.stop_token.cancel();
            task.handle.abort();
        }
    }

    /// Stops the loop and waits for the task to finish
    pub async fn shutdown(&mut self) {
        if let Some(task) = self.task.take() {
            task.stop_token.cancel();
            let _ = task.handle.await;
        }
    }
}

impl Drop for NowPlayingPoller {
    fn drop(&mut self) {
        self.stop();
    }
}
