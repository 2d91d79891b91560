mod engine;
mod logging;
mod session;
mod shell;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use hpmconfig::get_config;
use hpmcontent::{ContentClient, RefreshOutcome, StationData};
use hpmplayer::{PlaybackEngine, PlayerConfigExt};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

use crate::engine::SimulatedEngine;
use crate::session::AppSession;
use crate::shell::{Flow, ShellCommand};

/// How often the background detach deadline is checked
const LIFECYCLE_TICK: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> Result<()> {
    // ========== PHASE 1 : Configuration et logs ==========
    let config = get_config();
    let log_control = logging::init_logging(&config);
    info!("📁 Configuration loaded from {}", config.directory());

    // ========== PHASE 2 : Contenu ==========
    info!("📡 Loading content...");
    let data = Arc::new(StationData::new(ContentClient::from_config(&config)?));

    let engine: Arc<dyn PlaybackEngine> =
        Arc::new(SimulatedEngine::new(config.get_skip_increment()?));
    let mut session = AppSession::new(&config, data, engine)?;

    let report = session.refresh().await;
    let stale = report
        .iter()
        .filter(|(_, outcome)| *outcome == RefreshOutcome::KeptStale)
        .count();
    if stale > 0 {
        warn!("⚠️ {} content section(s) kept their previous data", stale);
    }
    info!(
        "✅ {} station(s), {} podcast(s)",
        session.data().streams().len(),
        session.data().podcasts().len()
    );

    // ========== PHASE 3 : Lecture ==========
    session.enter_foreground();
    info!("✅ HPM player is ready! Type 'help' for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut lifecycle = tokio::time::interval(LIFECYCLE_TICK);
    lifecycle.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        error!("Failed to read stdin: {}", e);
                        break;
                    }
                };
                let command = match ShellCommand::parse(&line) {
                    Ok(Some(command)) => command,
                    Ok(None) => continue,
                    Err(e) => {
                        println!("{}", e);
                        continue;
                    }
                };
                match shell::execute(&mut session, &log_control, command).await {
                    Ok(Flow::Quit) => break,
                    Ok(Flow::Continue) => {}
                    Err(e) => println!("error: {}", e),
                }
            }
            _ = lifecycle.tick() => {
                if session.tick(Instant::now()) {
                    info!("Engine released after background grace period");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    session.shutdown().await;
    Ok(())
}
