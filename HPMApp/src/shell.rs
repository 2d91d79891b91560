//! Line-oriented command shell over an [`AppSession`].

use std::time::{Duration, Instant};

use anyhow::{Result, anyhow, bail};
use chrono::Local;
use hpmplayer::time_utils::{format_clock, format_publish_date, parse_duration};
use hpmplayer::{CommandOutcome, Phase, PlayableItem};

use crate::logging::{LogControl, parse_level};
use crate::session::AppSession;

pub const HELP: &str = "\
Commands:
  stations                       list live stations
  podcasts                       list podcasts
  episodes <podcast>             list episodes of a podcast
  play station <id>              play a live station
  play episode <podcast> <n>     play the n-th episode of a podcast
  pause                          pause / resume
  seek <[hh:]mm:ss>              seek in the current episode
  ff | rew                       skip forward / backward
  status                         show playback state
  refresh                        refresh every content document
  background | foreground        simulate the app lifecycle
  log [level]                    show or change the log level
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Stations,
    Podcasts,
    Episodes(i64),
    PlayStation(i64),
    PlayEpisode { podcast: i64, index: usize },
    TogglePause,
    Seek(Duration),
    SkipForward,
    SkipBackward,
    Status,
    Refresh,
    Background,
    Foreground,
    /// Without a level, shows the current one
    Log(Option<String>),
    Help,
    Quit,
}

/// Whether the shell keeps reading after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

fn parse_id(word: Option<&str>, what: &str) -> Result<i64> {
    let raw = word.ok_or_else(|| anyhow!("missing {}", what))?;
    raw.parse()
        .map_err(|_| anyhow!("invalid {}: {}", what, raw))
}

impl ShellCommand {
    /// Parses one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Ok(None);
        };

        let command = match head.to_lowercase().as_str() {
            "stations" => ShellCommand::Stations,
            "podcasts" => ShellCommand::Podcasts,
            "episodes" => ShellCommand::Episodes(parse_id(words.next(), "podcast id")?),
            "play" => match words.next() {
                Some("station") => ShellCommand::PlayStation(parse_id(words.next(), "station id")?),
                Some("episode") => {
                    let podcast = parse_id(words.next(), "podcast id")?;
                    let index = parse_id(words.next(), "episode number")?;
                    let index = usize::try_from(index)
                        .map_err(|_| anyhow!("invalid episode number: {}", index))?;
                    ShellCommand::PlayEpisode { podcast, index }
                }
                _ => bail!("usage: play station <id> | play episode <podcast> <n>"),
            },
            "pause" | "resume" => ShellCommand::TogglePause,
            "seek" => {
                let raw = words.next().ok_or_else(|| anyhow!("missing position"))?;
                ShellCommand::Seek(parse_duration(raw)?)
            }
            "ff" => ShellCommand::SkipForward,
            "rew" => ShellCommand::SkipBackward,
            "status" => ShellCommand::Status,
            "refresh" => ShellCommand::Refresh,
            "background" | "bg" => ShellCommand::Background,
            "foreground" | "fg" => ShellCommand::Foreground,
            "log" => ShellCommand::Log(words.next().map(str::to_string)),
            "help" | "?" => ShellCommand::Help,
            "quit" | "exit" => ShellCommand::Quit,
            other => bail!("unknown command: {} (try 'help')", other),
        };
        Ok(Some(command))
    }
}

fn describe(outcome: &CommandOutcome) -> String {
    match outcome {
        CommandOutcome::Dispatched => "ok".to_string(),
        CommandOutcome::Resumed => "resumed".to_string(),
        CommandOutcome::Loaded => "loading".to_string(),
        CommandOutcome::Seeking(target) => format!("seeking to {}", format_clock(*target)),
        CommandOutcome::Ignored(reason) => format!("ignored ({:?})", reason),
    }
}

/// Renders the current playback state on one line.
pub fn status_line(session: &AppSession) -> String {
    let coordinator = session.coordinator();
    let snapshot = coordinator.current_snapshot();
    let Some(selection) = coordinator.selection() else {
        return format!("[{}] nothing selected", snapshot.phase.label());
    };

    let mut line = format!("[{}] {}", snapshot.phase.label(), selection.item.display_name());
    if let Some(subtitle) = selection.item.subtitle() {
        line.push_str(&format!(" · {}", subtitle));
    }
    if snapshot.shows_timeline() {
        line.push_str(&format!(" {}", format_clock(snapshot.position)));
        if let Some(duration) = snapshot.duration {
            line.push_str(&format!(" / {}", format_clock(duration)));
        }
    } else if snapshot.is_live {
        line.push_str(" (live)");
    }
    if let Phase::Error(reason) = &snapshot.phase {
        line.push_str(&format!(" error: {}", reason));
    }
    if !coordinator.is_attached() {
        line.push_str(" [engine released]");
    } else if let Some(deadline) = session.detach_deadline() {
        let left = deadline.saturating_duration_since(Instant::now());
        line.push_str(&format!(" [background, release in {}]", format_clock(left)));
    }
    line
}

pub async fn execute(
    session: &mut AppSession,
    log: &LogControl,
    command: ShellCommand,
) -> Result<Flow> {
    match command {
        ShellCommand::Stations => {
            for station in session.data().streams() {
                let airing = session
                    .data()
                    .now_playing_for(station.id)
                    .map(|np| np.display_line())
                    .unwrap_or_default();
                println!("{:>3}  {:<28} {}", station.id, station.name, airing);
            }
        }
        ShellCommand::Podcasts => {
            let podcasts = session.data().podcasts();
            if podcasts.is_empty() {
                println!("no podcasts yet, try 'refresh'");
            }
            for podcast in podcasts {
                println!("{:>6}  {}", podcast.id, podcast.name);
            }
        }
        ShellCommand::Episodes(podcast_id) => {
            let podcast = session
                .data()
                .podcast(podcast_id)
                .ok_or_else(|| anyhow!("unknown podcast {}", podcast_id))?;
            if session.data().episodes(podcast_id).is_none() {
                session.data().refresh_episodes(podcast_id).await;
            }
            for (n, episode) in session
                .data()
                .episodes(podcast_id)
                .unwrap_or_default()
                .iter()
                .enumerate()
            {
                let item = PlayableItem::from_episode(&podcast, episode);
                let length = item.duration().map(format_clock).unwrap_or_default();
                let date = episode
                    .published_at()
                    .map(|at| format_publish_date(&at, &Local))
                    .unwrap_or_default();
                println!("{:>3}  {:<8} {:<30} {}", n, length, date, episode.title);
            }
        }
        ShellCommand::PlayStation(id) => {
            let outcome = session.play_station(id)?;
            println!("{}", describe(&outcome));
        }
        ShellCommand::PlayEpisode { podcast, index } => {
            let outcome = session.play_episode(podcast, index).await?;
            println!("{}", describe(&outcome));
        }
        ShellCommand::TogglePause => {
            let outcome = session.coordinator_mut().toggle_pause()?;
            println!("{}", describe(&outcome));
        }
        ShellCommand::Seek(position) => {
            let outcome = session.coordinator_mut().seek(position)?;
            println!("{}", describe(&outcome));
        }
        ShellCommand::SkipForward => {
            let outcome = session.coordinator_mut().skip_forward()?;
            println!("{}", describe(&outcome));
        }
        ShellCommand::SkipBackward => {
            let outcome = session.coordinator_mut().skip_backward()?;
            println!("{}", describe(&outcome));
        }
        ShellCommand::Status => println!("{}", status_line(session)),
        ShellCommand::Refresh => {
            for (section, outcome) in session.refresh().await {
                println!("{:<14} {:?}", section.to_string(), outcome);
            }
        }
        ShellCommand::Background | ShellCommand::Foreground => {
            if command == ShellCommand::Background {
                session.enter_background(Instant::now());
            } else {
                session.enter_foreground();
            }
            let polling = if session.is_polling() { "on" } else { "off" };
            println!("now-playing polling {}", polling);
        }
        ShellCommand::Log(None) => println!("log level is {}", log.level()),
        ShellCommand::Log(Some(level)) => {
            let level = parse_level(&level).ok_or_else(|| anyhow!("unknown level {}", level))?;
            log.set_level(level)?;
            println!("log level set to {}", level);
        }
        ShellCommand::Help => println!("{}", HELP),
        ShellCommand::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}
