//! # leap-csv
//!
//! Replays a hand-tracking recording and prints every frame with a hand as a
//! CSV row on stdout. Status messages go to stderr.
//!
//! ```bash
//! leap-csv session.jsonl > hands.csv
//! leap-csv --bg --realtime session.jsonl
//! leap-csv --bvh session.jsonl > hand.bvh
//! ```
//!
//! Press Enter to stop early; otherwise the program exits once the recording
//! has been replayed.

use clap::Parser;
use crossbeam_channel::{select, Receiver};
use leap_csv::{BvhRecorder, Config, EventLoop, EventStream, FrameReporter, LeapError, Pacing, Policy};
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "leap-csv")]
#[command(about = "Print recorded hand-tracking frames as CSV", long_about = None)]
#[command(version)]
struct Cli {
    /// Recording to replay, one JSON event per line
    recording: PathBuf,

    /// Keep receiving frames while the application does not have focus
    #[arg(long)]
    bg: bool,

    /// Replay at the speed the frames were recorded
    #[arg(long)]
    realtime: bool,

    /// Write a BVH capture of the first tracked hand instead of CSV
    #[arg(long)]
    bvh: bool,

    /// Number of frames kept for previous-frame lookups
    #[arg(long, value_name = "FRAMES")]
    history: Option<usize>,
}

impl Cli {
    /// Command-line flags win over environment settings.
    fn apply(&self, mut config: Config) -> Config {
        if self.bg {
            config.policy |= Policy::BACKGROUND_FRAMES;
        }
        if self.realtime {
            config.pacing = Pacing::Realtime;
        }
        if let Some(frames) = self.history {
            config.history_frames = frames;
        }
        config
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> leap_csv::Result<()> {
    let config = cli.apply(Config::from_env());
    log::debug!("{:?}", config);

    let stream = EventStream::open(&cli.recording, config.pacing)?;

    let mut event_loop = EventLoop::new(config.history_frames);
    if cli.bvh {
        event_loop.add_listener(BvhRecorder::new(io::stdout()));
    } else {
        event_loop.add_listener(FrameReporter::stdio());
    }
    event_loop.controller().set_policy(config.policy);

    let running = event_loop.spawn(stream)?;
    let done = running.done().clone();

    // Keep this process running until Enter is pressed
    eprintln!("Press Enter to quit...");
    let enter = wait_for_enter()?;

    // a closed stdin disconnects `enter`; the recording then runs to the end
    let stop_requested = select! {
        recv(enter) -> key => key.is_ok(),
        recv(done) -> _ => false,
    };

    if stop_requested {
        log::info!("Stopping on user request");
        running.stop()
    } else {
        running.wait()
    }
}

/// Fires once a line was read from stdin. Disconnects without a message if
/// stdin is closed.
fn wait_for_enter() -> leap_csv::Result<Receiver<()>> {
    let (sender, receiver) = crossbeam_channel::bounded(1);
    std::thread::Builder::new()
        .name("stdin".into())
        .spawn(move || {
            let mut line = String::new();
            if let Ok(n) = io::stdin().lock().read_line(&mut line) {
                if n > 0 {
                    let _ = sender.send(());
                }
            }
        })
        .map_err(|source| LeapError::Spawn { name: "stdin", source })?;
    Ok(receiver)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_flags_override_config() {
        let cli = Cli::parse_from(["leap-csv", "--bg", "--history", "5", "rec.jsonl"]);
        let config = cli.apply(Config::default());
        assert!(config.policy.contains(Policy::BACKGROUND_FRAMES));
        assert_eq!(config.history_frames, 5);
        assert_eq!(config.pacing, Pacing::Immediate);
        assert_eq!(cli.recording, PathBuf::from("rec.jsonl"));
    }

    #[test]
    fn test_cli_requires_recording() {
        assert!(Cli::try_parse_from(["leap-csv"]).is_err());
    }
}
