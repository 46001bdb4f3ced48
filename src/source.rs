use crate::protocol::{self, Event};
use crate::{LeapError, Result};
use crossbeam_channel::{Receiver, SendTimeoutError, Sender};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const CHANNEL_CAPACITY: usize = 256;

/// Longest the reader blocks before re-checking the stop flag.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How fast a recording is replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pacing {
    /// Hand events over as soon as they are parsed.
    #[default]
    Immediate,
    /// Sleep between frames for the difference of their timestamps.
    Realtime,
}

/// Handle to a stream of recorded events.
///
/// A background reader thread parses the recording line by line and feeds
/// a bounded channel. The stream ends once the recording is exhausted and
/// every parsed event has been received. Dropping the stream stops the
/// reader and joins it.
pub struct EventStream {
    receiver: Receiver<Event>,
    stop_flag: Arc<AtomicBool>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl EventStream {
    /// Open a recording file and start replaying it.
    pub fn open<P: AsRef<Path>>(path: P, pacing: Pacing) -> Result<EventStream> {
        let file = File::open(path.as_ref())?;
        log::info!("Replaying {}", path.as_ref().display());
        Self::start(BufReader::new(file), pacing)
    }

    /// Start the reader thread over any line source.
    pub fn start<R>(reader: R, pacing: Pacing) -> Result<EventStream>
    where
        R: BufRead + Send + 'static,
    {
        let (sender, receiver) = crossbeam_channel::bounded(CHANNEL_CAPACITY);
        let stop_flag = Arc::new(AtomicBool::new(false));
        let stop_clone = stop_flag.clone();

        let thread = std::thread::Builder::new()
            .name("leap-replay".into())
            .spawn(move || {
                replay_reader_loop(reader, sender, stop_clone, pacing);
            })
            .map_err(|source| LeapError::Spawn { name: "replay", source })?;

        Ok(EventStream {
            receiver,
            stop_flag,
            thread: Some(thread),
        })
    }

    /// A finished stream that yields `events` in order, without a reader thread.
    pub fn from_events<I>(events: I) -> EventStream
    where
        I: IntoIterator<Item = Event>,
    {
        let (sender, receiver) = crossbeam_channel::unbounded();
        for event in events {
            // receiver is alive, cannot fail
            let _ = sender.send(event);
        }
        EventStream {
            receiver,
            stop_flag: Arc::new(AtomicBool::new(false)),
            thread: None,
        }
    }

    /// Receive the next event (blocks until available).
    pub fn recv(&self) -> Result<Event> {
        self.receiver.recv().map_err(|_| LeapError::StreamStopped)
    }

    /// Receive an event with a timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Event> {
        self.receiver.recv_timeout(timeout).map_err(|e| match e {
            crossbeam_channel::RecvTimeoutError::Timeout => LeapError::Timeout,
            crossbeam_channel::RecvTimeoutError::Disconnected => LeapError::StreamStopped,
        })
    }

    pub(crate) fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop_flag.clone()
    }

    fn shutdown(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Runs in the dedicated reader thread.
///
/// Malformed lines are logged and skipped. A read error ends the replay.
fn replay_reader_loop<R: BufRead>(
    reader: R,
    sender: Sender<Event>,
    stop_flag: Arc<AtomicBool>,
    pacing: Pacing,
) {
    let mut last_timestamp: Option<i64> = None;
    let mut sent: u64 = 0;
    let mut skipped: u64 = 0;

    log::info!("Replay reader started ({:?})", pacing);

    for (index, line) in reader.lines().enumerate() {
        if stop_flag.load(Ordering::Relaxed) {
            log::info!("Replay reader stopping (stop flag set)");
            return;
        }

        let line = match line {
            Ok(line) => line,
            Err(e) => {
                log::warn!("Recording read error: {}", e);
                break;
            }
        };

        let event = match protocol::parse_line(&line, index + 1) {
            Ok(Some(event)) => event,
            Ok(None) => continue,
            Err(e) => {
                log::warn!("Skipping record: {}", e);
                skipped += 1;
                continue;
            }
        };

        if pacing == Pacing::Realtime {
            if let Event::Frame { frame } = &event {
                if let Some(previous) = last_timestamp {
                    let delta = frame.timestamp.saturating_sub(previous);
                    if delta > 0 && !sleep_unless_stopped(delta as u64, &stop_flag) {
                        return;
                    }
                }
                last_timestamp = Some(frame.timestamp);
            }
        }

        if !send_unless_stopped(&sender, event, &stop_flag) {
            return;
        }
        sent += 1;
    }

    log::info!("Replay finished: {} events, {} skipped", sent, skipped);
}

/// Blocking send that gives up when the stop flag is raised or nobody listens.
fn send_unless_stopped(sender: &Sender<Event>, mut event: Event, stop_flag: &AtomicBool) -> bool {
    loop {
        match sender.send_timeout(event, POLL_INTERVAL) {
            Ok(()) => return true,
            Err(SendTimeoutError::Timeout(returned)) => {
                if stop_flag.load(Ordering::Relaxed) {
                    return false;
                }
                log::trace!("Event channel full, waiting");
                event = returned;
            }
            Err(SendTimeoutError::Disconnected(_)) => {
                log::info!("Event channel disconnected, stopping reader");
                return false;
            }
        }
    }
}

fn sleep_unless_stopped(micros: u64, stop_flag: &AtomicBool) -> bool {
    let mut remaining = Duration::from_micros(micros);
    while !remaining.is_zero() {
        if stop_flag.load(Ordering::Relaxed) {
            return false;
        }
        let step = remaining.min(POLL_INTERVAL);
        std::thread::sleep(step);
        remaining -= step;
    }
    true
}
