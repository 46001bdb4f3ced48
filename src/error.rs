/// Errors raised by the replay and dispatch machinery.
///
/// Listener callbacks never fail; these cover opening recordings, decoding
/// records and thread plumbing.
#[derive(Debug, thiserror::Error)]
pub enum LeapError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed record on line {line}: {source}")]
    Record {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Event stream stopped")]
    StreamStopped,

    #[error("Timeout waiting for events")]
    Timeout,

    #[error("Dispatch thread panicked")]
    DispatchPanicked,
}
