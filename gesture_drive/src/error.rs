use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriveError {
    /// The source has no more frames (end of a replay, window gone).
    #[error("hand source exhausted")]
    SourceExhausted,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("replay line {line}: {source}")]
    Replay {
        line:   usize,
        source: serde_json::Error,
    },

    #[error("failed to write recording: {0}")]
    Record(serde_json::Error),

    #[error("window error: {0}")]
    Window(String),

    #[error("hand tracker unavailable: {0}")]
    Tracker(String),

    #[error("could not install Ctrl-C handler: {0}")]
    Signal(#[from] ctrlc::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}
