use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for session setup
pub type Result<T> = std::result::Result<T, FootfallError>;

/// Faults raised by the perception engine collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("engine authentication rejected: {0}")]
    Authentication(String),

    #[error("engine is not ready: {0}")]
    NotReady(String),

    #[error("engine fault: {0}")]
    Engine(String),
}

impl ExtractionError {
    pub fn engine<S: Into<String>>(msg: S) -> Self {
        Self::Engine(msg.into())
    }

    pub fn not_ready<S: Into<String>>(msg: S) -> Self {
        Self::NotReady(msg.into())
    }
}

/// Errors on the row, frame and event sinks
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("record write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("frame writer error: {0}")]
    Frame(String),
}

impl SinkError {
    pub fn open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Open {
            path: path.into(),
            source,
        }
    }

    pub fn frame<S: Into<String>>(msg: S) -> Self {
        Self::Frame(msg.into())
    }
}

/// Malformed replay input
#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("failed to open replay {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("replay read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("replay line {line} is not a frame: {source}")]
    Parse {
        line: u64,
        #[source]
        source: serde_json::Error,
    },
}

/// Setup-time failures that abort a session before the first frame
#[derive(Error, Debug)]
pub enum FootfallError {
    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Replay(#[from] ReplayError),

    #[error("frame source error: {0}")]
    Source(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl FootfallError {
    pub fn frame_source<S: Into<String>>(msg: S) -> Self {
        Self::Source(msg.into())
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }
}
