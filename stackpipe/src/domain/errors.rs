//! Structured error types for stackpipe
//!
//! Using thiserror for automatic Display implementation and error chaining.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Cannot {operation} while the pipeline is {state}")]
    InvalidState { operation: &'static str, state: &'static str },

    #[error("At least one output connection is required")]
    NoOutputs,

    #[error("No output stream with index {0}")]
    UnknownStream(usize),

    #[error("Failed to write to output stream {index}: {source}")]
    StreamWrite {
        index: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write dictionary artifact {path}: {source}")]
    ArtifactWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Invalid filter condition \"{0}\": expected SYM, EXEC or ANY followed by a regex")]
    InvalidCondition(String),

    #[error("Invalid regex in filter condition \"{condition}\": {source}")]
    InvalidRegex {
        condition: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid value from the frame classifier: it is not a list of size {expected}")]
    NotAList { expected: usize },

    #[error("Invalid value from the frame classifier: a non-boolean element at index {0}")]
    NonBoolean(usize),

    #[error("Frame classifier failed: {0}")]
    ClassifierFailed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ConnectError {
    #[error("Empty connection instructions")]
    Empty,

    #[error("Unknown connection type \"{0}\" (expected tcp or pipe)")]
    UnknownKind(String),

    #[error("Malformed connection endpoint \"{0}\"")]
    MalformedEndpoint(String),

    #[error("Failed to connect to {endpoint}: {source}")]
    ConnectFailed {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid control message: {0}")]
    InvalidMessage(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
