//! Error types for roam

use thiserror::Error;

/// Result type alias for roam operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for roam operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A repository id that is not in the store
    #[error("repository {0} not found")]
    NotFound(String),

    /// Input that cannot be mapped to a repository (bad URL, unknown remote)
    #[error("{0}")]
    InvalidInput(String),

    /// Nothing to pick from
    #[error("{0}")]
    NoCandidates(String),

    /// The user backed out of an interactive prompt
    #[error("cancelled")]
    Cancelled,

    /// A git invocation exited with a non-zero status
    #[error("git {args} failed: {stderr}")]
    Git { args: String, stderr: String },

    /// Any other subprocess failure
    #[error("command `{command}` failed: {message}")]
    Command { command: String, message: String },

    /// Remote API failure
    #[error("Remote API error: {0}")]
    Api(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// One or more batch tasks failed
    #[error(transparent)]
    Batch(#[from] BatchError),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

/// Aggregate failure of a batch run, keeping every failing task's message
#[derive(Error, Debug)]
#[error("{desc} failed: {} task(s) failed", .failures.len())]
pub struct BatchError {
    /// Description of the batch
    pub desc: String,
    /// `(task name, message)` for each failed task, in submission order
    pub failures: Vec<(String, String)>,
}
