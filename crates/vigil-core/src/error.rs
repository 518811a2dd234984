use thiserror::Error;

/// Error types for the Vigil harness.
///
/// Absence of an element is never an error; probes report it as
/// [`crate::probe::ProbeResult::Absent`].
#[derive(Error, Debug)]
pub enum VerifyError {
    /// Navigating to a page failed (network error, crashed tab, ...).
    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    /// The rendering session reported an error while being driven.
    #[error("Session error: {0}")]
    Session(String),

    /// A selector could not be parsed by the session.
    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    /// A pattern invariant could not be compiled.
    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Configuration is missing or malformed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A bounded operation exceeded its budget.
    #[error("{what} timed out after {millis} ms")]
    Timeout { what: String, millis: u64 },

    /// The run was cancelled before the operation completed.
    #[error("Run cancelled")]
    Cancelled,

    /// The session cannot perform the requested capability.
    #[error("Unsupported by session: {0}")]
    Unsupported(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error (suite config, report output).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl VerifyError {
    /// Returns true if this error came from run-level cancellation.
    ///
    /// Cancelled work is reported as incomplete, never as failed.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, VerifyError::Cancelled)
    }

    /// Returns true if this error means the page itself could not be reached.
    pub fn is_navigation(&self) -> bool {
        match self {
            VerifyError::Navigation { .. } => true,
            VerifyError::Timeout { what, .. } => what.starts_with("navigation"),
            _ => false,
        }
    }
}
