//! Error types for print operations

use parking_lot::Mutex;
use thiserror::Error;

/// Print operation error types
///
/// Errors are cloneable so the first failure of an operation can be kept in
/// a shared slot and still handed back to the caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PrintError {
    /// No printer available and one was required
    #[error("No printer available")]
    ResolutionExhausted,

    /// Temp-file or backend surface failure
    #[error("Surface creation failed: {0}")]
    SurfaceCreation(String),

    /// Backend rejected or failed the job
    #[error("Job submission failed: {0}")]
    Submission(String),

    /// Explicit user cancellation (not a failure)
    #[error("Operation cancelled by user")]
    UserCancelled,

    /// Document renderer failed on a page
    #[error("Render failed on page {page}: {message}")]
    Render { page: usize, message: String },

    /// Error reported by a backend
    #[error("Backend error: {0}")]
    Backend(String),

    /// IO error while writing a document
    #[error("IO error: {0}")]
    Io(String),

    /// Invalid operation configuration
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Operation not supported by this surface or backend
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl PrintError {
    /// Message without the variant prefix, used when re-wrapping backend errors
    pub fn into_message(self) -> String {
        match self {
            PrintError::SurfaceCreation(msg)
            | PrintError::Submission(msg)
            | PrintError::Backend(msg)
            | PrintError::Io(msg)
            | PrintError::InvalidConfig(msg)
            | PrintError::Unsupported(msg) => msg,
            other => other.to_string(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, PrintError::UserCancelled)
    }
}

impl From<std::io::Error> for PrintError {
    fn from(err: std::io::Error) -> Self {
        PrintError::Io(err.to_string())
    }
}

/// Result type for print operations
pub type PrintResult<T> = Result<T, PrintError>;

/// First-write-wins error slot
///
/// Later errors are dropped once the slot holds a value.
#[derive(Debug, Default)]
pub struct FirstError {
    slot: Mutex<Option<PrintError>>,
}

impl FirstError {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `err` if the slot is empty; returns whether it was stored
    pub fn record(&self, err: PrintError) -> bool {
        let mut slot = self.slot.lock();
        if slot.is_some() {
            tracing::debug!(error = %err, "Dropping error, an earlier one is kept");
            return false;
        }
        *slot = Some(err);
        true
    }

    pub fn get(&self) -> Option<PrintError> {
        self.slot.lock().clone()
    }

    pub fn is_set(&self) -> bool {
        self.slot.lock().is_some()
    }
}
