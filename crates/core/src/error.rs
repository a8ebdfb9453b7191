//! Error types for the DocChat domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error type; [`Error`] unifies them.

use thiserror::Error;

/// The top-level error type for all DocChat operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Completion errors ---
    #[error("Completion error: {0}")]
    Completion(#[from] CompletionError),

    // --- Document errors ---
    #[error("Document error: {0}")]
    Document(#[from] DocumentReadError),

    // --- History errors ---
    #[error("History error: {0}")]
    History(#[from] HistoryError),

    // --- Submission errors ---
    #[error("Submission error: {0}")]
    Submit(#[from] SubmitError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failure of the hosted completion model.
///
/// Every variant is recoverable: the submission is dropped and the user may
/// resubmit.
#[derive(Debug, Clone, Error)]
pub enum CompletionError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Response blocked by provider: {reason}")]
    Blocked { reason: String },

    #[error("Provider returned an empty response")]
    EmptyResponse,

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Failure to turn uploaded bytes into context text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentReadError {
    #[error("Document is {size} bytes, limit is {limit} bytes")]
    TooLarge { size: usize, limit: usize },

    #[error("Uploaded file is not a PDF document")]
    NotPdf,

    #[error("Could not read PDF: {0}")]
    Malformed(String),

    #[error("PDF contains no extractable text")]
    NoText,

    #[error("Could not open document: {0}")]
    Unreadable(String),
}

/// Rejected history writes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("Cannot record an empty question")]
    EmptyQuestion,

    #[error("Cannot record an empty response")]
    EmptyResponse,
}

/// Why a submission did not produce an answer.
#[derive(Debug, Clone, Error)]
pub enum SubmitError {
    #[error("The input cannot be empty. Please enter a question.")]
    EmptyQuestion,

    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error("Submission cancelled")]
    Cancelled,
}

impl SubmitError {
    /// Short machine-readable kind, used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EmptyQuestion => "validation",
            Self::Completion(_) => "completion",
            Self::Cancelled => "cancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_error_displays_correctly() {
        let err = Error::Completion(CompletionError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn document_error_displays_limits() {
        let err = DocumentReadError::TooLarge {
            size: 30,
            limit: 10,
        };
        assert!(err.to_string().contains("30"));
        assert!(err.to_string().contains("10"));
    }

    #[test]
    fn submit_error_wraps_completion_transparently() {
        let err: SubmitError = CompletionError::Network("connection reset".into()).into();
        assert_eq!(err.to_string(), "Network error: connection reset");
        assert_eq!(err.kind(), "completion");
        assert_eq!(SubmitError::EmptyQuestion.kind(), "validation");
    }
}
