//! Error types for docqa
//!
//! Every failure a question can hit is one of three kinds: the question was
//! malformed, an external service was unavailable, or local state (config,
//! store, ingest input) was unusable. An empty store is not an error.

use std::time::Duration;
use thiserror::Error;

/// Main error type for the question-answering pipeline
#[derive(Error, Debug)]
pub enum QaError {
    /// Empty or whitespace-only question, rejected before any external call
    #[error("Malformed question: {0}")]
    MalformedQuestion(String),

    /// Retrieval asked for fewer than one result
    #[error("Invalid top_k {0}: must be at least 1")]
    InvalidTopK(usize),

    /// Embedding, completion, store or link service failed
    #[error("{service} unavailable: {reason}")]
    ServiceUnavailable { service: String, reason: String },

    /// Service answered with a client error (unknown model, bad request)
    #[error("{service} rejected the request: HTTP {status}: {reason}")]
    ServiceRejected {
        service: String,
        status: u16,
        reason: String,
    },

    /// Timeout errors
    #[error("{service} timed out after {duration_ms}ms")]
    Timeout { service: String, duration_ms: u64 },

    /// Query or ingest embeddings do not match what the store was built with
    #[error("Embedding mismatch: store expects {expected}, got {actual}")]
    EmbeddingMismatch { expected: String, actual: String },

    /// Document store errors
    #[error("Document store error: {0}")]
    StoreError(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Ingestion input errors
    #[error("Ingest error: {0}")]
    IngestError(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{0}")]
    Generic(String),
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, QaError>;

impl QaError {
    /// Shorthand for a service-unavailable error
    pub fn unavailable(service: impl Into<String>, reason: impl ToString) -> Self {
        QaError::ServiceUnavailable {
            service: service.into(),
            reason: reason.to_string(),
        }
    }

    /// Map a failed HTTP send onto the taxonomy
    pub fn from_request(err: reqwest::Error, service: &str, timeout: Duration) -> Self {
        if err.is_timeout() {
            QaError::Timeout {
                service: service.to_string(),
                duration_ms: timeout.as_millis() as u64,
            }
        } else {
            QaError::unavailable(service, format!("Failed to send request: {}", err))
        }
    }

    /// Map a non-success HTTP status onto the taxonomy; 5xx and 429 are transient
    pub fn from_status(service: &str, status: reqwest::StatusCode, body: &str) -> Self {
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            QaError::unavailable(service, format!("HTTP {}: {}", status, body))
        } else {
            QaError::ServiceRejected {
                service: service.to_string(),
                status: status.as_u16(),
                reason: body.to_string(),
            }
        }
    }

    /// Whether retrying the same call could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            QaError::Timeout { .. } => true,
            QaError::HttpError(_) => true,
            QaError::ServiceUnavailable { .. } => true,

            QaError::MalformedQuestion(_) => false,
            QaError::InvalidTopK(_) => false,
            QaError::ServiceRejected { .. } => false,
            QaError::EmbeddingMismatch { .. } => false,
            QaError::ConfigError(_) => false,
            QaError::SerializationError(_) => false,

            _ => false,
        }
    }
}

/// Convert anyhow errors to QaError
impl From<anyhow::Error> for QaError {
    fn from(err: anyhow::Error) -> Self {
        QaError::Generic(err.to_string())
    }
}
