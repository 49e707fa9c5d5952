use std::io;
use thiserror::Error;

/// Errors surfaced while producing or normalizing embeddings.
#[derive(Debug, Error)]
pub enum SemanticError {
    /// The embedding backend rejected or failed the request (quota, auth, bad payload).
    #[error("embedding provider failure: {0}")]
    Provider(String),
    /// Transport-level failure or non-success HTTP status from a remote provider.
    #[error("HTTP error {status}: {body}")]
    Http { status: u16, body: String },
    /// Connection, DNS or timeout failures before a response was received.
    #[error("transport failure: {0}")]
    Transport(String),
    /// Configuration is inconsistent (e.g., api mode without an endpoint).
    #[error("invalid semantic config: {0}")]
    InvalidConfig(String),
    /// A text submitted for embedding was empty after trimming.
    #[error("text at index {index} is empty")]
    EmptyText { index: usize },
    /// The provider returned a different number of vectors than texts submitted.
    #[error("provider returned {got} embeddings for {expected} inputs")]
    CountMismatch { expected: usize, got: usize },
    /// Vectors in one batch do not share a dimensionality.
    #[error("vector {index} has dimension {got}, expected {expected}")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        got: usize,
    },
    /// The provider answered with something that is not an embedding.
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
    /// Low-level IO failures.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl SemanticError {
    /// Whether a retry has a chance of succeeding.
    ///
    /// Timeouts, connection failures, 429 and 5xx answers are transient; client
    /// errors, config problems and malformed inputs are not.
    pub fn is_transient(&self) -> bool {
        match self {
            SemanticError::Transport(_) => true,
            SemanticError::Http { status, .. } => *status == 429 || *status >= 500,
            SemanticError::Provider(_)
            | SemanticError::InvalidConfig(_)
            | SemanticError::EmptyText { .. }
            | SemanticError::CountMismatch { .. }
            | SemanticError::DimensionMismatch { .. }
            | SemanticError::MalformedResponse(_)
            | SemanticError::Io(_) => false,
        }
    }
}

impl Clone for SemanticError {
    fn clone(&self) -> Self {
        match self {
            SemanticError::Provider(s) => SemanticError::Provider(s.clone()),
            SemanticError::Http { status, body } => SemanticError::Http {
                status: *status,
                body: body.clone(),
            },
            SemanticError::Transport(s) => SemanticError::Transport(s.clone()),
            SemanticError::InvalidConfig(s) => SemanticError::InvalidConfig(s.clone()),
            SemanticError::EmptyText { index } => SemanticError::EmptyText { index: *index },
            SemanticError::CountMismatch { expected, got } => SemanticError::CountMismatch {
                expected: *expected,
                got: *got,
            },
            SemanticError::DimensionMismatch {
                index,
                expected,
                got,
            } => SemanticError::DimensionMismatch {
                index: *index,
                expected: *expected,
                got: *got,
            },
            SemanticError::MalformedResponse(s) => SemanticError::MalformedResponse(s.clone()),
            SemanticError::Io(err) => SemanticError::Io(io::Error::new(err.kind(), err.to_string())),
        }
    }
}
