use thiserror::Error;

/// Failures reported by a [`MaskedModelOracle`](crate::MaskedModelOracle).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OracleError {
    /// The model could not be reached or loaded.
    #[error("oracle unavailable: {0}")]
    Unavailable(String),
    /// The forward pass failed.
    #[error("oracle inference failed: {0}")]
    Inference(String),
    #[error("tokenizer error: {0}")]
    Tokenizer(String),
    /// A token string has no id in the model vocabulary.
    #[error("token '{0}' is not in the oracle vocabulary")]
    UnknownToken(String),
    #[error("mask position {position} is out of range for {len} tokens")]
    InvalidPosition { position: usize, len: usize },
    /// The model returned no probabilities for the masked position.
    #[error("oracle returned an empty distribution")]
    EmptyDistribution,
    /// Model or tokenizer file is neither on disk nor downloadable.
    #[error("model asset missing: {0}")]
    AssetMissing(String),
    #[error("asset download failed: {0}")]
    Download(String),
    #[error("io error: {0}")]
    Io(String),
}

impl OracleError {
    /// Whether a second attempt has a chance of succeeding.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            OracleError::Unavailable(_) | OracleError::Inference(_) | OracleError::Download(_)
        )
    }
}

impl From<std::io::Error> for OracleError {
    fn from(err: std::io::Error) -> Self {
        OracleError::Io(err.to_string())
    }
}

/// Errors returned by the token importance engine.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExplainError {
    /// The query has nothing to explain: the candidate, or every content
    /// segment, tokenized to zero tokens.
    #[error("query has no eligible content tokens")]
    EmptyQuery,

    /// The unperturbed query could not be scored, so there is no anchor.
    #[error("anchor prediction failed: {0}")]
    Oracle(#[from] OracleError),

    #[error("invalid explain config: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(OracleError::Inference("timeout".into()).is_transient());
        assert!(OracleError::Unavailable("busy".into()).is_transient());
        assert!(!OracleError::UnknownToken("xyz".into()).is_transient());
        assert!(!OracleError::InvalidPosition { position: 9, len: 3 }.is_transient());
        assert!(!OracleError::EmptyDistribution.is_transient());
    }

    #[test]
    fn oracle_error_converts_into_explain_error() {
        let err: ExplainError = OracleError::EmptyDistribution.into();
        assert_eq!(err, ExplainError::Oracle(OracleError::EmptyDistribution));
        assert!(err.to_string().contains("empty distribution"));
    }

    #[test]
    fn io_errors_are_captured_as_text() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "model.onnx");
        let err = OracleError::from(io);
        assert!(matches!(err, OracleError::Io(msg) if msg.contains("model.onnx")));
    }
}
