use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Optional trimming applied after ranking.
///
/// The default keeps every candidate, so the ranked list has the same length
/// as the input.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct RankConfig {
    /// Keep at most this many entries.
    #[serde(default)]
    pub max_results: Option<usize>,
    /// Drop entries scoring below this value.
    #[serde(default)]
    pub min_score: Option<f32>,
}

impl RankConfig {
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }

    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = Some(min_score);
        self
    }

    pub fn validate(&self) -> Result<(), MatchError> {
        if self.max_results == Some(0) {
            return Err(MatchError::InvalidConfig(
                "max_results must be greater than zero".into(),
            ));
        }
        if let Some(min) = self.min_score {
            if !(-1.0..=1.0).contains(&min) {
                return Err(MatchError::InvalidConfig(
                    "min_score must lie in [-1, 1]".into(),
                ));
            }
        }
        Ok(())
    }
}

/// One candidate's similarity to the reference it was ranked against.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedCandidate {
    /// Position of the candidate in the ranked input.
    pub index: usize,
    pub label: String,
    /// Cosine similarity in [-1, 1].
    pub score: f32,
}

/// The reference text a candidate is closest to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReferenceMatch {
    pub candidate_index: usize,
    pub candidate: String,
    pub reference_index: usize,
    pub reference: String,
    pub score: f32,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MatchError {
    #[error("invalid rank config: {0}")]
    InvalidConfig(String),
    #[error("vector dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },
    #[error("{vectors} vectors supplied with {labels} labels")]
    LengthMismatch { vectors: usize, labels: usize },
    #[error("no reference vectors supplied")]
    NoReferences,
}
