use semantic::retry::RetryConfig;
use serde::{Deserialize, Serialize};

use crate::ExplainError;

/// What replaces a token when its influence is measured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Perturbation {
    /// The oracle's own mask token.
    Mask,
    /// A fixed vocabulary token, e.g. `<unk>` or a neutral word.
    Placeholder { token: String },
}

/// Rescaling applied to raw scores before display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleMode {
    /// Divide by the largest absolute raw score. Range [-1, 1], sign kept.
    MaxAbs,
    /// Min-max to [0, 1].
    MinMax,
}

/// Sub-word marking convention of the oracle vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubwordScheme {
    /// Byte-level BPE (RoBERTa, GPT-2): `Ġ` marks a word start.
    ByteLevel,
    /// WordPiece (BERT): `##` marks a continuation.
    WordPiece,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplainConfig {
    pub version: u32,
    /// Share of total positive attribution after which the explanation set
    /// stops growing. Growth stops once the share strictly exceeds this.
    pub stop_threshold: f64,
    pub perturbation: Perturbation,
    /// Oracle calls in flight at once during perturbation.
    pub max_concurrency: usize,
    /// Retry policy for each oracle call.
    pub retry: RetryConfig,
    pub scale: ScaleMode,
    pub subword: SubwordScheme,
}

impl Default for ExplainConfig {
    fn default() -> Self {
        Self {
            version: 1,
            stop_threshold: 0.8,
            perturbation: Perturbation::Mask,
            max_concurrency: 8,
            retry: RetryConfig::default(),
            scale: ScaleMode::MaxAbs,
            subword: SubwordScheme::ByteLevel,
        }
    }
}

impl ExplainConfig {
    pub fn with_stop_threshold(mut self, threshold: f64) -> Self {
        self.stop_threshold = threshold;
        self
    }

    pub fn with_perturbation(mut self, perturbation: Perturbation) -> Self {
        self.perturbation = perturbation;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_scale(mut self, scale: ScaleMode) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_subword(mut self, subword: SubwordScheme) -> Self {
        self.subword = subword;
        self
    }

    pub fn validate(&self) -> Result<(), ExplainError> {
        if self.version < 1 {
            return Err(ExplainError::InvalidConfig(format!(
                "version must be >= 1 (got {})",
                self.version
            )));
        }
        if !(self.stop_threshold > 0.0 && self.stop_threshold <= 1.0) {
            return Err(ExplainError::InvalidConfig(format!(
                "stop_threshold must be in (0, 1] (got {})",
                self.stop_threshold
            )));
        }
        if self.max_concurrency == 0 {
            return Err(ExplainError::InvalidConfig(
                "max_concurrency must be >= 1".into(),
            ));
        }
        if let Perturbation::Placeholder { token } = &self.perturbation {
            if token.trim().is_empty() {
                return Err(ExplainError::InvalidConfig(
                    "placeholder token must not be empty".into(),
                ));
            }
        }
        Ok(())
    }
}
