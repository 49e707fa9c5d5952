use async_trait::async_trait;
use std::sync::Arc;

use crate::OracleError;

/// Probability distribution over an oracle vocabulary for one masked position.
///
/// The vocabulary is shared so that large models do not copy every token
/// string per prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenDistribution {
    vocab: Arc<Vec<String>>,
    probs: Vec<f32>,
}

impl TokenDistribution {
    pub fn new(vocab: Arc<Vec<String>>, probs: Vec<f32>) -> Result<Self, OracleError> {
        if vocab.len() != probs.len() {
            return Err(OracleError::Inference(format!(
                "distribution has {} probabilities for {} vocabulary entries",
                probs.len(),
                vocab.len()
            )));
        }
        Ok(Self { vocab, probs })
    }

    /// Builds a distribution from explicit `(token, probability)` pairs.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f32)>,
        S: Into<String>,
    {
        let (vocab, probs): (Vec<String>, Vec<f32>) =
            pairs.into_iter().map(|(t, p)| (t.into(), p)).unzip();
        Self {
            vocab: Arc::new(vocab),
            probs,
        }
    }

    /// Highest-probability token. The earliest vocabulary entry wins ties.
    pub fn top(&self) -> Option<(&str, f32)> {
        let mut best: Option<(usize, f32)> = None;
        for (idx, &p) in self.probs.iter().enumerate() {
            if !p.is_finite() {
                continue;
            }
            match best {
                Some((_, bp)) if p <= bp => {}
                _ => best = Some((idx, p)),
            }
        }
        best.map(|(idx, p)| (self.vocab[idx].as_str(), p))
    }

    /// Probability assigned to `token`, or 0 when the token is not in the vocabulary.
    pub fn probability_of(&self, token: &str) -> f32 {
        self.vocab
            .iter()
            .position(|t| t == token)
            .map_or(0.0, |idx| self.probs[idx])
    }

    pub fn len(&self) -> usize {
        self.probs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probs.is_empty()
    }
}

/// A frozen masked language model.
///
/// Implementations must be deterministic: the same token sequence and mask
/// position always give the same distribution.
#[async_trait]
pub trait MaskedModelOracle: Send + Sync {
    fn model_name(&self) -> &str;

    /// Vocabulary string used to hide a position (e.g. `<mask>` or `[MASK]`).
    fn mask_token(&self) -> &str;

    /// Splits `text` into vocabulary tokens without special tokens.
    ///
    /// Leading whitespace is significant for byte-level vocabularies.
    fn tokenize(&self, text: &str) -> Result<Vec<String>, OracleError>;

    /// Distribution over the vocabulary at `mask_position` of `tokens`.
    async fn predict_masked(
        &self,
        tokens: &[String],
        mask_position: usize,
    ) -> Result<TokenDistribution, OracleError>;
}
