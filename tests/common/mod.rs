//! Shared fakes for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use designspace::{
    EmbeddingProvider, ExplainConfig, MaskedModelOracle, OracleError, SemanticError,
    TokenDistribution,
};
use semantic::retry::RetryConfig;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub const CONVERGENT_ROLE: &str =
    "You are a design expert able to classify design proposals as bad, poor, regular, good or excellent.";
pub const MASK: &str = "<mask>";

/// Concept axes: environment, cost, comfort, strength.
const LEXICON: &[(&str, [f32; 4])] = &[
    ("environmental", [1.0, 0.0, 0.0, 0.0]),
    ("emissions", [1.0, 0.0, 0.0, 0.0]),
    ("impact", [0.3, 0.0, 0.0, 0.0]),
    ("minimize", [0.2, 0.3, 0.0, 0.0]),
    ("reduces", [0.2, 0.2, 0.0, 0.0]),
    ("cost", [0.0, 1.0, 0.0, 0.0]),
    ("price", [0.0, 1.0, 0.0, 0.0]),
    ("increases", [0.0, 0.2, 0.1, 0.0]),
    ("comfort", [0.0, 0.0, 1.0, 0.0]),
    ("improves", [0.1, 0.0, 0.2, 0.0]),
    ("recycled", [0.8, 0.0, 0.0, 0.2]),
    ("steel", [0.0, 0.0, 0.0, 1.0]),
    ("frame", [0.0, 0.0, 0.2, 0.8]),
    ("chair", [0.0, 0.0, 0.6, 0.4]),
    ("lightweight", [0.1, 0.0, 0.3, 0.6]),
];

/// Bag-of-concepts embedder. Texts without a known word embed to zero.
#[derive(Default)]
pub struct LexiconProvider {
    calls: AtomicUsize,
}

impl LexiconProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn vector(text: &str) -> Vec<f32> {
        let mut out = vec![0.0f32; 4];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let word = word.to_lowercase();
            if let Some((_, v)) = LEXICON.iter().find(|(w, _)| *w == word) {
                for (o, x) in out.iter_mut().zip(v) {
                    *o += x;
                }
            }
        }
        out
    }
}

#[async_trait]
impl EmbeddingProvider for LexiconProvider {
    fn model_name(&self) -> &str {
        "lexicon-4"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SemanticError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }
}

/// Masked-model fake. The anchor `good` starts at `base` and loses the weight
/// of every weighted token absent from the input.
pub struct ScriptedOracle {
    base: f32,
    weights: HashMap<String, f32>,
    failing: Option<String>,
    calls: AtomicUsize,
    seen: Mutex<Vec<Vec<String>>>,
}

impl ScriptedOracle {
    pub fn new(base: f32, weights: &[(&str, f32)]) -> Self {
        Self {
            base,
            weights: weights.iter().map(|(t, w)| (t.to_string(), *w)).collect(),
            failing: None,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Every perturbation of `token` fails.
    pub fn failing_on(mut self, token: &str) -> Self {
        self.failing = Some(token.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<Vec<String>> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl MaskedModelOracle for ScriptedOracle {
    fn model_name(&self) -> &str {
        "scripted"
    }

    fn mask_token(&self) -> &str {
        MASK
    }

    fn tokenize(&self, text: &str) -> Result<Vec<String>, OracleError> {
        let mut out = Vec::new();
        let mut spaced = false;
        for (i, word) in text.split(' ').enumerate() {
            if word.is_empty() {
                spaced = true;
                continue;
            }
            if i > 0 || spaced {
                out.push(format!("Ġ{word}"));
            } else {
                out.push(word.to_string());
            }
            spaced = false;
        }
        Ok(out)
    }

    async fn predict_masked(
        &self,
        tokens: &[String],
        mask_position: usize,
    ) -> Result<TokenDistribution, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(tokens.to_vec());
        // Give concurrent callers a chance to overlap.
        tokio::time::sleep(Duration::from_millis(2)).await;

        if tokens.get(mask_position).map(String::as_str) != Some(MASK) {
            return Err(OracleError::InvalidPosition {
                position: mask_position,
                len: tokens.len(),
            });
        }
        let present = |t: &str| tokens.iter().any(|x| x == t);
        if let Some(token) = &self.failing {
            if !present(token) {
                return Err(OracleError::Inference(format!("cannot score without {token}")));
            }
        }

        let lost: f32 = self
            .weights
            .iter()
            .filter(|(t, _)| !present(t))
            .map(|(_, w)| *w)
            .sum();
        let p = (self.base - lost).max(0.0);
        Ok(TokenDistribution::from_pairs([("good", p), ("bad", 1.0 - p)]))
    }
}

/// Explain config with a near-zero retry delay.
pub fn fast_explain_config() -> ExplainConfig {
    ExplainConfig::default().with_retry(
        RetryConfig::default()
            .with_base_delay(Duration::from_millis(1))
            .with_jitter(false),
    )
}
