use futures::stream::{self, StreamExt};
use semantic::retry::execute_with_retry_async;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::cleanup::merge_subwords;
use crate::config::{ExplainConfig, Perturbation};
use crate::query::{Query, SegmentKind, Token};
use crate::result::{AnchorToken, ImportanceResult, TokenScore};
use crate::scores::normalize_scores;
use crate::stopping::explanation_set;
use crate::{ExplainError, ImportanceCache, MaskedModelOracle, OracleError, TokenDistribution};

/// Perturbation-based token attribution against a masked language model.
///
/// The anchor is the oracle's top prediction for a mask appended to the
/// unperturbed query. Every eligible token is then replaced in turn and the
/// anchor's probability re-read; the drop `p0 - p_i` is that token's raw score.
pub struct TokenImportanceEngine {
    oracle: Arc<dyn MaskedModelOracle>,
    config: ExplainConfig,
    cache: Option<Arc<ImportanceCache>>,
}

impl TokenImportanceEngine {
    pub fn new(
        oracle: Arc<dyn MaskedModelOracle>,
        config: ExplainConfig,
    ) -> Result<Self, ExplainError> {
        config.validate()?;
        Ok(Self {
            oracle,
            config,
            cache: None,
        })
    }

    /// Serve repeated queries from `cache`.
    pub fn with_cache(mut self, cache: Arc<ImportanceCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn config(&self) -> &ExplainConfig {
        &self.config
    }

    pub fn cache(&self) -> Option<&Arc<ImportanceCache>> {
        self.cache.as_ref()
    }

    /// Tokenizes `query` segment by segment. Only content segments yield
    /// eligible tokens.
    pub fn tokenize_query(&self, query: &Query) -> Result<Vec<Token>, ExplainError> {
        let mut tokens = Vec::new();
        for (segment_index, segment) in query.segments().iter().enumerate() {
            if segment.text.trim().is_empty() {
                continue;
            }
            for text in self.oracle.tokenize(&segment.text)? {
                tokens.push(Token {
                    position: tokens.len(),
                    text,
                    segment: segment.kind,
                    segment_index,
                    eligible: segment.kind.is_content(),
                });
            }
        }
        Ok(tokens)
    }

    /// Importance of every eligible token of `query`, cached when a cache is
    /// attached.
    pub async fn explain(&self, query: &Query) -> Result<Arc<ImportanceResult>, ExplainError> {
        match &self.cache {
            Some(cache) => {
                cache
                    .get_or_compute(&query.cache_key(), || self.compute(query))
                    .await
            }
            None => Ok(Arc::new(self.compute(query).await?)),
        }
    }

    /// Runs the full computation, bypassing any cache.
    pub async fn compute(&self, query: &Query) -> Result<ImportanceResult, ExplainError> {
        let start = Instant::now();
        let tokens = self.tokenize_query(query)?;

        let eligible: Vec<&Token> = tokens.iter().filter(|t| t.eligible).collect();
        let has_candidate = query
            .segments()
            .iter()
            .any(|s| s.kind == SegmentKind::Candidate);
        let candidate_tokens = eligible
            .iter()
            .filter(|t| t.segment == SegmentKind::Candidate)
            .count();
        if eligible.is_empty() || (has_candidate && candidate_tokens == 0) {
            return Err(ExplainError::EmptyQuery);
        }

        let mut sequence: Vec<String> = tokens.iter().map(|t| t.text.clone()).collect();
        let mask_position = sequence.len();
        sequence.push(self.oracle.mask_token().to_string());

        let anchor = self.anchor(&sequence, mask_position).await?;

        let placeholder = match &self.config.perturbation {
            Perturbation::Mask => self.oracle.mask_token().to_string(),
            Perturbation::Placeholder { token } => token.clone(),
        };

        let positions: Vec<usize> = eligible.iter().map(|t| t.position).collect();
        let perturbed: Vec<Option<f64>> = stream::iter(positions)
            .map(|position| {
                let mut perturbed = sequence.clone();
                perturbed[position] = placeholder.clone();
                let anchor = anchor.token.as_str();
                async move {
                    match self.predict(&perturbed, mask_position).await {
                        Ok(dist) => Some(f64::from(dist.probability_of(anchor))),
                        Err(err) => {
                            warn!(
                                model = self.oracle.model_name(),
                                position,
                                error = %err,
                                "perturbation_failure"
                            );
                            None
                        }
                    }
                }
            })
            .buffered(self.config.max_concurrency)
            .collect()
            .await;

        let raw: Vec<Option<f64>> = perturbed
            .iter()
            .map(|p| p.map(|p| anchor.probability - p))
            .collect();
        let partial = raw.iter().any(Option::is_none);

        let set = explanation_set(&raw, self.config.stop_threshold);
        let normalized = normalize_scores(&raw, self.config.scale);

        let token_scores: Vec<TokenScore> = eligible
            .iter()
            .enumerate()
            .map(|(idx, token)| TokenScore {
                position: token.position,
                text: token.text.clone(),
                segment: token.segment,
                segment_index: token.segment_index,
                raw_score: raw[idx],
                score: normalized[idx],
                in_explanation: set.contains(idx),
            })
            .collect();
        let explanation = set.ranked.iter().map(|&idx| eligible[idx].position).collect();
        let entries = merge_subwords(&token_scores, self.config.subword);

        info!(
            model = self.oracle.model_name(),
            tokens = tokens.len(),
            eligible = eligible.len(),
            anchor = %anchor.token,
            p0 = anchor.probability,
            explained = set.ranked.len(),
            partial,
            elapsed_micros = start.elapsed().as_micros() as u64,
            "explain_complete"
        );

        Ok(ImportanceResult {
            query: query.sentence(),
            role: query.role().to_string(),
            anchor,
            tokens: token_scores,
            entries,
            explanation,
            coverage: set.coverage,
            partial,
        })
    }

    async fn anchor(
        &self,
        sequence: &[String],
        mask_position: usize,
    ) -> Result<AnchorToken, ExplainError> {
        let dist = self
            .predict(sequence, mask_position)
            .await
            .inspect_err(|err| {
                warn!(
                    model = self.oracle.model_name(),
                    error = %err,
                    "anchor_failure"
                );
            })?;
        let (token, probability) = dist.top().ok_or(OracleError::EmptyDistribution)?;
        Ok(AnchorToken {
            token: token.to_string(),
            probability: f64::from(probability),
        })
    }

    /// One oracle call with the configured retry for transient failures.
    async fn predict(
        &self,
        tokens: &[String],
        mask_position: usize,
    ) -> Result<TokenDistribution, OracleError> {
        execute_with_retry_async(&self.config.retry, OracleError::is_transient, |_attempt| {
            self.oracle.predict_masked(tokens, mask_position)
        })
        .await
        .into_result()
    }
}
