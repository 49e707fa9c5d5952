use std::cmp::Ordering;
use tracing::debug;

use crate::types::{MatchError, RankConfig, RankedCandidate, ReferenceMatch};

/// Cosine similarity of two vectors. Symmetric; a zero vector scores 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, MatchError> {
    if a.len() != b.len() {
        return Err(MatchError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }
    Ok((dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0) as f32)
}

fn check_labels<V, S>(vectors: &[V], labels: &[S]) -> Result<(), MatchError> {
    if vectors.len() != labels.len() {
        return Err(MatchError::LengthMismatch {
            vectors: vectors.len(),
            labels: labels.len(),
        });
    }
    Ok(())
}

/// Ranks `candidates` by cosine similarity to `reference`, highest first.
///
/// Equal scores keep their input order. Inputs are not modified.
pub fn rank_by_similarity<V, S>(
    reference: &[f32],
    candidates: &[V],
    labels: &[S],
    cfg: &RankConfig,
) -> Result<Vec<RankedCandidate>, MatchError>
where
    V: AsRef<[f32]>,
    S: AsRef<str>,
{
    cfg.validate()?;
    check_labels(candidates, labels)?;

    let mut ranked = candidates
        .iter()
        .zip(labels)
        .enumerate()
        .map(|(index, (vector, label))| {
            Ok(RankedCandidate {
                index,
                label: label.as_ref().to_string(),
                score: cosine_similarity(reference, vector.as_ref())?,
            })
        })
        .collect::<Result<Vec<_>, MatchError>>()?;

    // `sort_by` is stable, so ties stay in input order.
    ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

    if let Some(min) = cfg.min_score {
        ranked.retain(|c| c.score >= min);
    }
    if let Some(max) = cfg.max_results {
        ranked.truncate(max);
    }

    debug!(candidates = candidates.len(), kept = ranked.len(), "rank_complete");
    Ok(ranked)
}

/// For every candidate, the reference with the highest similarity.
/// The first reference wins ties.
pub fn best_reference_per_candidate<V, W, S, T>(
    candidates: &[V],
    candidate_labels: &[S],
    references: &[W],
    reference_labels: &[T],
) -> Result<Vec<ReferenceMatch>, MatchError>
where
    V: AsRef<[f32]>,
    W: AsRef<[f32]>,
    S: AsRef<str>,
    T: AsRef<str>,
{
    check_labels(candidates, candidate_labels)?;
    check_labels(references, reference_labels)?;
    if references.is_empty() {
        return Err(MatchError::NoReferences);
    }

    candidates
        .iter()
        .zip(candidate_labels)
        .enumerate()
        .map(|(candidate_index, (vector, label))| {
            let mut best: Option<(usize, f32)> = None;
            for (ref_index, reference) in references.iter().enumerate() {
                let score = cosine_similarity(vector.as_ref(), reference.as_ref())?;
                if best.is_none_or(|(_, top)| score > top) {
                    best = Some((ref_index, score));
                }
            }
            let (reference_index, score) = best.ok_or(MatchError::NoReferences)?;
            Ok(ReferenceMatch {
                candidate_index,
                candidate: label.as_ref().to_string(),
                reference_index,
                reference: reference_labels[reference_index].as_ref().to_string(),
                score,
            })
        })
        .collect()
}

/// Ranking front-end carrying a fixed [`RankConfig`].
#[derive(Debug, Clone, Default)]
pub struct SimilarityRanker {
    config: RankConfig,
}

impl SimilarityRanker {
    pub fn new(config: RankConfig) -> Result<Self, MatchError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RankConfig {
        &self.config
    }

    pub fn rank<V, S>(
        &self,
        reference: &[f32],
        candidates: &[V],
        labels: &[S],
    ) -> Result<Vec<RankedCandidate>, MatchError>
    where
        V: AsRef<[f32]>,
        S: AsRef<str>,
    {
        rank_by_similarity(reference, candidates, labels, &self.config)
    }

    pub fn best_references<V, W, S, T>(
        &self,
        candidates: &[V],
        candidate_labels: &[S],
        references: &[W],
        reference_labels: &[T],
    ) -> Result<Vec<ReferenceMatch>, MatchError>
    where
        V: AsRef<[f32]>,
        W: AsRef<[f32]>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        best_reference_per_candidate(candidates, candidate_labels, references, reference_labels)
    }
}
