use serde::{Deserialize, Serialize};

use crate::query::SegmentKind;

/// The oracle's top prediction for the unperturbed query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorToken {
    pub token: String,
    /// `p0`, the anchor's probability with nothing perturbed.
    pub probability: f64,
}

/// Score of one eligible oracle token, before sub-word merging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenScore {
    /// Position in the full tokenized query.
    pub position: usize,
    pub text: String,
    pub segment: SegmentKind,
    /// Index of the source segment within the query.
    pub segment_index: usize,
    /// `p0 - p_i`. `None` when the perturbed call failed.
    pub raw_score: Option<f64>,
    pub score: Option<f64>,
    pub in_explanation: bool,
}

/// A human-readable unit (one or more merged sub-word tokens).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportanceEntry {
    pub text: String,
    pub segment: SegmentKind,
    pub positions: Vec<usize>,
    /// Raw score of the most influential fragment.
    pub raw_score: Option<f64>,
    /// Normalized score of the most influential fragment.
    pub score: Option<f64>,
    pub in_explanation: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportanceResult {
    /// Sentence without the role description.
    pub query: String,
    pub role: String,
    pub anchor: AnchorToken,
    pub tokens: Vec<TokenScore>,
    pub entries: Vec<ImportanceEntry>,
    /// Token positions in the explanation set, highest raw score first.
    pub explanation: Vec<usize>,
    /// Share of total positive raw score covered by `explanation`.
    pub coverage: f64,
    /// Set when at least one perturbation failed and its token is unknown.
    pub partial: bool,
}

impl ImportanceResult {
    /// Entries ordered by descending raw score; unknown scores last.
    pub fn ranked_entries(&self) -> Vec<&ImportanceEntry> {
        let mut ranked: Vec<&ImportanceEntry> = self.entries.iter().collect();
        ranked.sort_by(|a, b| match (a.raw_score, b.raw_score) {
            (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(std::cmp::Ordering::Equal),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        ranked
    }

    /// Entries whose tokens made it into the explanation set.
    pub fn explanation_entries(&self) -> impl Iterator<Item = &ImportanceEntry> {
        self.entries.iter().filter(|e| e.in_explanation)
    }
}
