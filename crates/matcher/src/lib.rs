//! # Design-space matcher (`matcher`)
//!
//! ## Purpose
//!
//! `matcher` orders design candidates by how close their embeddings are to a
//! reference text: the design problem, a single requirement, or each entry of a
//! requirement list. All scores are cosine similarities in [-1, 1] and are only
//! meaningful inside one (reference, candidate) pair.
//!
//! ## Core Types
//!
//! - [`RankConfig`]: optional `max_results` / `min_score` trimming. The default
//!   returns one entry per candidate.
//! - [`RankedCandidate`]: input index, label and score.
//! - [`ReferenceMatch`]: the closest reference for one candidate.
//! - [`SimilarityRanker`]: front-end holding a validated [`RankConfig`].
//!
//! ## Example Usage
//!
//! ```
//! use matcher::{RankConfig, SimilarityRanker};
//!
//! let ranker = SimilarityRanker::new(RankConfig::default()).unwrap();
//! let problem = [1.0f32, 0.0];
//! let candidates = vec![vec![0.0f32, 1.0], vec![0.8, 0.6]];
//!
//! let ranked = ranker
//!     .rank(&problem, &candidates, &["open plan", "reduces emissions"])
//!     .unwrap();
//! assert_eq!(ranked[0].label, "reduces emissions");
//! ```
//!
//! Ranking never mutates its inputs and sorts stably, so candidates with equal
//! scores keep the order they were supplied in.

mod engine;
mod types;

pub use engine::{
    best_reference_per_candidate, cosine_similarity, rank_by_similarity, SimilarityRanker,
};
pub use types::{MatchError, RankConfig, RankedCandidate, ReferenceMatch};
