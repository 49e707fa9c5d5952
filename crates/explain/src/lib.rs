//! # Token importance (`explain`)
//!
//! Explains why a frozen masked language model rates a design candidate the
//! way it does. The model is asked to fill a mask appended to
//!
//! ```text
//! <role> In one word how good is <candidate> as a <adjective> solution for <problem>? <mask>
//! ```
//!
//! and its top prediction becomes the *anchor*. Each token of the candidate
//! and problem is then perturbed in turn; how far the anchor's probability
//! drops is that token's raw importance. Role and template tokens are never
//! perturbed.
//!
//! ## Pipeline
//!
//! 1. [`TokenImportanceEngine::tokenize_query`] splits the [`Query`] per segment.
//! 2. The anchor and one perturbation per eligible token are requested from the
//!    [`MaskedModelOracle`], with bounded concurrency and retry for transient
//!    failures. A perturbation that still fails leaves its score unknown and
//!    marks the result partial.
//! 3. [`explanation_set`] picks the smallest top-ranked set covering the stop
//!    threshold of the positive mass, [`normalize_scores`] rescales for display
//!    and sub-word fragments are merged into word-level entries.
//! 4. [`ScoreVisualizer`] turns the entries into display intensities.
//!
//! Complete results can be memoized per query in an [`ImportanceCache`], which
//! also guarantees at most one computation in flight per query.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use explain::{ExplainConfig, OnnxMaskedOracle, OnnxOracleConfig, Query, TokenImportanceEngine};
//! use semantic::Category;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let oracle = OnnxMaskedOracle::load(OnnxOracleConfig::default()).await?;
//! let engine = TokenImportanceEngine::new(Arc::new(oracle), ExplainConfig::default())?;
//!
//! let query = Query::new(
//!     "You are a design expert.",
//!     "recycled steel frame",
//!     Category::Structure,
//!     "design a chair",
//! );
//! let result = engine.explain(&query).await?;
//! for entry in result.ranked_entries() {
//!     println!("{:>20} {:?}", entry.text, entry.score);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod oracle;
pub mod query;
pub mod result;
pub mod scores;
pub mod stopping;
pub mod visualize;

mod assets;
mod cache;
mod cleanup;
mod engine;
mod onnx;

pub use cache::ImportanceCache;
pub use config::{ExplainConfig, Perturbation, ScaleMode, SubwordScheme};
pub use engine::TokenImportanceEngine;
pub use error::{ExplainError, OracleError};
pub use onnx::{OnnxMaskedOracle, OnnxOracleConfig};
pub use oracle::{MaskedModelOracle, TokenDistribution};
pub use query::{Query, Segment, SegmentKind, Token};
pub use result::{AnchorToken, ImportanceEntry, ImportanceResult, TokenScore};
pub use scores::normalize_scores;
pub use stopping::{explanation_set, ExplanationSet};
pub use visualize::{AnnotatedToken, Channel, ScoreVisualizer};
