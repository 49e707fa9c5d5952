//! Design-space embeddings
//!
//! This crate turns candidate texts (generated Functions, Behaviors and
//! Structures) and reference texts (the design problem, requirements) into
//! unit-length vectors that the clustering and ranking stages can compare.
//!
//! Providers:
//!
//! - **API mode** - Call a remote embedding service (Hugging Face, OpenAI or a
//!   custom endpoint speaking `{"texts": [...]}`).
//! - **Stub mode** - Deterministic feature-hashing vectors. Offline, used in
//!   tests and demos.
//!
//! Anything else can plug in through [`EmbeddingProvider`].
//!
//! Provider output is raw. Run it through [`normalize_batch`] before comparing
//! vectors; zero-norm vectors come back flagged as [`DegenerateVector`] instead
//! of failing the batch.
//!
//! ## Quick example
//!
//! ```
//! use semantic::{embed_texts, normalize_batch, SemanticConfig, StubEmbeddingProvider};
//!
//! # async fn run() -> Result<(), semantic::SemanticError> {
//! let cfg = SemanticConfig::default();
//! let provider = StubEmbeddingProvider::new(cfg.stub_dim);
//! let texts = vec!["reduces emissions".to_string(), "steel frame".to_string()];
//!
//! let embeddings = embed_texts(&provider, &texts, &cfg).await?;
//! let batch = normalize_batch(embeddings.into_iter().map(|e| e.vector).collect())?;
//! assert_eq!(batch.len(), 2);
//! # Ok(())
//! # }
//! ```
//!
//! ## Env vars to know
//!
//! - `DESIGNSPACE_EMBEDDING_API_URL` - Override the API endpoint (switches to api mode)
//! - `DESIGNSPACE_EMBEDDING_API_TOKEN` - Bearer token for that endpoint

pub mod config;
pub mod error;
pub mod normalize;
pub mod retry;
pub mod types;
mod serde_millis;

mod api;
mod cache;
mod provider;
mod stub;

pub use api::{ApiEmbeddingProvider, ApiProviderKind};
pub use cache::{cache_key, embed_texts_cached, EmbeddingCache};
pub use config::SemanticConfig;
pub use error::SemanticError;
pub use normalize::{l2_norm, l2_normalize_in_place, normalize_batch, DegenerateVector, NormalizedBatch};
pub use provider::{embed_texts, EmbeddingProvider};
pub use stub::StubEmbeddingProvider;
pub use types::{clean_candidates, Candidate, Category, Embedding};

/// Builds the provider selected by `cfg.mode`.
pub fn provider_from_config(
    cfg: &SemanticConfig,
) -> Result<Box<dyn EmbeddingProvider>, SemanticError> {
    cfg.validate()?;
    match cfg.mode.as_str() {
        "api" => Ok(Box::new(ApiEmbeddingProvider::new(cfg)?)),
        _ => Ok(Box::new(StubEmbeddingProvider::new(cfg.stub_dim))),
    }
}
