//! Configuration and error types for projection and clustering.
//!
//! Everything here is plain data: the clustering stage is a pure function of
//! `(vectors, config)`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// t-SNE settings for the 2D projection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProjectionConfig {
    /// Effective neighbourhood size. Clamped to what the point count allows.
    pub perplexity: f64,
    /// Gradient descent steps.
    pub iterations: usize,
    pub learning_rate: f64,
    /// Multiplier on the input affinities during the first
    /// [`exaggeration_iterations`](Self::exaggeration_iterations) steps.
    pub early_exaggeration: f64,
    pub exaggeration_iterations: usize,
    /// Seed for the initial layout. Same seed, same vectors, same layout.
    pub seed: u64,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            perplexity: 30.0,
            iterations: 500,
            learning_rate: 200.0,
            early_exaggeration: 12.0,
            exaggeration_iterations: 100,
            seed: 0x5EED_F00D,
        }
    }
}

/// Grouping strategy. Both run on the full-dimensional vectors, never on the projection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClusterAlgorithm {
    /// Density clustering. Points that fit no dense region get the noise label.
    Hdbscan {
        min_cluster_size: usize,
        min_samples: usize,
    },
    /// Centroid clustering with seeded k-means++ initialisation. No noise.
    KMeans {
        k: usize,
        max_iterations: usize,
        seed: u64,
    },
}

impl Default for ClusterAlgorithm {
    fn default() -> Self {
        ClusterAlgorithm::Hdbscan {
            min_cluster_size: 2,
            min_samples: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClusterConfig {
    /// Configuration schema version.
    pub version: u32,
    pub projection: ProjectionConfig,
    pub algorithm: ClusterAlgorithm,
    /// Compute pairwise distances with rayon.
    pub use_parallel: bool,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            version: 1,
            projection: ProjectionConfig::default(),
            algorithm: ClusterAlgorithm::default(),
            use_parallel: false,
        }
    }
}

impl ClusterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_algorithm(mut self, algorithm: ClusterAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_projection(mut self, projection: ProjectionConfig) -> Self {
        self.projection = projection;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.projection.seed = seed;
        self
    }

    pub fn with_parallel(mut self, use_parallel: bool) -> Self {
        self.use_parallel = use_parallel;
        self
    }

    pub fn validate(&self) -> Result<(), ClusterError> {
        if self.version < 1 {
            return Err(ClusterError::InvalidConfigVersion {
                version: self.version,
            });
        }
        let p = &self.projection;
        if !(p.perplexity.is_finite() && p.perplexity > 0.0) {
            return Err(ClusterError::InvalidConfig(format!(
                "perplexity must be > 0 (got {})",
                p.perplexity
            )));
        }
        if !(p.learning_rate.is_finite() && p.learning_rate > 0.0) {
            return Err(ClusterError::InvalidConfig(format!(
                "learning_rate must be > 0 (got {})",
                p.learning_rate
            )));
        }
        if !(p.early_exaggeration.is_finite() && p.early_exaggeration >= 1.0) {
            return Err(ClusterError::InvalidConfig(format!(
                "early_exaggeration must be >= 1 (got {})",
                p.early_exaggeration
            )));
        }
        match self.algorithm {
            ClusterAlgorithm::Hdbscan {
                min_cluster_size,
                min_samples,
            } => {
                if min_cluster_size < 2 {
                    return Err(ClusterError::InvalidConfig(format!(
                        "min_cluster_size must be >= 2 (got {min_cluster_size})"
                    )));
                }
                if min_samples < 1 {
                    return Err(ClusterError::InvalidConfig(
                        "min_samples must be >= 1 (got 0)".into(),
                    ));
                }
            }
            ClusterAlgorithm::KMeans {
                k, max_iterations, ..
            } => {
                if k < 1 {
                    return Err(ClusterError::InvalidConfig("k must be >= 1 (got 0)".into()));
                }
                if max_iterations < 1 {
                    return Err(ClusterError::InvalidConfig(
                        "max_iterations must be >= 1 (got 0)".into(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Errors returned by the clustering stage.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClusterError {
    #[error("invalid cluster config: {0}")]
    InvalidConfig(String),

    #[error("invalid config version {version}; expected >= 1")]
    InvalidConfigVersion { version: u32 },

    #[error("vector {index} has dimension {got}, expected {expected}")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        got: usize,
    },

    #[error("vector {index} contains non-finite values")]
    NonFinite { index: usize },
}
