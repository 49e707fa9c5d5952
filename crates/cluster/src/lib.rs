//! # Design-space clustering
//!
//! Projects candidate embeddings to two dimensions for display and groups them
//! into clusters, reporting how well separated the groups are.
//!
//! ## Contract
//!
//! - Input vectors are expected to be L2-normalized upstream and must share one
//!   dimensionality with only finite components.
//! - Clustering runs on the full-dimensional vectors. The 2D projection is only a view
//!   and never feeds back into grouping or quality scores.
//! - The API is a pure function of `(vectors, config)`: no I/O, no clocks in the
//!   output, no global state. Same input and same seed give the same report.
//!
//! ## Pipeline
//!
//! 1.  **Distances**: full squared Euclidean matrix, optionally row-parallel via
//!     rayon.
//! 2.  **Projection**: exact t-SNE seeded from [`ProjectionConfig::seed`].
//! 3.  **Grouping**: HDBSCAN (with a noise label) or seeded k-means.
//! 4.  **Quality**: silhouette and Calinski-Harabasz over non-noise points.
//!
//! ```
//! use cluster::{project_and_cluster, ClusterAlgorithm, ClusterConfig};
//!
//! let vectors = vec![
//!     vec![1.0, 0.0],
//!     vec![0.99, 0.14],
//!     vec![0.0, 1.0],
//!     vec![0.14, 0.99],
//! ];
//! let cfg = ClusterConfig::default().with_algorithm(ClusterAlgorithm::KMeans {
//!     k: 2,
//!     max_iterations: 50,
//!     seed: 1,
//! });
//!
//! let report = project_and_cluster(&vectors, &cfg).unwrap();
//! assert_eq!(report.assignments.len(), 4);
//! assert_eq!(report.cluster_count, 2);
//! ```
mod clustering;
pub mod config;
mod distance;
mod projection;
pub mod quality;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::info;

pub use crate::config::{ClusterAlgorithm, ClusterConfig, ClusterError, ProjectionConfig};
pub use crate::quality::{NotApplicable, QualityIndex};

use crate::clustering::{hdbscan_labels, kmeans_labels};
use crate::distance::squared_distance_matrix;
use crate::projection::project_tsne;
use crate::quality::{calinski_harabasz, silhouette};

/// Label for points that belong to no cluster.
pub const NOISE: i32 = -1;

/// Placement of one input vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterAssignment {
    /// Position in the caller's input.
    pub index: usize,
    /// 2D display coordinates. `None` for points that were never projected.
    pub point: Option<[f32; 2]>,
    /// Cluster label, or [`NOISE`].
    pub label: i32,
}

impl ClusterAssignment {
    pub fn is_noise(&self) -> bool {
        self.label == NOISE
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterReport {
    /// One entry per input vector, in input order.
    pub assignments: Vec<ClusterAssignment>,
    /// Distinct non-noise labels.
    pub cluster_count: usize,
    pub noise_count: usize,
    pub silhouette: QualityIndex,
    pub calinski_harabasz: QualityIndex,
}

impl ClusterReport {
    /// Report for zero points.
    pub fn empty() -> Self {
        let na = QualityIndex::NotApplicable(NotApplicable::InsufficientData { points: 0 });
        Self {
            assignments: Vec::new(),
            cluster_count: 0,
            noise_count: 0,
            silhouette: na,
            calinski_harabasz: na,
        }
    }

    /// Input indices grouped by label, noise included under [`NOISE`].
    pub fn clusters(&self) -> BTreeMap<i32, Vec<usize>> {
        let mut out: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
        for a in &self.assignments {
            out.entry(a.label).or_default().push(a.index);
        }
        out
    }
}

/// Project `vectors` to 2D and cluster them.
///
/// Empty input yields [`ClusterReport::empty`]. Mismatched dimensions or
/// non-finite components are rejected before any work is done.
pub fn project_and_cluster(
    vectors: &[Vec<f32>],
    cfg: &ClusterConfig,
) -> Result<ClusterReport, ClusterError> {
    cfg.validate()?;
    if vectors.is_empty() {
        return Ok(ClusterReport::empty());
    }
    check_vectors(vectors)?;

    let start = Instant::now();

    let dist2 = squared_distance_matrix(vectors, cfg.use_parallel);
    let points = project_tsne(&dist2, &cfg.projection);

    let labels = match cfg.algorithm {
        ClusterAlgorithm::Hdbscan {
            min_cluster_size,
            min_samples,
        } => hdbscan_labels(vectors, min_cluster_size, min_samples),
        ClusterAlgorithm::KMeans {
            k,
            max_iterations,
            seed,
        } => kmeans_labels(vectors, k, max_iterations, seed),
    };

    let silhouette = silhouette(&dist2, &labels);
    let calinski_harabasz = calinski_harabasz(vectors, &labels);

    let noise_count = labels.iter().filter(|&&l| l == NOISE).count();
    let mut distinct: Vec<i32> = labels.iter().copied().filter(|&l| l != NOISE).collect();
    distinct.sort_unstable();
    distinct.dedup();

    let assignments = points
        .into_iter()
        .zip(labels)
        .enumerate()
        .map(|(index, (point, label))| ClusterAssignment {
            index,
            point: Some(point),
            label,
        })
        .collect();

    info!(
        points = vectors.len(),
        clusters = distinct.len(),
        noise = noise_count,
        elapsed_micros = start.elapsed().as_micros() as u64,
        "cluster_complete"
    );

    Ok(ClusterReport {
        assignments,
        cluster_count: distinct.len(),
        noise_count,
        silhouette,
        calinski_harabasz,
    })
}

fn check_vectors(vectors: &[Vec<f32>]) -> Result<(), ClusterError> {
    let expected = vectors[0].len();
    for (index, v) in vectors.iter().enumerate() {
        if v.len() != expected {
            return Err(ClusterError::DimensionMismatch {
                index,
                expected,
                got: v.len(),
            });
        }
        if v.iter().any(|x| !x.is_finite()) {
            return Err(ClusterError::NonFinite { index });
        }
    }
    Ok(())
}
