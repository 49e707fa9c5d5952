//! Cluster quality indices computed on the full-dimensional vectors.
//!
//! Noise points are excluded from both indices. Neither index is defined for
//! fewer than two points, fewer than two clusters, or one cluster per point;
//! those cases are reported as [`QualityIndex::NotApplicable`] instead of
//! dividing by zero.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::distance::squared_euclidean;

/// Why a quality index could not be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotApplicable {
    /// Fewer than two clustered points.
    InsufficientData { points: usize },
    /// Fewer than two clusters.
    TooFewClusters { clusters: usize },
    /// Every clustered point sits in its own cluster.
    SingletonClusters { clusters: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityIndex {
    Defined(f64),
    NotApplicable(NotApplicable),
}

impl QualityIndex {
    pub fn value(&self) -> Option<f64> {
        match self {
            QualityIndex::Defined(v) => Some(*v),
            QualityIndex::NotApplicable(_) => None,
        }
    }

    pub fn is_applicable(&self) -> bool {
        matches!(self, QualityIndex::Defined(_))
    }
}

/// Clustered (non-noise) members grouped by label.
fn groups(labels: &[i32]) -> BTreeMap<i32, Vec<usize>> {
    let mut groups: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
    for (idx, &label) in labels.iter().enumerate() {
        if label >= 0 {
            groups.entry(label).or_default().push(idx);
        }
    }
    groups
}

fn applicability(groups: &BTreeMap<i32, Vec<usize>>) -> Result<(usize, usize), NotApplicable> {
    let points: usize = groups.values().map(Vec::len).sum();
    let clusters = groups.len();
    if points < 2 {
        return Err(NotApplicable::InsufficientData { points });
    }
    if clusters < 2 {
        return Err(NotApplicable::TooFewClusters { clusters });
    }
    if clusters >= points {
        return Err(NotApplicable::SingletonClusters { clusters });
    }
    Ok((points, clusters))
}

/// Mean silhouette coefficient in [-1, 1] over clustered points.
///
/// `dist2` holds squared Euclidean distances for all input points.
pub fn silhouette(dist2: &[Vec<f64>], labels: &[i32]) -> QualityIndex {
    let groups = groups(labels);
    let points = match applicability(&groups) {
        Ok((points, _)) => points,
        Err(reason) => return QualityIndex::NotApplicable(reason),
    };

    let mean_distance = |i: usize, members: &[usize]| -> f64 {
        let total: f64 = members
            .iter()
            .filter(|&&j| j != i)
            .map(|&j| dist2[i][j].sqrt())
            .sum();
        let count = members.iter().filter(|&&j| j != i).count();
        if count == 0 {
            0.0
        } else {
            total / count as f64
        }
    };

    let mut sum = 0.0;
    for (label, members) in &groups {
        for &i in members {
            // Singleton clusters contribute 0.
            if members.len() == 1 {
                continue;
            }
            let a = mean_distance(i, members);
            let b = groups
                .iter()
                .filter(|(other, _)| *other != label)
                .map(|(_, others)| mean_distance(i, others))
                .fold(f64::INFINITY, f64::min);
            let denom = a.max(b);
            if denom > 0.0 {
                sum += (b - a) / denom;
            }
        }
    }

    QualityIndex::Defined((sum / points as f64).clamp(-1.0, 1.0))
}

/// Calinski-Harabasz variance ratio (>= 0) over clustered points.
///
/// Zero within-cluster dispersion yields 1.0.
pub fn calinski_harabasz(vectors: &[Vec<f32>], labels: &[i32]) -> QualityIndex {
    let groups = groups(labels);
    let (points, clusters) = match applicability(&groups) {
        Ok(counts) => counts,
        Err(reason) => return QualityIndex::NotApplicable(reason),
    };

    let dim = vectors.first().map_or(0, Vec::len);
    let centroid_of = |members: &[usize]| -> Vec<f32> {
        let mut c = vec![0.0f64; dim];
        for &i in members {
            for (acc, &x) in c.iter_mut().zip(&vectors[i]) {
                *acc += f64::from(x);
            }
        }
        c.into_iter()
            .map(|s| (s / members.len() as f64) as f32)
            .collect()
    };

    let all: Vec<usize> = groups.values().flatten().copied().collect();
    let overall = centroid_of(&all);

    let mut between = 0.0;
    let mut within = 0.0;
    for members in groups.values() {
        let centroid = centroid_of(members);
        between += members.len() as f64 * squared_euclidean(&centroid, &overall);
        within += members
            .iter()
            .map(|&i| squared_euclidean(&vectors[i], &centroid))
            .sum::<f64>();
    }

    if within == 0.0 {
        return QualityIndex::Defined(1.0);
    }
    let score = between * (points - clusters) as f64 / (within * (clusters - 1) as f64);
    QualityIndex::Defined(score.max(0.0))
}
