use hdbscan::{Hdbscan, HdbscanHyperParams};
use tracing::warn;

use crate::distance::squared_euclidean;
use crate::NOISE;

/// HDBSCAN labels over the full-dimensional vectors. `NOISE` marks unclustered points.
///
/// Too few points for a single cluster, or a failing run, yield all-noise.
pub(crate) fn hdbscan_labels(
    vectors: &[Vec<f32>],
    min_cluster_size: usize,
    min_samples: usize,
) -> Vec<i32> {
    let n = vectors.len();
    if n < min_cluster_size.max(min_samples) {
        return vec![NOISE; n];
    }

    let hyper_params = HdbscanHyperParams::builder()
        .min_cluster_size(min_cluster_size)
        .min_samples(min_samples)
        .build();

    let data = vectors.to_vec();
    match Hdbscan::new(&data, hyper_params).cluster() {
        Ok(labels) => labels
            .into_iter()
            .map(|label| if label < 0 { NOISE } else { label })
            .collect(),
        Err(err) => {
            warn!(error = ?err, points = n, "hdbscan_failed");
            vec![NOISE; n]
        }
    }
}

/// Lloyd's k-means with seeded k-means++ seeding. Labels are compacted to
/// `0..clusters` in order of first appearance.
pub(crate) fn kmeans_labels(
    vectors: &[Vec<f32>],
    k: usize,
    max_iterations: usize,
    seed: u64,
) -> Vec<i32> {
    let n = vectors.len();
    if n == 0 {
        return Vec::new();
    }
    let k = k.clamp(1, n);
    let mut centroids = seed_centroids(vectors, k, seed);
    let mut assignment = vec![0usize; n];

    for iteration in 0..max_iterations {
        let mut changed = iteration == 0;
        for (idx, v) in vectors.iter().enumerate() {
            let nearest = nearest_centroid(v, &centroids);
            if nearest != assignment[idx] {
                assignment[idx] = nearest;
                changed = true;
            }
        }
        if !changed {
            break;
        }

        let dim = vectors[0].len();
        let mut sums = vec![vec![0.0f64; dim]; k];
        let mut counts = vec![0usize; k];
        for (v, &c) in vectors.iter().zip(&assignment) {
            counts[c] += 1;
            for (s, &x) in sums[c].iter_mut().zip(v) {
                *s += f64::from(x);
            }
        }
        for (c, centroid) in centroids.iter_mut().enumerate() {
            // Empty clusters keep their previous centroid.
            if counts[c] > 0 {
                *centroid = sums[c]
                    .iter()
                    .map(|s| (s / counts[c] as f64) as f32)
                    .collect();
            }
        }
    }

    compact_labels(&assignment)
}

fn seed_centroids(vectors: &[Vec<f32>], k: usize, seed: u64) -> Vec<Vec<f32>> {
    let n = vectors.len();
    let mut rng = fastrand::Rng::with_seed(seed);
    let mut chosen = vec![rng.usize(0..n)];
    let mut closest: Vec<f64> = vectors
        .iter()
        .map(|v| squared_euclidean(v, &vectors[chosen[0]]))
        .collect();

    while chosen.len() < k {
        let total: f64 = closest.iter().sum();
        let next = if total > 0.0 {
            let mut target = rng.f64() * total;
            let mut pick = n - 1;
            for (idx, &d) in closest.iter().enumerate() {
                if d <= 0.0 {
                    continue;
                }
                if target < d {
                    pick = idx;
                    break;
                }
                target -= d;
            }
            pick
        } else {
            // All remaining points coincide with a centroid.
            (0..n).find(|i| !chosen.contains(i)).unwrap_or(0)
        };
        chosen.push(next);
        for (idx, v) in vectors.iter().enumerate() {
            closest[idx] = closest[idx].min(squared_euclidean(v, &vectors[next]));
        }
    }

    chosen.into_iter().map(|i| vectors[i].clone()).collect()
}

fn nearest_centroid(v: &[f32], centroids: &[Vec<f32>]) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (c, centroid) in centroids.iter().enumerate() {
        let d = squared_euclidean(v, centroid);
        if d < best_dist {
            best = c;
            best_dist = d;
        }
    }
    best
}

fn compact_labels(assignment: &[usize]) -> Vec<i32> {
    let mut mapping: Vec<Option<i32>> = Vec::new();
    let mut next = 0i32;
    assignment
        .iter()
        .map(|&c| {
            if mapping.len() <= c {
                mapping.resize(c + 1, None);
            }
            *mapping[c].get_or_insert_with(|| {
                let label = next;
                next += 1;
                label
            })
        })
        .collect()
}
