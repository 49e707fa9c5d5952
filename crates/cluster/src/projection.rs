//! Exact t-SNE down to two dimensions.
//!
//! Point counts here are small (tens to a few hundred candidates per category),
//! so the O(n^2) exact gradient is used instead of a tree approximation.

use crate::config::ProjectionConfig;

const MOMENTUM_SWITCH_ITERATION: usize = 250;
const BINARY_SEARCH_STEPS: usize = 64;
const ENTROPY_TOLERANCE: f64 = 1e-5;
const MIN_PROBABILITY: f64 = 1e-12;

/// Projects points given their squared pairwise distances.
///
/// Deterministic for a fixed `cfg.seed`. With fewer than three points a trivial
/// layout on the x-axis is returned.
pub(crate) fn project_tsne(dist2: &[Vec<f64>], cfg: &ProjectionConfig) -> Vec<[f32; 2]> {
    let n = dist2.len();
    match n {
        0 => return Vec::new(),
        1 => return vec![[0.0, 0.0]],
        2 => {
            let half = (dist2[0][1].sqrt() / 2.0) as f32;
            return vec![[-half, 0.0], [half, 0.0]];
        }
        _ => {}
    }

    let perplexity = cfg.perplexity.min((n - 1) as f64 / 3.0).max(1.0);
    let p = joint_probabilities(dist2, perplexity);

    let mut rng = fastrand::Rng::with_seed(cfg.seed);
    let mut y: Vec<[f64; 2]> = (0..n)
        .map(|_| [(rng.f64() - 0.5) * 1e-2, (rng.f64() - 0.5) * 1e-2])
        .collect();
    let mut update = vec![[0.0f64; 2]; n];
    let mut gains = vec![[1.0f64; 2]; n];
    let mut num = vec![vec![0.0f64; n]; n];

    for iter in 0..cfg.iterations {
        let exaggeration = if iter < cfg.exaggeration_iterations {
            cfg.early_exaggeration
        } else {
            1.0
        };
        let momentum = if iter < MOMENTUM_SWITCH_ITERATION {
            0.5
        } else {
            0.8
        };

        // Student-t kernel in the embedding.
        let mut sum_num = 0.0;
        for i in 0..n {
            for j in (i + 1)..n {
                let dx = y[i][0] - y[j][0];
                let dy = y[i][1] - y[j][1];
                let q = 1.0 / (1.0 + dx * dx + dy * dy);
                num[i][j] = q;
                num[j][i] = q;
                sum_num += 2.0 * q;
            }
        }
        let sum_num = sum_num.max(f64::MIN_POSITIVE);

        for i in 0..n {
            let mut grad = [0.0f64; 2];
            for j in 0..n {
                if i == j {
                    continue;
                }
                let q = (num[i][j] / sum_num).max(MIN_PROBABILITY);
                let mult = (exaggeration * p[i][j] - q) * num[i][j];
                grad[0] += 4.0 * mult * (y[i][0] - y[j][0]);
                grad[1] += 4.0 * mult * (y[i][1] - y[j][1]);
            }

            for d in 0..2 {
                let same_sign = (grad[d] > 0.0) == (update[i][d] > 0.0);
                gains[i][d] = if same_sign {
                    gains[i][d] * 0.8
                } else {
                    gains[i][d] + 0.2
                }
                .max(0.01);
                update[i][d] = momentum * update[i][d] - cfg.learning_rate * gains[i][d] * grad[d];
            }
        }

        for (point, step) in y.iter_mut().zip(&update) {
            point[0] += step[0];
            point[1] += step[1];
        }

        let mean_x = y.iter().map(|p| p[0]).sum::<f64>() / n as f64;
        let mean_y = y.iter().map(|p| p[1]).sum::<f64>() / n as f64;
        for point in y.iter_mut() {
            point[0] -= mean_x;
            point[1] -= mean_y;
        }
    }

    y.into_iter().map(|p| [p[0] as f32, p[1] as f32]).collect()
}

/// Symmetrised input affinities `P = (P_j|i + P_i|j) / 2n`.
fn joint_probabilities(dist2: &[Vec<f64>], perplexity: f64) -> Vec<Vec<f64>> {
    let n = dist2.len();
    let target_entropy = perplexity.ln();
    let conditional: Vec<Vec<f64>> = (0..n)
        .map(|i| conditional_row(&dist2[i], i, target_entropy))
        .collect();

    let denom = 2.0 * n as f64;
    let mut p = vec![vec![0.0f64; n]; n];
    for i in 0..n {
        for j in 0..n {
            if i != j {
                p[i][j] = ((conditional[i][j] + conditional[j][i]) / denom).max(MIN_PROBABILITY);
            }
        }
    }
    p
}

/// Gaussian conditional probabilities for point `i`, with the precision found by
/// binary search so the row entropy matches `ln(perplexity)`.
fn conditional_row(dist_row: &[f64], i: usize, target_entropy: f64) -> Vec<f64> {
    let n = dist_row.len();
    let mut row = vec![0.0f64; n];
    let mut beta = 1.0f64;
    let mut beta_min = 0.0f64;
    let mut beta_max = f64::INFINITY;

    for _ in 0..BINARY_SEARCH_STEPS {
        let mut sum = 0.0;
        let mut weighted = 0.0;
        for j in 0..n {
            row[j] = if j == i {
                0.0
            } else {
                (-dist_row[j] * beta).exp()
            };
            sum += row[j];
            weighted += dist_row[j] * row[j];
        }

        let entropy = if sum > 0.0 {
            for value in row.iter_mut() {
                *value /= sum;
            }
            sum.ln() + beta * weighted / sum
        } else {
            0.0
        };

        let diff = entropy - target_entropy;
        if diff.abs() < ENTROPY_TOLERANCE {
            break;
        }
        if diff > 0.0 {
            beta_min = beta;
            beta = if beta_max.is_infinite() {
                beta * 2.0
            } else {
                (beta + beta_max) / 2.0
            };
        } else {
            beta_max = beta;
            beta = (beta + beta_min) / 2.0;
        }
    }

    let total: f64 = row.iter().sum();
    if !(total > 0.0 && total.is_finite()) {
        let uniform = 1.0 / (n - 1) as f64;
        for (j, value) in row.iter_mut().enumerate() {
            *value = if j == i { 0.0 } else { uniform };
        }
    }
    row
}
