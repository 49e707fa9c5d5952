use rayon::prelude::*;

#[inline]
pub(crate) fn squared_euclidean(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = f64::from(x) - f64::from(y);
            d * d
        })
        .sum()
}

/// Full symmetric matrix of squared Euclidean distances (parallel rows if `parallel`).
pub(crate) fn squared_distance_matrix(vectors: &[Vec<f32>], parallel: bool) -> Vec<Vec<f64>> {
    let row = |i: usize| -> Vec<f64> {
        vectors
            .iter()
            .map(|other| squared_euclidean(&vectors[i], other))
            .collect()
    };

    if parallel {
        (0..vectors.len()).into_par_iter().map(row).collect()
    } else {
        (0..vectors.len()).map(row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn squared_distance_basic() {
        assert_eq!(squared_euclidean(&[0.0, 0.0], &[3.0, 4.0]), 25.0);
        assert_eq!(squared_euclidean(&[1.0], &[1.0]), 0.0);
    }

    #[test]
    fn matrix_is_symmetric_with_zero_diagonal() {
        let vectors = vec![vec![0.0f32, 1.0], vec![1.0, 0.0], vec![0.6, 0.8]];
        let m = squared_distance_matrix(&vectors, false);
        for i in 0..3 {
            assert_eq!(m[i][i], 0.0);
            for j in 0..3 {
                assert_eq!(m[i][j], m[j][i]);
            }
        }
    }

    #[test]
    fn parallel_matches_serial() {
        let vectors: Vec<Vec<f32>> = (0..20)
            .map(|i| vec![(i as f32).sin(), (i as f32).cos(), i as f32 * 0.1])
            .collect();
        assert_eq!(
            squared_distance_matrix(&vectors, true),
            squared_distance_matrix(&vectors, false)
        );
    }
}
