use crate::config::ScaleMode;

/// Rescales raw scores for display. Unknown scores stay unknown.
///
/// Both modes are monotone, so relative ordering is unchanged, and the score
/// with the largest magnitude lands on an end of the range. All-zero input
/// stays zero.
pub fn normalize_scores(raw: &[Option<f64>], mode: ScaleMode) -> Vec<Option<f64>> {
    let known = || raw.iter().flatten().copied();
    match mode {
        ScaleMode::MaxAbs => {
            let max_abs = known().map(f64::abs).fold(0.0, f64::max);
            raw.iter()
                .map(|s| {
                    s.map(|s| {
                        if max_abs > 0.0 {
                            (s / max_abs).clamp(-1.0, 1.0)
                        } else {
                            0.0
                        }
                    })
                })
                .collect()
        }
        ScaleMode::MinMax => {
            let min = known().fold(f64::INFINITY, f64::min);
            let max = known().fold(f64::NEG_INFINITY, f64::max);
            let span = max - min;
            raw.iter()
                .map(|s| {
                    s.map(|s| {
                        if span > 0.0 {
                            ((s - min) / span).clamp(0.0, 1.0)
                        } else if s > 0.0 {
                            // Constant positive scores are all maximal.
                            1.0
                        } else {
                            0.0
                        }
                    })
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_abs_maps_largest_magnitude_to_extreme() {
        let out = normalize_scores(&[Some(0.6), Some(-0.3), Some(0.15)], ScaleMode::MaxAbs);
        assert_eq!(out, vec![Some(1.0), Some(-0.5), Some(0.25)]);
    }

    #[test]
    fn max_abs_negative_extreme() {
        let out = normalize_scores(&[Some(0.1), Some(-0.4)], ScaleMode::MaxAbs);
        assert_eq!(out[1], Some(-1.0));
        assert!(out.iter().flatten().all(|s| (-1.0..=1.0).contains(s)));
    }

    #[test]
    fn min_max_range() {
        let out = normalize_scores(&[Some(0.6), Some(-0.2), Some(0.2)], ScaleMode::MinMax);
        assert_eq!(out[0], Some(1.0));
        assert_eq!(out[1], Some(0.0));
        assert!((out[2].unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn all_zero_stays_zero() {
        for mode in [ScaleMode::MaxAbs, ScaleMode::MinMax] {
            let out = normalize_scores(&[Some(0.0), Some(0.0)], mode);
            assert_eq!(out, vec![Some(0.0), Some(0.0)]);
        }
    }

    #[test]
    fn unknown_stays_unknown() {
        let out = normalize_scores(&[None, Some(0.5)], ScaleMode::MaxAbs);
        assert_eq!(out, vec![None, Some(1.0)]);
        assert_eq!(normalize_scores(&[None], ScaleMode::MinMax), vec![None]);
    }

    #[test]
    fn ordering_is_preserved() {
        let raw = [Some(0.05), Some(0.4), Some(-0.1), Some(0.2)];
        for mode in [ScaleMode::MaxAbs, ScaleMode::MinMax] {
            let out = normalize_scores(&raw, mode);
            for i in 0..raw.len() {
                for j in 0..raw.len() {
                    if raw[i] < raw[j] {
                        assert!(out[i] < out[j]);
                    }
                }
            }
        }
    }
}
