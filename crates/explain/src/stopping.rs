use serde::{Deserialize, Serialize};

/// Smallest prefix of the score ranking that covers most positive attribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplanationSet {
    /// Indices into the scored slice, highest raw score first.
    pub ranked: Vec<usize>,
    /// Cumulative raw score of `ranked` divided by total positive raw score.
    pub coverage: f64,
}

impl ExplanationSet {
    pub fn contains(&self, index: usize) -> bool {
        self.ranked.contains(&index)
    }
}

/// Ranks `raw` by descending score (stable on input order) and accumulates
/// until the covered share of total positive score strictly exceeds
/// `threshold`, the ranking runs out, or the next score is not positive.
///
/// A share landing exactly on `threshold` keeps growing: `[5, 3, 1, 1]` at 0.8
/// covers 8/10 after two tokens and stops only after the third (9/10).
///
/// Unknown scores (`None`) are never ranked.
pub fn explanation_set(raw: &[Option<f64>], threshold: f64) -> ExplanationSet {
    let mut order: Vec<(usize, f64)> = raw
        .iter()
        .enumerate()
        .filter_map(|(idx, s)| s.map(|s| (idx, s)))
        .collect();
    order.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let total: f64 = order.iter().map(|&(_, s)| s).filter(|&s| s > 0.0).sum();
    if total <= 0.0 {
        return ExplanationSet {
            ranked: Vec::new(),
            coverage: 0.0,
        };
    }

    let mut ranked = Vec::new();
    let mut cumulative = 0.0;
    for (idx, score) in order {
        if score <= 0.0 {
            break;
        }
        ranked.push(idx);
        cumulative += score;
        if cumulative / total > threshold {
            break;
        }
    }

    ExplanationSet {
        ranked,
        coverage: cumulative / total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known(scores: &[f64]) -> Vec<Option<f64>> {
        scores.iter().copied().map(Some).collect()
    }

    #[test]
    fn stops_after_crossing_threshold() {
        let set = explanation_set(&known(&[5.0, 3.0, 1.0, 1.0]), 0.8);
        assert_eq!(set.ranked, vec![0, 1, 2]);
        assert!((set.coverage - 0.9).abs() < 1e-12);
    }

    #[test]
    fn share_equal_to_threshold_keeps_growing() {
        let set = explanation_set(&known(&[4.0, 4.0, 2.0]), 0.8);
        assert_eq!(set.ranked, vec![0, 1, 2]);
        assert_eq!(set.coverage, 1.0);

        let set = explanation_set(&known(&[4.0, 4.0, 2.0]), 0.79);
        assert_eq!(set.ranked, vec![0, 1]);
        assert_eq!(set.coverage, 0.8);
    }

    #[test]
    fn ranks_regardless_of_input_order() {
        let set = explanation_set(&known(&[1.0, 5.0, 1.0, 3.0]), 0.8);
        assert_eq!(set.ranked, vec![1, 3, 0]);
        assert!(set.contains(0));
        assert!(!set.contains(2));
    }

    #[test]
    fn full_threshold_takes_every_positive_score() {
        let set = explanation_set(&known(&[0.4, -0.2, 0.1, 0.0]), 1.0);
        assert_eq!(set.ranked, vec![0, 2]);
        assert!((set.coverage - 1.0).abs() < 1e-12);
    }

    #[test]
    fn no_positive_scores_means_empty_set() {
        let set = explanation_set(&known(&[-0.1, 0.0]), 0.8);
        assert!(set.ranked.is_empty());
        assert_eq!(set.coverage, 0.0);
        assert!(explanation_set(&[], 0.8).ranked.is_empty());
    }

    #[test]
    fn unknown_scores_are_skipped() {
        let set = explanation_set(&[None, Some(0.3), None, Some(0.1)], 0.5);
        assert_eq!(set.ranked, vec![1]);
    }

    #[test]
    fn ties_keep_input_order() {
        let set = explanation_set(&known(&[1.0, 1.0, 1.0]), 1.0);
        assert_eq!(set.ranked, vec![0, 1, 2]);
    }
}
