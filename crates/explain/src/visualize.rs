//! Display annotation for importance scores. No rendering happens here.

use serde::{Deserialize, Serialize};

use crate::ImportanceResult;

/// Which side of the anchor prediction a token pushes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Perturbing the token lowered the anchor probability.
    Supportive,
    /// Perturbing the token raised the anchor probability.
    Suppressive,
    Neutral,
    /// The token's perturbation failed.
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedToken {
    pub text: String,
    pub score: Option<f64>,
    /// `|score|` clamped to [0, 1]. Zero for neutral and unknown tokens.
    pub intensity: f64,
    pub channel: Channel,
    pub in_explanation: bool,
}

impl AnnotatedToken {
    /// Green for supportive, red for suppressive, alpha from intensity.
    pub fn rgba(&self) -> [u8; 4] {
        let alpha = (self.intensity * 255.0).round() as u8;
        match self.channel {
            Channel::Supportive => [0, 160, 0, alpha],
            Channel::Suppressive => [200, 0, 0, alpha],
            Channel::Neutral | Channel::Unknown => [128, 128, 128, 0],
        }
    }
}

/// Maps normalized scores to intensity and raw scores to channel.
///
/// The channel comes from the sign of the raw score, which every scale mode
/// keeps. Under `MinMax` the normalized score is non-negative, so it only
/// drives intensity.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreVisualizer;

impl ScoreVisualizer {
    pub fn new() -> Self {
        Self
    }

    /// Annotates the display units of `result`, in order.
    pub fn annotate(&self, result: &ImportanceResult) -> Vec<AnnotatedToken> {
        result
            .entries
            .iter()
            .map(|e| annotate_one(&e.text, e.raw_score, e.score, e.in_explanation))
            .collect()
    }

    /// Annotates arbitrary `(text, score)` pairs of sign-preserving scores.
    pub fn annotate_pairs<S: AsRef<str>>(&self, pairs: &[(S, Option<f64>)]) -> Vec<AnnotatedToken> {
        pairs
            .iter()
            .map(|(text, score)| annotate_one(text.as_ref(), *score, *score, false))
            .collect()
    }
}

fn annotate_one(
    text: &str,
    raw: Option<f64>,
    score: Option<f64>,
    in_explanation: bool,
) -> AnnotatedToken {
    let channel = match raw {
        Some(r) if r.is_finite() && r > 0.0 => Channel::Supportive,
        Some(r) if r.is_finite() && r < 0.0 => Channel::Suppressive,
        Some(r) if r == 0.0 => Channel::Neutral,
        _ => Channel::Unknown,
    };
    let intensity = match (channel, score) {
        (Channel::Supportive | Channel::Suppressive, Some(s)) if s.is_finite() => s.abs().min(1.0),
        _ => 0.0,
    };
    AnnotatedToken {
        text: text.to_string(),
        score,
        intensity,
        channel,
        in_explanation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScaleMode;
    use crate::query::SegmentKind;
    use crate::result::{AnchorToken, ImportanceEntry};
    use crate::scores::normalize_scores;

    #[test]
    fn channels_follow_sign() {
        let out = ScoreVisualizer::new().annotate_pairs(&[
            ("steel", Some(0.8)),
            ("frame", Some(-0.4)),
            ("a", Some(0.0)),
            ("chair", None),
        ]);
        let channels: Vec<Channel> = out.iter().map(|a| a.channel).collect();
        assert_eq!(
            channels,
            vec![
                Channel::Supportive,
                Channel::Suppressive,
                Channel::Neutral,
                Channel::Unknown
            ]
        );
        assert_eq!(out[0].intensity, 0.8);
        assert_eq!(out[1].intensity, 0.4);
    }

    #[test]
    fn intensity_is_monotone_in_magnitude() {
        let scores = [0.0, 0.1, -0.3, 0.5, -0.9, 1.0];
        let pairs: Vec<(&str, Option<f64>)> = scores.iter().map(|&s| ("t", Some(s))).collect();
        let out = ScoreVisualizer::new().annotate_pairs(&pairs);
        for i in 0..scores.len() {
            for j in 0..scores.len() {
                if f64::abs(scores[i]) < f64::abs(scores[j]) {
                    assert!(out[i].intensity < out[j].intensity);
                }
            }
            assert!((0.0..=1.0).contains(&out[i].intensity));
        }
    }

    #[test]
    fn intensity_is_clamped() {
        let out = ScoreVisualizer::new().annotate_pairs(&[("x", Some(3.0)), ("y", Some(f64::NAN))]);
        assert_eq!(out[0].intensity, 1.0);
        assert_eq!(out[1].channel, Channel::Unknown);
    }

    fn entry(text: &str, raw: f64, score: f64) -> ImportanceEntry {
        ImportanceEntry {
            text: text.to_string(),
            segment: SegmentKind::Candidate,
            positions: vec![0],
            raw_score: Some(raw),
            score: Some(score),
            in_explanation: false,
        }
    }

    fn result_with(raw: &[f64], mode: ScaleMode) -> ImportanceResult {
        let known: Vec<Option<f64>> = raw.iter().copied().map(Some).collect();
        let scores = normalize_scores(&known, mode);
        let names = ["a", "b", "c", "d"];
        ImportanceResult {
            query: "q".into(),
            role: "r".into(),
            anchor: AnchorToken {
                token: "good".into(),
                probability: 0.8,
            },
            tokens: Vec::new(),
            entries: raw
                .iter()
                .zip(&scores)
                .zip(names)
                .map(|((&r, s), name)| entry(name, r, s.unwrap_or(0.0)))
                .collect(),
            explanation: Vec::new(),
            coverage: 0.0,
            partial: false,
        }
    }

    #[test]
    fn channels_follow_raw_sign_in_every_scale_mode() {
        for mode in [ScaleMode::MaxAbs, ScaleMode::MinMax] {
            let out = ScoreVisualizer::new().annotate(&result_with(&[0.6, 0.0, -0.3], mode));
            let channels: Vec<Channel> = out.iter().map(|a| a.channel).collect();
            assert_eq!(
                channels,
                vec![Channel::Supportive, Channel::Neutral, Channel::Suppressive],
                "{mode:?}"
            );
            assert_eq!(out[0].intensity, 1.0, "{mode:?}");
            assert_eq!(out[1].intensity, 0.0, "{mode:?}");
        }
    }

    #[test]
    fn min_max_zero_raw_is_not_supportive() {
        let out = ScoreVisualizer::new().annotate(&result_with(&[0.2, 0.0, -0.2], ScaleMode::MinMax));
        assert!((out[1].score.unwrap() - 0.5).abs() < 1e-12);
        assert_eq!(out[1].channel, Channel::Neutral);
        assert_eq!(out[1].rgba()[3], 0);
    }

    #[test]
    fn rgba_uses_contrasting_channels() {
        let out = ScoreVisualizer::new().annotate_pairs(&[("a", Some(1.0)), ("b", Some(-1.0)), ("c", None)]);
        assert_eq!(out[0].rgba(), [0, 160, 0, 255]);
        assert_eq!(out[1].rgba(), [200, 0, 0, 255]);
        assert_eq!(out[2].rgba()[3], 0);
    }
}
