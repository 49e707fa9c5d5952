//! Query synthesis.
//!
//! A query is kept as ordered segments so that tokens can be traced back to the
//! part of the sentence they came from. Only content segments are perturbed.

use semantic::{Candidate, Category};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    /// Role description prefixed to every query.
    Role,
    /// Fixed connective wording of the sentence template.
    Template,
    Candidate,
    /// Category adjective ("structural").
    SolutionType,
    /// The design problem.
    Problem,
}

impl SegmentKind {
    /// Whether tokens of this segment are eligible for perturbation.
    pub fn is_content(self) -> bool {
        matches!(
            self,
            SegmentKind::Candidate | SegmentKind::SolutionType | SegmentKind::Problem
        )
    }
}

/// A run of query text. `text` includes its leading whitespace so that the
/// concatenation of all segments is exactly the query text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub kind: SegmentKind,
    pub text: String,
}

impl Segment {
    pub fn new(kind: SegmentKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// One oracle-vocabulary token of a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Position in the full tokenized query.
    pub position: usize,
    pub text: String,
    pub segment: SegmentKind,
    pub segment_index: usize,
    /// Whether the token may be perturbed.
    pub eligible: bool,
}

/// Evaluative sentence about one candidate, prefixed by a role description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    role: String,
    segments: Vec<Segment>,
}

impl Query {
    /// `In one word how good is {candidate} as a {adjective} solution for {problem}?`
    pub fn new(role: &str, candidate: &str, category: Category, problem: &str) -> Self {
        let content = |kind: SegmentKind, text: &str| {
            let text = text.trim();
            if text.is_empty() {
                Segment::new(kind, "")
            } else {
                Segment::new(kind, format!(" {text}"))
            }
        };

        let sentence = vec![
            Segment::new(SegmentKind::Template, "In one word how good is"),
            content(SegmentKind::Candidate, candidate),
            Segment::new(SegmentKind::Template, " as a"),
            content(SegmentKind::SolutionType, category.adjective()),
            Segment::new(SegmentKind::Template, " solution for"),
            content(SegmentKind::Problem, problem),
            Segment::new(SegmentKind::Template, "?"),
        ];
        Self::from_segments(role, sentence)
    }

    pub fn for_candidate(role: &str, candidate: &Candidate, problem: &str) -> Self {
        Self::new(role, &candidate.text, candidate.category, problem)
    }

    /// Builds a query from custom sentence segments. The role description is
    /// prepended as its own segment.
    pub fn from_segments(role: &str, mut sentence: Vec<Segment>) -> Self {
        let role = role.trim().to_string();
        let mut segments = Vec::with_capacity(sentence.len() + 1);
        if !role.is_empty() {
            segments.push(Segment::new(SegmentKind::Role, role.clone()));
            if let Some(first) = sentence.first_mut() {
                if !first.text.is_empty() && !first.text.starts_with(char::is_whitespace) {
                    first.text.insert(0, ' ');
                }
            }
        }
        segments.extend(sentence);
        Self { role, segments }
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    /// All segments in order, the role segment first when present.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The evaluative sentence without the role description.
    pub fn sentence(&self) -> String {
        self.segments
            .iter()
            .filter(|s| s.kind != SegmentKind::Role)
            .map(|s| s.text.as_str())
            .collect::<String>()
            .trim_start()
            .to_string()
    }

    /// Full text handed to the oracle.
    pub fn text(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }

    /// Text of the candidate segment, trimmed.
    pub fn candidate(&self) -> Option<&str> {
        self.segments
            .iter()
            .find(|s| s.kind == SegmentKind::Candidate)
            .map(|s| s.text.trim())
    }

    /// Content hash of (sentence, role description).
    pub fn cache_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.sentence().as_bytes());
        hasher.update([0u8]);
        hasher.update(self.role.as_bytes());
        hex::encode(hasher.finalize())
    }
}
