use serde::{Deserialize, Serialize};
use std::fmt;

/// The three FBS ontology categories a design candidate can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Function,
    Behavior,
    Structure,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Function, Category::Behavior, Category::Structure];

    /// Plural label used when presenting a category ("Functions").
    pub fn label(self) -> &'static str {
        match self {
            Category::Function => "Functions",
            Category::Behavior => "Behaviors",
            Category::Structure => "Structures",
        }
    }

    /// Adjective used when phrasing a query about a candidate ("functional").
    pub fn adjective(self) -> &'static str {
        match self {
            Category::Function => "functional",
            Category::Behavior => "behavioral",
            Category::Structure => "structural",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single generated design proposal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Candidate {
    pub text: String,
    pub category: Category,
}

impl Candidate {
    /// Builds a candidate, returning `None` when the text is blank.
    pub fn new(text: impl Into<String>, category: Category) -> Option<Self> {
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self {
            text: trimmed.to_string(),
            category,
        })
    }
}

/// Drops blank entries from a raw generated list, keeping input order.
pub fn clean_candidates<I, S>(raw: I, category: Category) -> Vec<Candidate>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    raw.into_iter()
        .filter_map(|text| Candidate::new(text, category))
        .collect()
}

/// Embedding output for one text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Embedding {
    /// Text the vector was produced from.
    pub text: String,
    pub vector: Vec<f32>,
    /// Name of the model used to produce the vector.
    pub model_name: String,
    /// Dimension of `vector`.
    pub embedding_dim: usize,
    /// Whether [`vector`](Self::vector) was L2-normalized.
    pub normalized: bool,
}
