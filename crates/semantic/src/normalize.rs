use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::SemanticError;

/// Flag raised for a vector whose norm is zero (or not finite) and therefore has no direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("vector {index} has zero norm and cannot be normalized")]
pub struct DegenerateVector {
    pub index: usize,
}

/// Output of [`normalize_batch`]: positions preserved, degenerate entries left as `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBatch {
    pub vectors: Vec<Option<Vec<f32>>>,
    pub degenerate: Vec<DegenerateVector>,
}

impl NormalizedBatch {
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Unit vectors together with their input positions.
    pub fn valid(&self) -> impl Iterator<Item = (usize, &[f32])> {
        self.vectors
            .iter()
            .enumerate()
            .filter_map(|(idx, v)| v.as_deref().map(|v| (idx, v)))
    }

    pub fn is_degenerate(&self, index: usize) -> bool {
        matches!(self.vectors.get(index), Some(None))
    }
}

/// Euclidean norm, accumulated in f64.
pub fn l2_norm(v: &[f32]) -> f64 {
    v.iter()
        .map(|&x| f64::from(x) * f64::from(x))
        .sum::<f64>()
        .sqrt()
}

/// In-place L2 normalization. Returns `false` and leaves `v` untouched when the
/// norm is zero or not finite.
pub fn l2_normalize_in_place(v: &mut [f32]) -> bool {
    let norm = l2_norm(v);
    if norm == 0.0 || !norm.is_finite() {
        return false;
    }
    let inv_norm = norm.recip();
    for x in v.iter_mut() {
        *x = (f64::from(*x) * inv_norm) as f32;
    }
    true
}

/// Normalizes every vector of a batch to unit length.
///
/// All vectors must share one dimensionality. Zero-norm vectors do not fail the
/// batch: they are skipped, flagged as [`DegenerateVector`] and left as `None`.
pub fn normalize_batch(vectors: Vec<Vec<f32>>) -> Result<NormalizedBatch, SemanticError> {
    let Some(expected) = vectors.first().map(Vec::len) else {
        return Ok(NormalizedBatch::default());
    };

    if let Some((index, v)) = vectors.iter().enumerate().find(|(_, v)| v.len() != expected) {
        return Err(SemanticError::DimensionMismatch {
            index,
            expected,
            got: v.len(),
        });
    }

    let mut degenerate = Vec::new();
    let vectors = vectors
        .into_iter()
        .enumerate()
        .map(|(index, mut v)| {
            if l2_normalize_in_place(&mut v) {
                Some(v)
            } else {
                warn!(index, dim = expected, "degenerate_vector");
                degenerate.push(DegenerateVector { index });
                None
            }
        })
        .collect();

    Ok(NormalizedBatch {
        vectors,
        degenerate,
    })
}
