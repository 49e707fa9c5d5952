use async_trait::async_trait;
use fxhash::hash64;

use crate::provider::EmbeddingProvider;
use crate::SemanticError;

/// Deterministic offline provider.
///
/// Words are lowercased and hashed into signed buckets (feature hashing), so
/// texts that share vocabulary end up close to each other. Texts without any
/// alphanumeric word map to the zero vector.
#[derive(Debug, Clone)]
pub struct StubEmbeddingProvider {
    dim: usize,
    model_name: String,
}

impl StubEmbeddingProvider {
    pub fn new(dim: usize) -> Self {
        Self {
            dim: dim.max(1),
            model_name: format!("stub-bow-{}", dim.max(1)),
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }
}

pub(crate) fn stub_vector(text: &str, dim: usize) -> Vec<f32> {
    let mut v = vec![0f32; dim];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let h = hash64(word.to_lowercase().as_str());
        let idx = (h % dim as u64) as usize;
        let sign = if h >> 63 == 0 { 1.0 } else { -1.0 };
        v[idx] += sign;
    }
    v
}

#[async_trait]
impl EmbeddingProvider for StubEmbeddingProvider {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SemanticError> {
        Ok(texts.iter().map(|t| stub_vector(t, self.dim)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::l2_norm;

    fn cosine(a: &[f32], b: &[f32]) -> f64 {
        let dot: f64 = a.iter().zip(b).map(|(x, y)| f64::from(x * y)).sum();
        dot / (l2_norm(a) * l2_norm(b))
    }

    #[test]
    fn stub_vector_is_deterministic() {
        let a = stub_vector("Recycled steel frame", 64);
        let b = stub_vector("Recycled steel frame", 64);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn stub_vector_ignores_case_and_punctuation() {
        assert_eq!(
            stub_vector("Steel, frame!", 32),
            stub_vector("steel frame", 32)
        );
    }

    #[test]
    fn shared_words_increase_similarity() {
        let base = stub_vector("reduce carbon emissions", 256);
        let close = stub_vector("reduce emissions quickly", 256);
        let far = stub_vector("glass facade panels", 256);
        assert!(cosine(&base, &close) > cosine(&base, &far));
    }

    #[test]
    fn text_without_words_is_zero_vector() {
        assert!(stub_vector("?!", 8).iter().all(|&x| x == 0.0));
    }

    #[tokio::test]
    async fn provider_returns_one_vector_per_text() {
        let provider = StubEmbeddingProvider::new(16);
        let out = provider
            .embed(&["a b".to_string(), "c".to_string()])
            .await
            .unwrap();
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|v| v.len() == 16));
        assert_eq!(provider.model_name(), "stub-bow-16");
    }
}
