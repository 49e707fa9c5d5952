use lru::LruCache;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::provider::{embed_texts, EmbeddingProvider};
use crate::{Embedding, SemanticConfig, SemanticError};

/// Content hash identifying one (model, text) pair.
pub fn cache_key(model_name: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(model_name.as_bytes());
    hasher.update([0u8]);
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Bounded LRU of raw provider vectors keyed by [`cache_key`].
///
/// Only successful provider answers are stored. Fetches for missing keys are
/// serialized so a text is never requested twice concurrently.
pub struct EmbeddingCache {
    entries: Mutex<LruCache<String, Arc<Vec<f32>>>>,
    fetch: tokio::sync::Mutex<()>,
}

impl EmbeddingCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            fetch: tokio::sync::Mutex::new(()),
        }
    }

    pub fn get(&self, key: &str) -> Option<Arc<Vec<f32>>> {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        entries.get(key).cloned()
    }

    pub fn insert(&self, key: String, vector: Vec<f32>) {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        entries.put(key, Arc::new(vector));
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clear();
    }
}

/// [`embed_texts`] with a cache in front: hits are served locally, misses are
/// deduplicated and fetched in one pass.
pub async fn embed_texts_cached<P>(
    provider: &P,
    cache: &EmbeddingCache,
    texts: &[String],
    cfg: &SemanticConfig,
) -> Result<Vec<Embedding>, SemanticError>
where
    P: EmbeddingProvider + ?Sized,
{
    if let Some(index) = texts.iter().position(|t| t.trim().is_empty()) {
        return Err(SemanticError::EmptyText { index });
    }

    let model = provider.model_name();
    let keys: Vec<String> = texts.iter().map(|t| cache_key(model, t)).collect();
    let mut found: Vec<Option<Arc<Vec<f32>>>> = keys.iter().map(|k| cache.get(k)).collect();

    if found.iter().any(Option::is_none) {
        let _guard = cache.fetch.lock().await;

        // Another caller may have filled some keys while we waited.
        let mut missing: Vec<String> = Vec::new();
        let mut missing_keys: HashMap<&str, usize> = HashMap::new();
        for (idx, slot) in found.iter_mut().enumerate() {
            if slot.is_some() {
                continue;
            }
            *slot = cache.get(&keys[idx]);
            if slot.is_none() && !missing_keys.contains_key(keys[idx].as_str()) {
                missing_keys.insert(keys[idx].as_str(), missing.len());
                missing.push(texts[idx].clone());
            }
        }

        debug!(
            model,
            requested = texts.len(),
            fetched = missing.len(),
            "embedding_cache_fill"
        );

        if !missing.is_empty() {
            let fetched = embed_texts(provider, &missing, cfg).await?;
            let fetched: Vec<Arc<Vec<f32>>> =
                fetched.into_iter().map(|e| Arc::new(e.vector)).collect();
            for (key, pos) in &missing_keys {
                cache.insert((*key).to_string(), fetched[*pos].as_ref().clone());
            }
            for (idx, slot) in found.iter_mut().enumerate() {
                if slot.is_none() {
                    *slot = missing_keys
                        .get(keys[idx].as_str())
                        .map(|pos| fetched[*pos].clone());
                }
            }
        }
    }

    texts
        .iter()
        .zip(found)
        .map(|(text, vector)| {
            let vector = vector.ok_or(SemanticError::CountMismatch {
                expected: texts.len(),
                got: 0,
            })?;
            Ok(Embedding {
                text: text.clone(),
                embedding_dim: vector.len(),
                vector: vector.as_ref().clone(),
                model_name: model.to_string(),
                normalized: false,
            })
        })
        .collect()
}
