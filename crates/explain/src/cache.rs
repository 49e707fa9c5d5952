use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::{ExplainError, ImportanceResult};

type Slot = Arc<Mutex<Option<Arc<ImportanceResult>>>>;

/// Completed importance results keyed by [`Query::cache_key`](crate::Query::cache_key).
///
/// At most one computation runs per key: concurrent callers for the same key
/// wait on the key's slot and reuse the stored result. Failed and partial
/// computations leave the slot empty.
#[derive(Default)]
pub struct ImportanceCache {
    slots: DashMap<String, Slot>,
}

impl ImportanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached result for `key`, or runs `compute` and stores its
    /// output when it is complete.
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: &str,
        compute: F,
    ) -> Result<Arc<ImportanceResult>, ExplainError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ImportanceResult, ExplainError>>,
    {
        let slot = self.slots.entry(key.to_string()).or_default().clone();
        let mut guard = slot.lock().await;

        if let Some(hit) = guard.as_ref() {
            debug!(key, "importance_cache_hit");
            return Ok(hit.clone());
        }

        let result = match compute().await {
            Ok(result) => Arc::new(result),
            Err(err) => {
                drop(guard);
                self.evict_if_idle(key, &slot);
                return Err(err);
            }
        };
        if !result.partial {
            *guard = Some(result.clone());
            return Ok(result);
        }

        debug!(key, "importance_partial_not_cached");
        drop(guard);
        self.evict_if_idle(key, &slot);
        Ok(result)
    }

    /// Drops the empty slot for `key` unless another caller is waiting on it.
    fn evict_if_idle(&self, key: &str, slot: &Slot) {
        // One reference held by the map, one by `slot`.
        self.slots.remove_if(key, |_, stored| {
            Arc::ptr_eq(stored, slot) && Arc::strong_count(stored) <= 2
        });
    }

    /// Completed result for `key`, if present and not being computed.
    ///
    /// A slot momentarily locked by another caller reads as absent.
    pub fn get(&self, key: &str) -> Option<Arc<ImportanceResult>> {
        let slot = self.slots.get(key)?.clone();
        let guard = slot.try_lock().ok()?;
        guard.clone()
    }

    /// Number of stored results. Slots locked by another caller at the time
    /// of the call are not counted.
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|entry| {
                entry
                    .value()
                    .try_lock()
                    .map(|guard| guard.is_some())
                    .unwrap_or(false)
            })
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.slots.clear();
    }
}
