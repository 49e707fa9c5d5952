use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::time::Instant;
use tracing::{info, warn};

use crate::retry::execute_with_retry_async;
use crate::{Embedding, SemanticConfig, SemanticError};

/// A text-to-vector backend.
///
/// Implementations return exactly one vector per input text, in input order,
/// all of one dimensionality.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Label of the underlying model, used in cache keys and on every [`Embedding`].
    fn model_name(&self) -> &str;

    /// Whether one call may carry several texts.
    fn supports_batch(&self) -> bool {
        true
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SemanticError>;
}

/// Embeds `texts`, batching when the provider allows it and falling back to
/// bounded per-text requests otherwise.
///
/// Blank texts are rejected up front. Each provider call gets the configured
/// bounded retry for transient failures; anything left after that is surfaced.
pub async fn embed_texts<P>(
    provider: &P,
    texts: &[String],
    cfg: &SemanticConfig,
) -> Result<Vec<Embedding>, SemanticError>
where
    P: EmbeddingProvider + ?Sized,
{
    if let Some(index) = texts.iter().position(|t| t.trim().is_empty()) {
        return Err(SemanticError::EmptyText { index });
    }
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    let start = Instant::now();
    let concurrency = cfg.max_concurrency.max(1);

    let vectors: Vec<Vec<f32>> = if provider.supports_batch() {
        let chunks: Vec<&[String]> = texts.chunks(cfg.max_batch_size.max(1)).collect();
        let batches: Vec<Vec<Vec<f32>>> = stream::iter(chunks)
            .map(|chunk| call_provider(provider, chunk, cfg))
            .buffered(concurrency)
            .try_collect()
            .await?;
        batches.into_iter().flatten().collect()
    } else {
        let mut indexed: Vec<(usize, Vec<f32>)> = stream::iter(texts.iter().enumerate())
            .map(|(idx, text)| async move {
                let mut out = call_provider(provider, std::slice::from_ref(text), cfg).await?;
                out.pop()
                    .map(|v| (idx, v))
                    .ok_or(SemanticError::CountMismatch {
                        expected: 1,
                        got: 0,
                    })
            })
            .buffer_unordered(concurrency)
            .try_collect()
            .await?;
        indexed.sort_by_key(|(idx, _)| *idx);
        indexed.into_iter().map(|(_, v)| v).collect()
    };

    let elapsed_micros = start.elapsed().as_micros() as u64;
    info!(
        model = provider.model_name(),
        count = texts.len(),
        elapsed_micros,
        "embed_success"
    );

    Ok(texts
        .iter()
        .zip(vectors)
        .map(|(text, vector)| Embedding {
            text: text.clone(),
            embedding_dim: vector.len(),
            vector,
            model_name: provider.model_name().to_string(),
            normalized: false,
        })
        .collect())
}

async fn call_provider<P>(
    provider: &P,
    chunk: &[String],
    cfg: &SemanticConfig,
) -> Result<Vec<Vec<f32>>, SemanticError>
where
    P: EmbeddingProvider + ?Sized,
{
    let outcome = execute_with_retry_async(
        &cfg.retry_config,
        SemanticError::is_transient,
        |_attempt| provider.embed(chunk),
    )
    .await;

    let attempts = outcome.attempts;
    let vectors = outcome.into_result().inspect_err(|err| {
        warn!(
            model = provider.model_name(),
            attempts,
            error = %err,
            "embed_failure"
        );
    })?;

    if vectors.len() != chunk.len() {
        return Err(SemanticError::CountMismatch {
            expected: chunk.len(),
            got: vectors.len(),
        });
    }
    Ok(vectors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::RetryConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Returns `[len, index-in-call]` vectors and records call sizes.
    struct RecordingProvider {
        batch: bool,
        calls: Mutex<Vec<usize>>,
        failures_left: AtomicUsize,
        failure: SemanticError,
    }

    impl RecordingProvider {
        fn new(batch: bool) -> Self {
            Self {
                batch,
                calls: Mutex::new(Vec::new()),
                failures_left: AtomicUsize::new(0),
                failure: SemanticError::Transport("reset".into()),
            }
        }

        fn failing(mut self, times: usize, failure: SemanticError) -> Self {
            self.failures_left = AtomicUsize::new(times);
            self.failure = failure;
            self
        }
    }

    #[async_trait]
    impl EmbeddingProvider for RecordingProvider {
        fn model_name(&self) -> &str {
            "recording"
        }

        fn supports_batch(&self) -> bool {
            self.batch
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SemanticError> {
            self.calls.lock().unwrap().push(texts.len());
            if self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(self.failure.clone());
            }
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }
    }

    fn cfg() -> SemanticConfig {
        SemanticConfig {
            max_batch_size: 2,
            max_concurrency: 2,
            retry_config: RetryConfig::default()
                .with_base_delay(Duration::from_millis(1))
                .with_jitter(false),
            ..Default::default()
        }
    }

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn batches_respect_max_batch_size_and_order() {
        let provider = RecordingProvider::new(true);
        let input = texts(&["a", "bb", "ccc", "dddd", "eeeee"]);

        let out = embed_texts(&provider, &input, &cfg()).await.unwrap();

        let lens: Vec<f32> = out.iter().map(|e| e.vector[0]).collect();
        assert_eq!(lens, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        let mut calls = provider.calls.lock().unwrap().clone();
        calls.sort_unstable();
        assert_eq!(calls, vec![1, 2, 2]);
        assert!(out.iter().all(|e| e.model_name == "recording" && !e.normalized));
    }

    #[tokio::test]
    async fn unbatched_provider_gets_one_text_per_call() {
        let provider = RecordingProvider::new(false);
        let input = texts(&["one", "three", "fifteen"]);

        let out = embed_texts(&provider, &input, &cfg()).await.unwrap();

        assert_eq!(provider.calls.lock().unwrap().len(), 3);
        let order: Vec<&str> = out.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(order, vec!["one", "three", "fifteen"]);
    }

    #[tokio::test]
    async fn blank_text_is_rejected_before_any_call() {
        let provider = RecordingProvider::new(true);
        let err = embed_texts(&provider, &texts(&["ok", " "]), &cfg())
            .await
            .unwrap_err();

        assert!(matches!(err, SemanticError::EmptyText { index: 1 }));
        assert!(provider.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn transient_failure_is_retried_once() {
        let provider =
            RecordingProvider::new(true).failing(1, SemanticError::Transport("timeout".into()));

        let out = embed_texts(&provider, &texts(&["a"]), &cfg()).await.unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(provider.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn persistent_failure_surfaces_after_one_retry() {
        let provider = RecordingProvider::new(true).failing(
            5,
            SemanticError::Http {
                status: 503,
                body: "busy".into(),
            },
        );

        let err = embed_texts(&provider, &texts(&["a"]), &cfg())
            .await
            .unwrap_err();

        assert!(matches!(err, SemanticError::Http { status: 503, .. }));
        assert_eq!(provider.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn auth_failure_is_not_retried() {
        let provider = RecordingProvider::new(true).failing(
            5,
            SemanticError::Http {
                status: 401,
                body: "denied".into(),
            },
        );

        let err = embed_texts(&provider, &texts(&["a"]), &cfg())
            .await
            .unwrap_err();

        assert!(!err.is_transient());
        assert_eq!(provider.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_input_makes_no_calls() {
        let provider = RecordingProvider::new(true);
        let out = embed_texts(&provider, &[], &cfg()).await.unwrap();
        assert!(out.is_empty());
        assert!(provider.calls.lock().unwrap().is_empty());
    }
}
