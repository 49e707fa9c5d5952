use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use std::time::Duration;

use crate::provider::EmbeddingProvider;
use crate::{SemanticConfig, SemanticError};

// Global HTTP client with connection pooling
static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(32)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiProviderKind {
    HuggingFace,
    OpenAI,
    Custom,
}

impl ApiProviderKind {
    pub fn from_hint(hint: Option<&str>) -> Self {
        match hint.unwrap_or("custom").to_ascii_lowercase().as_str() {
            "hf" | "huggingface" => ApiProviderKind::HuggingFace,
            "openai" | "gpt" => ApiProviderKind::OpenAI,
            _ => ApiProviderKind::Custom,
        }
    }
}

/// Embedding provider backed by a remote HTTP endpoint.
#[derive(Debug, Clone)]
pub struct ApiEmbeddingProvider {
    url: String,
    auth_header: Option<String>,
    kind: ApiProviderKind,
    model_name: String,
    timeout: Duration,
}

impl ApiEmbeddingProvider {
    pub fn new(cfg: &SemanticConfig) -> Result<Self, SemanticError> {
        let url = cfg
            .api_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| SemanticError::InvalidConfig("api_url is required for api mode".into()))?;

        Ok(Self {
            url: url.to_string(),
            auth_header: cfg.api_auth_header.clone(),
            kind: ApiProviderKind::from_hint(cfg.api_provider.as_deref()),
            model_name: cfg.model_name.clone(),
            timeout: Duration::from_secs(cfg.api_timeout_secs.unwrap_or(30)),
        })
    }

    pub fn kind(&self) -> ApiProviderKind {
        self.kind
    }

    async fn send(&self, payload: Value) -> Result<Value, SemanticError> {
        let mut request = HTTP_CLIENT
            .post(&self.url)
            .timeout(self.timeout)
            .header("Content-Type", "application/json");
        if let Some(header) = self.auth_header.as_deref() {
            request = request.header("Authorization", header);
        }

        let response = request
            .json(&payload)
            .send()
            .await
            .map_err(|e| SemanticError::Transport(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SemanticError::Http {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| SemanticError::MalformedResponse(format!("invalid JSON response: {e}")))
    }
}

#[async_trait]
impl EmbeddingProvider for ApiEmbeddingProvider {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SemanticError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let payload = build_api_payload(self.kind, texts, &self.model_name);
        let response = self.send(payload).await?;
        parse_embeddings_from_value(response)
    }
}

pub(crate) fn build_api_payload(kind: ApiProviderKind, texts: &[String], model: &str) -> Value {
    match kind {
        ApiProviderKind::HuggingFace => json!({ "inputs": texts }),
        ApiProviderKind::OpenAI => json!({ "input": texts, "model": model }),
        ApiProviderKind::Custom => json!({ "texts": texts }),
    }
}

pub(crate) fn parse_embeddings_from_value(value: Value) -> Result<Vec<Vec<f32>>, SemanticError> {
    match value {
        Value::Object(mut map) => {
            if let Some(embeddings) = map.remove("embeddings") {
                return parse_embedding_collection(embeddings);
            }

            if let Some(Value::Array(items)) = map.remove("data") {
                let mut indexed = Vec::with_capacity(items.len());
                for (pos, item) in items.into_iter().enumerate() {
                    let Value::Object(mut obj) = item else {
                        return Err(SemanticError::MalformedResponse(
                            "unexpected entry inside `data` array".into(),
                        ));
                    };
                    let embedding = obj.remove("embedding").ok_or_else(|| {
                        SemanticError::MalformedResponse(
                            "missing `embedding` field in data item".into(),
                        )
                    })?;
                    // OpenAI-style answers carry an explicit position.
                    let index = obj
                        .get("index")
                        .and_then(Value::as_u64)
                        .map_or(pos, |i| i as usize);
                    indexed.push((index, parse_embedding_vector(embedding)?));
                }
                indexed.sort_by_key(|(index, _)| *index);
                return Ok(indexed.into_iter().map(|(_, v)| v).collect());
            }

            if let Some(error) = map.remove("error") {
                return Err(SemanticError::Provider(match error {
                    Value::String(msg) => msg,
                    other => other.to_string(),
                }));
            }

            Err(SemanticError::MalformedResponse(
                "unsupported API response shape".into(),
            ))
        }
        other => parse_embedding_collection(other),
    }
}

fn parse_embedding_collection(value: Value) -> Result<Vec<Vec<f32>>, SemanticError> {
    match value {
        Value::Array(items) => {
            if items.is_empty() {
                Ok(Vec::new())
            } else if items.iter().all(|item| matches!(item, Value::Array(_))) {
                items.into_iter().map(parse_embedding_vector).collect()
            } else {
                parse_embedding_vector(Value::Array(items)).map(|vec| vec![vec])
            }
        }
        other => parse_embedding_vector(other).map(|vec| vec![vec]),
    }
}

fn parse_embedding_vector(value: Value) -> Result<Vec<f32>, SemanticError> {
    match value {
        Value::Array(values) => values
            .into_iter()
            .map(|entry| match entry {
                Value::Number(num) => num.as_f64().map(|f| f as f32).ok_or_else(|| {
                    SemanticError::MalformedResponse("non-finite embedding value".into())
                }),
                other => Err(SemanticError::MalformedResponse(format!(
                    "embedding entries must be numbers, got {other:?}"
                ))),
            })
            .collect(),
        other => Err(SemanticError::MalformedResponse(format!(
            "embedding vector must be an array, got {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts() -> Vec<String> {
        vec!["reduces emissions".into(), "steel frame".into()]
    }

    #[test]
    fn provider_kind_from_hint() {
        assert_eq!(ApiProviderKind::from_hint(Some("HF")), ApiProviderKind::HuggingFace);
        assert_eq!(ApiProviderKind::from_hint(Some("openai")), ApiProviderKind::OpenAI);
        assert_eq!(ApiProviderKind::from_hint(None), ApiProviderKind::Custom);
        assert_eq!(ApiProviderKind::from_hint(Some("other")), ApiProviderKind::Custom);
    }

    #[test]
    fn payload_shapes_per_provider() {
        let hf = build_api_payload(ApiProviderKind::HuggingFace, &texts(), "m");
        assert_eq!(hf, json!({ "inputs": ["reduces emissions", "steel frame"] }));

        let openai = build_api_payload(ApiProviderKind::OpenAI, &texts(), "ada");
        assert_eq!(openai["model"], "ada");
        assert_eq!(openai["input"][1], "steel frame");

        let custom = build_api_payload(ApiProviderKind::Custom, &texts(), "m");
        assert_eq!(custom["texts"][0], "reduces emissions");
    }

    #[test]
    fn new_requires_url() {
        let cfg = SemanticConfig {
            mode: "api".into(),
            api_url: Some("  ".into()),
            ..Default::default()
        };
        assert!(matches!(
            ApiEmbeddingProvider::new(&cfg),
            Err(SemanticError::InvalidConfig(_))
        ));
    }

    #[test]
    fn new_reads_provider_settings() {
        let cfg = SemanticConfig {
            mode: "api".into(),
            api_url: Some("https://api.example.com/embed".into()),
            api_provider: Some("openai".into()),
            model_name: "text-embedding-3-small".into(),
            ..Default::default()
        };
        let provider = ApiEmbeddingProvider::new(&cfg).unwrap();
        assert_eq!(provider.kind(), ApiProviderKind::OpenAI);
        assert_eq!(provider.model_name(), "text-embedding-3-small");
    }

    #[test]
    fn parses_raw_nested_arrays() {
        let parsed = parse_embeddings_from_value(json!([[1.0, 2.0], [3.0, 4.0]])).unwrap();
        assert_eq!(parsed, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
    }

    #[test]
    fn parses_single_flat_array() {
        let parsed = parse_embeddings_from_value(json!([1.0, 2.0, 3.0])).unwrap();
        assert_eq!(parsed, vec![vec![1.0, 2.0, 3.0]]);
    }

    #[test]
    fn parses_embeddings_field() {
        let parsed = parse_embeddings_from_value(json!({ "embeddings": [[0.5], [0.25]] })).unwrap();
        assert_eq!(parsed, vec![vec![0.5], vec![0.25]]);
    }

    #[test]
    fn parses_openai_data_respecting_index() {
        let parsed = parse_embeddings_from_value(json!({
            "data": [
                { "index": 1, "embedding": [2.0] },
                { "index": 0, "embedding": [1.0] }
            ]
        }))
        .unwrap();
        assert_eq!(parsed, vec![vec![1.0], vec![2.0]]);
    }

    #[test]
    fn error_body_becomes_provider_error() {
        let err = parse_embeddings_from_value(json!({ "error": "quota exceeded" })).unwrap_err();
        assert!(matches!(err, SemanticError::Provider(msg) if msg == "quota exceeded"));
    }

    #[test]
    fn rejects_non_numeric_entries() {
        let err = parse_embeddings_from_value(json!([["a", "b"]])).unwrap_err();
        assert!(matches!(err, SemanticError::MalformedResponse(_)));
    }

    #[test]
    fn rejects_unknown_object_shape() {
        let err = parse_embeddings_from_value(json!({ "vectors": [] })).unwrap_err();
        assert!(err.to_string().contains("unsupported API response shape"));
    }
}
