use serde::{Deserialize, Serialize};

use crate::retry::RetryConfig;
use crate::SemanticError;

/// Environment variable overriding [`SemanticConfig::api_url`].
pub const ENV_API_URL: &str = "DESIGNSPACE_EMBEDDING_API_URL";
/// Environment variable holding a bearer token for the embedding endpoint.
pub const ENV_API_TOKEN: &str = "DESIGNSPACE_EMBEDDING_API_TOKEN";

/// Runtime configuration for embedding providers.
///
/// # Example
/// ```
/// use semantic::SemanticConfig;
///
/// let cfg = SemanticConfig {
///     mode: "api".into(),
///     api_url: Some("https://api.openai.com/v1/embeddings".into()),
///     api_auth_header: Some("Bearer sk-xxx".into()),
///     api_provider: Some("openai".into()),
///     model_name: "text-embedding-3-small".into(),
///     ..Default::default()
/// };
/// assert!(cfg.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SemanticConfig {
    /// Provider selector: `"api"` (remote HTTP) or `"stub"` (deterministic, offline).
    pub mode: String,
    /// Model label sent to the API and stamped on every [`Embedding`](crate::Embedding).
    pub model_name: String,
    /// API inference endpoint when [`mode`](Self::mode) is `"api"`.
    pub api_url: Option<String>,
    /// Authorization header (e.g., `"Bearer hf_xxx"`).
    pub api_auth_header: Option<String>,
    /// Remote provider hint: `"hf"`, `"openai"`, or `"custom"` (default).
    pub api_provider: Option<String>,
    /// Overall API timeout in seconds.
    pub api_timeout_secs: Option<u64>,
    /// Dimensionality of stub vectors.
    pub stub_dim: usize,
    /// Largest number of texts sent in one provider call.
    pub max_batch_size: usize,
    /// Concurrent requests when the provider cannot batch.
    pub max_concurrency: usize,
    /// Entries kept by the embedding cache.
    pub cache_capacity: usize,
    /// Backoff applied to transient provider failures.
    pub retry_config: RetryConfig,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            mode: "stub".into(),
            model_name: "text-embedding-ada-002".into(),
            api_url: None,
            api_auth_header: None,
            api_provider: None,
            api_timeout_secs: Some(30),
            stub_dim: 384,
            max_batch_size: 64,
            max_concurrency: 8,
            cache_capacity: 4096,
            retry_config: RetryConfig::default(),
        }
    }
}

impl SemanticConfig {
    pub fn validate(&self) -> Result<(), SemanticError> {
        match self.mode.as_str() {
            "api" => {
                if self.api_url.as_deref().is_none_or(|url| url.trim().is_empty()) {
                    return Err(SemanticError::InvalidConfig(
                        "api_url is required for api mode".into(),
                    ));
                }
            }
            "stub" => {
                if self.stub_dim == 0 {
                    return Err(SemanticError::InvalidConfig(
                        "stub_dim must be >= 1".into(),
                    ));
                }
            }
            other => {
                return Err(SemanticError::InvalidConfig(format!(
                    "unknown mode '{other}', expected 'api' or 'stub'"
                )))
            }
        }
        if self.max_batch_size == 0 {
            return Err(SemanticError::InvalidConfig(
                "max_batch_size must be >= 1".into(),
            ));
        }
        if self.max_concurrency == 0 {
            return Err(SemanticError::InvalidConfig(
                "max_concurrency must be >= 1".into(),
            ));
        }
        Ok(())
    }

    /// Applies endpoint and token overrides from a variable lookup
    /// (normally `std::env::var`).
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            self.api_url = Some(url);
            self.mode = "api".into();
        }
        if let Some(token) = lookup(ENV_API_TOKEN).filter(|v| !v.trim().is_empty()) {
            self.api_auth_header = Some(format!("Bearer {}", token.trim()));
        }
        self
    }
}
