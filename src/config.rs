//! YAML configuration for a design-space analysis run.
//!
//! Every stage section is optional and falls back to its defaults, so a file
//! only needs to name what it changes.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//! name: "turbocharger study"
//!
//! roles:
//!   convergent: "You are a design expert able to classify design proposals as bad, poor, regular, good or excellent."
//!
//! requirements:
//!   - "Minimize cost"
//!   - "Sustainability"
//!
//! semantic:
//!   mode: "api"
//!   api_url: "https://api.openai.com/v1/embeddings"
//!   api_provider: "openai"
//!   model_name: "text-embedding-ada-002"
//!
//! cluster:
//!   algorithm:
//!     kind: "hdbscan"
//!     min_cluster_size: 2
//!     min_samples: 1
//!   projection:
//!     perplexity: 30.0
//!     seed: 42
//!
//! ranking:
//!   max_results: 10
//!
//! explain:
//!   stop_threshold: 0.8
//!   max_concurrency: 8
//!
//! oracle:
//!   model_path: "models/roberta-base/model.onnx"
//!   tokenizer_path: "models/roberta-base/tokenizer.json"
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use cluster::ClusterConfig;
use explain::{ExplainConfig, OnnxOracleConfig};
use matcher::RankConfig;
use semantic::SemanticConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Role descriptions prepended to prompts and queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleConfig {
    /// Used while generating candidates.
    #[serde(default = "default_divergent_role")]
    pub divergent: String,
    /// Used when asking the masked model to rate a candidate.
    #[serde(default = "default_convergent_role")]
    pub convergent: String,
}

impl Default for RoleConfig {
    fn default() -> Self {
        Self {
            divergent: default_divergent_role(),
            convergent: default_convergent_role(),
        }
    }
}

/// Top-level configuration for the analysis pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DesignSpaceConfig {
    /// Configuration format version
    pub version: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub roles: RoleConfig,

    /// Requirements offered to a session when it brings none of its own.
    #[serde(default = "default_requirements")]
    pub requirements: Vec<String>,

    #[serde(default)]
    pub semantic: SemanticConfig,

    #[serde(default)]
    pub cluster: ClusterConfig,

    #[serde(default)]
    pub ranking: RankConfig,

    #[serde(default)]
    pub explain: ExplainConfig,

    #[serde(default)]
    pub oracle: OnnxOracleConfig,

    /// Variables consulted before the process environment.
    #[serde(default)]
    pub env_overrides: HashMap<String, String>,
}

impl DesignSpaceConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: DesignSpaceConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `DESIGNSPACE_*` overrides from `env_overrides` and then the
    /// process environment.
    pub fn apply_env_overrides(self) -> Self {
        let overrides = self.env_overrides.clone();
        self.with_env_lookup(|key| {
            overrides
                .get(key)
                .cloned()
                .or_else(|| std::env::var(key).ok())
        })
    }

    /// Applies overrides from an arbitrary variable lookup.
    pub fn with_env_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        self.semantic = self.semantic.with_env_overrides(lookup);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        if self.roles.convergent.trim().is_empty() {
            return Err(ConfigLoadError::Validation(
                "roles.convergent must not be empty".to_string(),
            ));
        }
        if self.requirements.iter().any(|r| r.trim().is_empty()) {
            return Err(ConfigLoadError::Validation(
                "requirements must not contain blank entries".to_string(),
            ));
        }
        if self.oracle.max_sequence_length == 0 {
            return Err(ConfigLoadError::Validation(
                "oracle.max_sequence_length must be >= 1".to_string(),
            ));
        }

        self.semantic
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("semantic: {e}")))?;
        self.cluster
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("cluster: {e}")))?;
        self.ranking
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("ranking: {e}")))?;
        self.explain
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("explain: {e}")))?;

        Ok(())
    }
}

impl Default for DesignSpaceConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            roles: RoleConfig::default(),
            requirements: default_requirements(),
            semantic: SemanticConfig::default(),
            cluster: ClusterConfig::default(),
            ranking: RankConfig::default(),
            explain: ExplainConfig::default(),
            oracle: OnnxOracleConfig::default(),
            env_overrides: HashMap::new(),
        }
    }
}

fn default_divergent_role() -> String {
    "You are an experienced designer that is able to propose numerous innovative design proposals for FBS ontology design problems.".to_string()
}
fn default_convergent_role() -> String {
    "You are a design expert able to classify design proposals as bad, poor, regular, good or excellent.".to_string()
}
fn default_requirements() -> Vec<String> {
    [
        "Address buyer needs",
        "Innovation",
        "Ensure technical feasibility",
        "Minimize cost",
        "Scalability",
        "Compliance with safety regulations",
        "Compliance with energy regulations",
        "Sustainability",
        "Time efficiency",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}
