//! Masked language model oracle backed by ONNX Runtime and a Hugging Face
//! `tokenizer.json`.
//!
//! Sessions are not `Sync`, so each blocking worker thread keeps its own
//! session per model and inference runs on tokio's blocking pool.

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use onnxruntime::environment::Environment;
use onnxruntime::ndarray::Array;
use onnxruntime::session::Session;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use tokenizers::Tokenizer;
use tracing::debug;

use crate::assets::{resolve_model_assets, ModelAssets};
use crate::{MaskedModelOracle, OracleError, TokenDistribution};

static ORT_ENV: OnceCell<Environment> = OnceCell::new();

thread_local! {
    static SESSIONS: RefCell<HashMap<ModelAssets, Rc<CachedSession>>> =
        RefCell::new(HashMap::new());
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OnnxOracleConfig {
    pub model_name: String,
    /// Local ONNX export of a masked LM head (logits output).
    pub model_path: PathBuf,
    /// Downloaded to `model_path` when the file is missing.
    pub model_url: Option<String>,
    /// Defaults to `tokenizer.json` in the model's directory.
    pub tokenizer_path: Option<PathBuf>,
    /// Downloaded to the tokenizer path when the file is missing.
    pub tokenizer_url: Option<String>,
    pub mask_token: String,
    /// Prepended to every sequence when set.
    pub bos_token: Option<String>,
    /// Appended to every sequence when set.
    pub eos_token: Option<String>,
    pub max_sequence_length: usize,
}

impl Default for OnnxOracleConfig {
    fn default() -> Self {
        Self {
            model_name: "roberta-base".into(),
            model_path: PathBuf::from("models/roberta-base/model.onnx"),
            model_url: None,
            tokenizer_path: None,
            tokenizer_url: None,
            mask_token: "<mask>".into(),
            bos_token: Some("<s>".into()),
            eos_token: Some("</s>".into()),
            max_sequence_length: 512,
        }
    }
}

struct CachedSession {
    session: RefCell<Session<'static>>,
}

impl CachedSession {
    fn load(assets: &ModelAssets) -> Result<Self, OracleError> {
        let env = ort_environment()?;
        let session = env
            .new_session_builder()
            .map_err(|e| OracleError::Unavailable(e.to_string()))?
            .with_model_from_file(assets.model_path.clone())
            .map_err(|e| OracleError::Unavailable(e.to_string()))?;
        Ok(Self {
            session: RefCell::new(session),
        })
    }
}

fn session_for(assets: &ModelAssets) -> Result<Rc<CachedSession>, OracleError> {
    SESSIONS.with(|cache| {
        let mut cache = cache.borrow_mut();
        if let Some(handle) = cache.get(assets) {
            return Ok(handle.clone());
        }
        debug!(model = %assets.model_path.display(), "onnx_session_load");
        let handle = Rc::new(CachedSession::load(assets)?);
        cache.insert(assets.clone(), handle.clone());
        Ok(handle)
    })
}

fn ort_environment() -> Result<&'static Environment, OracleError> {
    ORT_ENV.get_or_try_init(|| {
        Environment::builder()
            .with_name("explain")
            .build()
            .map_err(|e| OracleError::Unavailable(e.to_string()))
    })
}

/// RoBERTa-style masked LM served from a local ONNX file.
pub struct OnnxMaskedOracle {
    cfg: OnnxOracleConfig,
    assets: ModelAssets,
    tokenizer: Arc<Tokenizer>,
    vocab: Arc<Vec<String>>,
    bos_id: Option<i64>,
    eos_id: Option<i64>,
}

impl OnnxMaskedOracle {
    /// Resolves (and if needed downloads) the model assets and loads the tokenizer.
    pub async fn load(cfg: OnnxOracleConfig) -> Result<Self, OracleError> {
        let assets = resolve_model_assets(&cfg).await?;
        let tokenizer = Tokenizer::from_file(&assets.tokenizer_path)
            .map_err(|e| OracleError::Tokenizer(e.to_string()))?;

        if tokenizer.token_to_id(&cfg.mask_token).is_none() {
            return Err(OracleError::UnknownToken(cfg.mask_token.clone()));
        }
        let special_id = |token: &Option<String>| -> Result<Option<i64>, OracleError> {
            match token {
                Some(t) => tokenizer
                    .token_to_id(t)
                    .map(|id| Some(i64::from(id)))
                    .ok_or_else(|| OracleError::UnknownToken(t.clone())),
                None => Ok(None),
            }
        };
        let bos_id = special_id(&cfg.bos_token)?;
        let eos_id = special_id(&cfg.eos_token)?;

        let by_token = tokenizer.get_vocab(true);
        let size = by_token.values().map(|&id| id as usize + 1).max().unwrap_or(0);
        let mut vocab = vec![String::new(); size];
        for (token, id) in by_token {
            vocab[id as usize] = token;
        }

        Ok(Self {
            cfg,
            assets,
            tokenizer: Arc::new(tokenizer),
            vocab: Arc::new(vocab),
            bos_id,
            eos_id,
        })
    }

    pub fn vocab_size(&self) -> usize {
        self.vocab.len()
    }

    fn encode_ids(&self, tokens: &[String]) -> Result<Vec<i64>, OracleError> {
        let mut ids = Vec::with_capacity(tokens.len() + 2);
        ids.extend(self.bos_id);
        for token in tokens {
            let id = self
                .tokenizer
                .token_to_id(token)
                .ok_or_else(|| OracleError::UnknownToken(token.clone()))?;
            ids.push(i64::from(id));
        }
        ids.extend(self.eos_id);
        Ok(ids)
    }
}

#[async_trait]
impl MaskedModelOracle for OnnxMaskedOracle {
    fn model_name(&self) -> &str {
        &self.cfg.model_name
    }

    fn mask_token(&self) -> &str {
        &self.cfg.mask_token
    }

    fn tokenize(&self, text: &str) -> Result<Vec<String>, OracleError> {
        let encoding = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| OracleError::Tokenizer(e.to_string()))?;
        Ok(encoding.get_tokens().to_vec())
    }

    async fn predict_masked(
        &self,
        tokens: &[String],
        mask_position: usize,
    ) -> Result<TokenDistribution, OracleError> {
        if mask_position >= tokens.len() {
            return Err(OracleError::InvalidPosition {
                position: mask_position,
                len: tokens.len(),
            });
        }
        let ids = self.encode_ids(tokens)?;
        if ids.len() > self.cfg.max_sequence_length {
            return Err(OracleError::Inference(format!(
                "sequence of {} tokens exceeds the model limit of {}",
                ids.len(),
                self.cfg.max_sequence_length
            )));
        }
        let mask_index = mask_position + usize::from(self.bos_id.is_some());

        let assets = self.assets.clone();
        let logits = tokio::task::spawn_blocking(move || {
            let handle = session_for(&assets)?;
            run_masked_lm(&handle.session, ids, mask_index)
        })
        .await
        .map_err(|e| OracleError::Inference(format!("inference task failed: {e}")))??;

        TokenDistribution::new(self.vocab.clone(), softmax(&logits))
    }
}

/// Logits at `mask_index` for a single sequence.
fn run_masked_lm(
    session: &RefCell<Session<'static>>,
    ids: Vec<i64>,
    mask_index: usize,
) -> Result<Vec<f32>, OracleError> {
    let seq_len = ids.len();
    let input_ids = Array::from_shape_vec((1, seq_len), ids)
        .map_err(|e| OracleError::Inference(e.to_string()))?;
    let attention_mask = Array::from_elem((1, seq_len), 1_i64);

    let mut guard = session.borrow_mut();
    let session_ref = &mut *guard;
    let mut runtime_inputs = Vec::with_capacity(session_ref.inputs.len());
    let mut input_ids = Some(input_ids);
    let mut attention_mask = Some(attention_mask);

    for input in &session_ref.inputs {
        match input.name.as_str() {
            "input_ids" => {
                let tensor = input_ids.take().ok_or_else(|| {
                    OracleError::Inference("model requested `input_ids` twice".into())
                })?;
                runtime_inputs.push(tensor.into_dyn());
            }
            "attention_mask" => {
                let tensor = attention_mask.take().ok_or_else(|| {
                    OracleError::Inference("model requested `attention_mask` twice".into())
                })?;
                runtime_inputs.push(tensor.into_dyn());
            }
            "token_type_ids" => {
                runtime_inputs.push(Array::from_elem((1, seq_len), 0_i64).into_dyn());
            }
            other => {
                return Err(OracleError::Inference(format!(
                    "unsupported model input '{other}'"
                )))
            }
        }
    }

    let outputs = session_ref
        .run::<i64, f32, _>(runtime_inputs)
        .map_err(|e| OracleError::Inference(e.to_string()))?;
    let logits = outputs
        .into_iter()
        .next()
        .ok_or_else(|| OracleError::Inference("model returned no outputs".into()))?;

    let shape = logits.shape().to_vec();
    if shape.len() != 3 || shape[0] != 1 || shape[1] != seq_len {
        return Err(OracleError::Inference(format!(
            "unexpected logits shape {shape:?} for sequence length {seq_len}"
        )));
    }
    let vocab = shape[2];
    let row: Vec<f32> = logits
        .iter()
        .skip(mask_index * vocab)
        .take(vocab)
        .copied()
        .collect();
    if row.len() != vocab {
        return Err(OracleError::Inference("mask row out of range".into()));
    }
    Ok(row)
}

/// Numerically stable softmax.
pub(crate) fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits
        .iter()
        .copied()
        .filter(|x| x.is_finite())
        .fold(f32::NEG_INFINITY, f32::max);
    if !max.is_finite() {
        return vec![0.0; logits.len()];
    }
    let exps: Vec<f32> = logits
        .iter()
        .map(|&x| if x.is_finite() { (x - max).exp() } else { 0.0 })
        .collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
