//! On-disk files backing [`OnnxMaskedOracle`](crate::OnnxMaskedOracle).
//!
//! A masked LM export needs two files: the ONNX graph and a `tokenizers`
//! JSON file. The tokenizer lives next to the model unless configured
//! otherwise, matching the layout of a Hugging Face export directory.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::onnx::OnnxOracleConfig;
use crate::OracleError;

const TOKENIZER_FILE: &str = "tokenizer.json";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct ModelAssets {
    pub(crate) model_path: PathBuf,
    pub(crate) tokenizer_path: PathBuf,
}

impl ModelAssets {
    /// Where the oracle expects its files, before anything is fetched.
    pub(crate) fn planned(cfg: &OnnxOracleConfig) -> Self {
        let tokenizer_path = cfg.tokenizer_path.clone().unwrap_or_else(|| {
            cfg.model_path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(TOKENIZER_FILE)
        });
        Self {
            model_path: cfg.model_path.clone(),
            tokenizer_path,
        }
    }
}

/// Makes sure both files exist locally, fetching whichever is missing and has
/// a URL configured.
pub(crate) async fn resolve_model_assets(
    cfg: &OnnxOracleConfig,
) -> Result<ModelAssets, OracleError> {
    let assets = ModelAssets::planned(cfg);
    fetch_if_missing(&assets.model_path, cfg.model_url.as_deref(), "model").await?;
    fetch_if_missing(&assets.tokenizer_path, cfg.tokenizer_url.as_deref(), "tokenizer").await?;
    debug!(
        model = %assets.model_path.display(),
        tokenizer = %assets.tokenizer_path.display(),
        "oracle_assets_ready"
    );
    Ok(assets)
}

async fn fetch_if_missing(
    target: &Path,
    url: Option<&str>,
    kind: &str,
) -> Result<(), OracleError> {
    if tokio::fs::try_exists(target).await? {
        return Ok(());
    }
    let Some(url) = url else {
        return Err(OracleError::AssetMissing(format!(
            "{kind} at {}",
            target.display()
        )));
    };
    download(target, url).await
}

/// Streams into `<target>.part` and renames, so an interrupted download never
/// looks like a usable file.
async fn download(target: &Path, url: &str) -> Result<(), OracleError> {
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let response = reqwest::get(url)
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|e| OracleError::Download(format!("{url}: {e}")))?;
    let bytes = response
        .bytes()
        .await
        .map_err(|e| OracleError::Download(format!("{url}: {e}")))?;
    if bytes.is_empty() {
        return Err(OracleError::Download(format!("{url}: empty body")));
    }

    let partial = partial_path(target);
    tokio::fs::write(&partial, &bytes).await?;
    tokio::fs::rename(&partial, target).await?;
    info!(url, path = %target.display(), bytes = bytes.len(), "oracle_asset_downloaded");
    Ok(())
}

fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}
