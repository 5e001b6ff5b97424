//! Locating the ONNX model and tokenizer for the configured model name.
//!
//! Assets live under `<models_dir>/<model_name>/` unless explicit paths are
//! configured, so switching `model_name` switches the files that get loaded.
//! Missing files are fetched from an explicit URL or, for models listed in
//! [`KNOWN_MODELS`](crate::KNOWN_MODELS) with `download_known_models` on, from
//! the model's hub repository.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::{EncoderConfig, SemanticError};

/// One asset: where it lives locally and where it may be fetched from.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AssetSource {
    pub(crate) path: PathBuf,
    pub(crate) url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AssetPlan {
    pub(crate) model: AssetSource,
    pub(crate) tokenizer: AssetSource,
}

impl AssetPlan {
    pub(crate) fn for_config(cfg: &EncoderConfig) -> Self {
        let model_dir = cfg.models_dir.join(&cfg.model_name);
        let hub_base = cfg
            .known_model()
            .filter(|_| cfg.download_known_models)
            .map(|known| {
                format!(
                    "{}/{}/resolve/main",
                    cfg.hub_base_url.trim_end_matches('/'),
                    known.repo
                )
            });

        let model = AssetSource {
            path: cfg
                .model_path
                .clone()
                .unwrap_or_else(|| model_dir.join("onnx").join("model.onnx")),
            url: cfg
                .model_url
                .clone()
                .or_else(|| hub_base.as_ref().map(|base| format!("{base}/onnx/model.onnx"))),
        };
        let tokenizer = AssetSource {
            path: cfg
                .tokenizer_path
                .clone()
                .unwrap_or_else(|| model_dir.join("tokenizer.json")),
            url: cfg
                .tokenizer_url
                .clone()
                .or_else(|| hub_base.map(|base| format!("{base}/tokenizer.json"))),
        };
        Self { model, tokenizer }
    }
}

/// Local paths ready to hand to ONNX Runtime and the tokenizer.
#[derive(Debug)]
pub(crate) struct ModelAssets {
    pub(crate) model_path: PathBuf,
    pub(crate) tokenizer_path: PathBuf,
}

pub(crate) async fn resolve_model_assets(cfg: &EncoderConfig) -> Result<ModelAssets, SemanticError> {
    let plan = AssetPlan::for_config(cfg);
    debug!(model = %cfg.model_name, ?plan, "resolving model assets");

    let model_path = fetch_if_missing(&plan.model).await?.ok_or_else(|| {
        SemanticError::ModelNotFound(format!(
            "{} (model '{}')",
            plan.model.path.display(),
            cfg.model_name
        ))
    })?;
    let tokenizer_path = fetch_if_missing(&plan.tokenizer).await?.ok_or_else(|| {
        SemanticError::TokenizerMissing(format!(
            "{} (model '{}')",
            plan.tokenizer.path.display(),
            cfg.model_name
        ))
    })?;

    Ok(ModelAssets {
        model_path,
        tokenizer_path,
    })
}

/// `Ok(None)` when the file is absent and there is nowhere to fetch it from.
async fn fetch_if_missing(source: &AssetSource) -> Result<Option<PathBuf>, SemanticError> {
    if source.path.is_file() {
        return Ok(Some(source.path.clone()));
    }
    match &source.url {
        Some(url) => {
            download(url, &source.path).await?;
            Ok(Some(source.path.clone()))
        }
        None => Ok(None),
    }
}

/// Downloads into a `.part` sibling and renames, so an interrupted fetch
/// never leaves a truncated model at the final path.
async fn download(url: &str, target: &Path) -> Result<(), SemanticError> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }

    info!(url, target = %target.display(), "downloading model asset");
    let response = reqwest::get(url)
        .await
        .map_err(|e| SemanticError::Download(format!("{url}: {e}")))?;
    let status = response.status();
    if !status.is_success() {
        return Err(SemanticError::Download(format!("{url}: HTTP {status}")));
    }
    let bytes = response
        .bytes()
        .await
        .map_err(|e| SemanticError::Download(format!("{url}: {e}")))?;

    let partial = partial_path(target);
    fs::write(&partial, &bytes)?;
    fs::rename(&partial, target)?;
    info!(target = %target.display(), bytes = bytes.len(), "model asset stored");
    Ok(())
}

fn partial_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("asset"));
    name.push(".part");
    target.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(model_name: &str) -> EncoderConfig {
        EncoderConfig {
            model_name: model_name.into(),
            models_dir: PathBuf::from("/srv/models"),
            ..EncoderConfig::default()
        }
    }

    #[test]
    fn paths_follow_model_name() {
        let plan = AssetPlan::for_config(&named("all-mpnet-base-v2"));
        assert_eq!(
            plan.model.path,
            PathBuf::from("/srv/models/all-mpnet-base-v2/onnx/model.onnx")
        );
        assert_eq!(
            plan.tokenizer.path,
            PathBuf::from("/srv/models/all-mpnet-base-v2/tokenizer.json")
        );
        assert!(plan.model.url.is_none());
    }

    #[test]
    fn known_model_gets_hub_urls_when_downloads_enabled() {
        let cfg = EncoderConfig {
            download_known_models: true,
            ..named("multi-qa-MiniLM-L6-cos-v1")
        };
        let plan = AssetPlan::for_config(&cfg);
        assert_eq!(
            plan.model.url.as_deref(),
            Some("https://huggingface.co/sentence-transformers/multi-qa-MiniLM-L6-cos-v1/resolve/main/onnx/model.onnx")
        );
        assert_eq!(
            plan.tokenizer.url.as_deref(),
            Some("https://huggingface.co/sentence-transformers/multi-qa-MiniLM-L6-cos-v1/resolve/main/tokenizer.json")
        );
    }

    #[test]
    fn unknown_model_has_no_implicit_url() {
        let cfg = EncoderConfig {
            download_known_models: true,
            ..named("in-house-encoder")
        };
        let plan = AssetPlan::for_config(&cfg);
        assert!(plan.model.url.is_none());
        assert!(plan.tokenizer.url.is_none());
    }

    #[test]
    fn explicit_locations_win() {
        let cfg = EncoderConfig {
            model_path: Some(PathBuf::from("/opt/m.onnx")),
            model_url: Some("https://mirror/m.onnx".into()),
            download_known_models: true,
            ..named("all-MiniLM-L6-v2")
        };
        let plan = AssetPlan::for_config(&cfg);
        assert_eq!(plan.model.path, PathBuf::from("/opt/m.onnx"));
        assert_eq!(plan.model.url.as_deref(), Some("https://mirror/m.onnx"));
        assert!(plan
            .tokenizer
            .url
            .as_deref()
            .is_some_and(|url| url.ends_with("all-MiniLM-L6-v2/resolve/main/tokenizer.json")));
    }

    #[test]
    fn partial_download_sits_next_to_target() {
        assert_eq!(
            partial_path(Path::new("/srv/models/x/onnx/model.onnx")),
            PathBuf::from("/srv/models/x/onnx/model.onnx.part")
        );
    }

    #[tokio::test]
    async fn missing_assets_without_urls_name_the_model() {
        let cfg = EncoderConfig {
            models_dir: PathBuf::from("./missing"),
            ..EncoderConfig::default()
        };
        let err = resolve_model_assets(&cfg).await.unwrap_err();
        match err {
            SemanticError::ModelNotFound(msg) => assert!(msg.contains("all-MiniLM-L6-v2")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
