//! Configuration types for resolved CLI arguments.
//!
//! Args structs (for CLI parsing) remain in cli.rs and the subcommand modules.

use crate::cli::{ModelArgs, ModelSource};
use eyre::Result;
use hf_hub::Cache;
use hf_hub::api::sync::Api;
use std::path::PathBuf;
use tdtops_asr::types::ModelRepo;

/// Resolved model configuration.
///
/// Converted from ModelArgs via TryFrom.
#[derive(Debug)]
pub struct ModelConfig {
    pub repo: ModelRepo,
}

impl TryFrom<ModelArgs> for ModelConfig {
    type Error = eyre::Error;

    fn try_from(args: ModelArgs) -> Result<Self> {
        let repo = match args.model_source {
            ModelSource::Auto => {
                let path = PathBuf::from(&args.model);
                if path.is_dir() {
                    ModelRepo::Path(path)
                } else {
                    ModelRepo::Api(Api::new()?.model(args.model))
                }
            }
            ModelSource::Path => ModelRepo::Path(PathBuf::from(args.model)),
            ModelSource::Cache => ModelRepo::Cache(Cache::from_env().model(args.model)),
            ModelSource::Api => ModelRepo::Api(Api::new()?.model(args.model)),
        };

        tracing::debug!(?repo, "resolved model repository");

        Ok(Self { repo })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_prefers_existing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let args = ModelArgs {
            model: dir.path().to_string_lossy().into_owned(),
            model_source: ModelSource::Auto,
        };

        let config = ModelConfig::try_from(args).unwrap();

        assert!(matches!(config.repo, ModelRepo::Path(path) if path == dir.path()));
    }

    #[test]
    fn explicit_path_is_not_checked() {
        let args = ModelArgs {
            model: "missing/model".to_string(),
            model_source: ModelSource::Path,
        };

        let config = ModelConfig::try_from(args).unwrap();

        assert!(matches!(config.repo, ModelRepo::Path(path) if path == PathBuf::from("missing/model")));
    }
}
