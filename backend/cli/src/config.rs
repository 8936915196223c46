//! Runtime configuration loading for the CLI.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde_json::Value;

use atlas_config::{
    config_dir, config_file_path, load_and_prepare, process_env, redact, AtlasConfig,
};

/// Pick the config file: `--config`, then `ATLAS_CONFIG`, then the config dir.
pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    match std::env::var("ATLAS_CONFIG") {
        Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
        _ => config_file_path(&config_dir()),
    }
}

/// Load the effective configuration with environment overrides applied.
pub async fn load(explicit: Option<&Path>) -> Result<(PathBuf, AtlasConfig)> {
    let path = resolve_path(explicit);
    let config = load_and_prepare(&path, &process_env()).await?;
    Ok((path, config))
}

/// The effective configuration as JSON with secrets masked.
pub fn redacted_view(config: &AtlasConfig) -> Result<Value> {
    Ok(redact(&serde_json::to_value(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_wins() {
        let path = resolve_path(Some(Path::new("/tmp/atlas.yaml")));
        assert_eq!(path, PathBuf::from("/tmp/atlas.yaml"));
    }

    #[test]
    fn test_redacted_view_masks_key() {
        let mut config = AtlasConfig::default();
        config.provider.api_key = Some("sk-live-secret".into());
        let view = redacted_view(&config).unwrap();
        assert_ne!(view["provider"]["apiKey"], "sk-live-secret");
        assert_eq!(view["provider"]["model"], config.provider.model.as_str());
    }
}
