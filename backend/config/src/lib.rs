//! `atlas-config`: Atlas runtime configuration management.
//!
//! Provides:
//! - Typed config schema (server, provider, chat, logging)
//! - YAML loading
//! - `${ENV_VAR}` substitution and direct env overrides
//! - Config redaction for safe logging/display
//! - Validation

pub mod defaults;
pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod validation;

// Re-export most-used types at crate root.
pub use env::{apply_env_overrides, process_env, resolve_env_vars, MissingEnvVarError};
pub use io::{config_dir, config_file_path, load_config, load_raw_config};
pub use redact::redact;
pub use schema::{AtlasConfig, ChatConfig, LoggingConfig, ProviderConfig, ServerConfig};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::path::Path;

/// Load, substitute env vars, apply env overrides, and validate.
///
/// This is the main entry point for loading a config at runtime. Validation
/// errors fail the load; warnings are logged.
pub async fn load_and_prepare(path: &Path, env: &HashMap<String, String>) -> Result<AtlasConfig> {
    let raw = load_raw_config(path).await?;

    let value = resolve_env_vars(&raw, env).context("Failed to resolve env vars in config")?;

    let config: AtlasConfig =
        serde_json::from_value(value).context("Failed to deserialize config after processing")?;

    let config = apply_env_overrides(config, env);

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }
    if !report.is_valid() {
        bail!("Invalid configuration: {}", report.errors[0]);
    }

    Ok(config)
}
