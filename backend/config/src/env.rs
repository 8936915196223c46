//! Environment variable handling for config values.
//!
//! Two mechanisms:
//! - `${VAR_NAME}` substitution inside string values of the config file,
//!   resolved at load time. Only uppercase `[A-Z_][A-Z0-9_]*` names are
//!   matched, and `$${VAR}` escapes to a literal `${VAR}`.
//! - Direct overrides (`ATLAS_PORT`, `OPENAI_API_KEY`, ...) applied on top of
//!   the file.

use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

use crate::schema::AtlasConfig;

/// Matches `${VAR}` and its escaped form `$${VAR}`.
static ENV_VAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\$?)\$\{([A-Z_][A-Z0-9_]*)\}").unwrap());

/// Config path whose unresolved reference means "no credential" rather than
/// a load failure. A missing key fails individual chat requests only.
const CREDENTIAL_PATH: &str = "provider.apiKey";

/// Error returned for missing env vars.
#[derive(Debug, thiserror::Error)]
#[error("Missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Snapshot of the process environment.
pub fn process_env() -> HashMap<String, String> {
    std::env::vars().collect()
}

/// Substitute `${VAR}` references in a config JSON value tree.
///
/// Only string leaves are processed. Fails if any referenced var is unset or
/// empty, except at `provider.apiKey`, which is dropped with a warning.
pub fn resolve_env_vars(value: &Value, env: &HashMap<String, String>) -> Result<Value> {
    substitute_value(value, env, "")
}

fn substitute_value(value: &Value, env: &HashMap<String, String>, path: &str) -> Result<Value> {
    match value {
        Value::String(s) => Ok(Value::String(substitute_string(s, env, path)?)),
        Value::Array(arr) => {
            let result: Result<Vec<_>> = arr
                .iter()
                .enumerate()
                .map(|(i, v)| substitute_value(v, env, &format!("{path}[{i}]")))
                .collect();
            Ok(Value::Array(result?))
        }
        Value::Object(map) => {
            let mut result = serde_json::Map::new();
            for (k, v) in map {
                let child_path = if path.is_empty() {
                    k.clone()
                } else {
                    format!("{path}.{k}")
                };
                match substitute_value(v, env, &child_path) {
                    Ok(resolved) => {
                        result.insert(k.clone(), resolved);
                    }
                    Err(e) if child_path == CREDENTIAL_PATH => {
                        warn!(
                            path = %child_path,
                            error = %e,
                            "Treating unresolved credential as absent"
                        );
                    }
                    Err(e) => return Err(e),
                }
            }
            Ok(Value::Object(result))
        }
        other => Ok(other.clone()),
    }
}

fn substitute_string(s: &str, env: &HashMap<String, String>, path: &str) -> Result<String> {
    if !s.contains('$') {
        return Ok(s.to_string());
    }

    let mut missing: Option<MissingEnvVarError> = None;
    let substituted = ENV_VAR_PATTERN.replace_all(s, |caps: &regex::Captures| {
        let var_name = &caps[2];
        if !caps[1].is_empty() {
            return format!("${{{var_name}}}");
        }
        match env.get(var_name) {
            Some(val) if !val.is_empty() => val.clone(),
            _ => {
                missing.get_or_insert_with(|| MissingEnvVarError {
                    var_name: var_name.to_string(),
                    config_path: path.to_string(),
                });
                String::new()
            }
        }
    });

    if let Some(err) = missing {
        bail!(err);
    }
    Ok(substituted.into_owned())
}

/// Apply direct environment overrides on top of a loaded config.
pub fn apply_env_overrides(mut config: AtlasConfig, env: &HashMap<String, String>) -> AtlasConfig {
    let get = |key: &str| env.get(key).filter(|v| !v.trim().is_empty());

    if let Some(bind) = get("ATLAS_BIND") {
        config.server.bind_address = bind.clone();
    }
    if let Some(port) = get("ATLAS_PORT") {
        match port.parse() {
            Ok(port) => config.server.port = port,
            Err(_) => warn!(value = %port, "Ignoring unparseable ATLAS_PORT"),
        }
    }
    if let Some(key) = get("OPENAI_API_KEY") {
        config.provider.api_key = Some(key.clone());
    }
    if let Some(url) = get("OPENAI_BASE_URL") {
        config.provider.base_url = url.clone();
    }
    if let Some(model) = get("ATLAS_MODEL") {
        config.provider.model = model.clone();
    }
    if let Some(window) = get("ATLAS_HISTORY_WINDOW") {
        match window.parse() {
            Ok(window) => config.chat.history_window = window,
            Err(_) => warn!(value = %window, "Ignoring unparseable ATLAS_HISTORY_WINDOW"),
        }
    }
    if let Some(url) = get("ATLAS_SERVER_URL") {
        config.chat.server_url = url.clone();
    }
    if let Some(dir) = get("ATLAS_LOG_DIR") {
        config.logging.dir = Some(dir.clone());
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn substitutes_simple_var() {
        let v = json!({"provider": {"apiKey": "${OPENAI_API_KEY}"}});
        let result = resolve_env_vars(&v, &env(&[("OPENAI_API_KEY", "sk-abc123")])).unwrap();
        assert_eq!(result["provider"]["apiKey"], "sk-abc123");
    }

    #[test]
    fn error_on_missing_var() {
        let v = json!({"provider": {"apiKey": "${MISSING_VAR}"}});
        let err = resolve_env_vars(&v, &HashMap::new()).unwrap_err().to_string();
        assert!(err.contains("MISSING_VAR"));
        assert!(err.contains("provider.apiKey"));
    }

    #[test]
    fn unresolved_credential_is_dropped() {
        let v = json!({"provider": {"apiKey": "${OPENAI_API_KEY}", "model": "gpt-4o"}});
        let result = resolve_env_vars(&v, &HashMap::new()).unwrap();
        assert!(result["provider"].get("apiKey").is_none());
        assert_eq!(result["provider"]["model"], "gpt-4o");
    }

    #[test]
    fn escaped_reference_is_literal() {
        let v = json!({"note": "cost is $${PRICE} today"});
        let result = resolve_env_vars(&v, &HashMap::new()).unwrap();
        assert_eq!(result["note"], "cost is ${PRICE} today");
    }

    #[test]
    fn substitutes_inside_text_and_arrays() {
        let v = json!({"urls": ["http://${HOST}:8080/v1"]});
        let result = resolve_env_vars(&v, &env(&[("HOST", "llm.internal")])).unwrap();
        assert_eq!(result["urls"][0], "http://llm.internal:8080/v1");
    }

    #[test]
    fn overrides_apply_on_top() {
        let config = apply_env_overrides(
            AtlasConfig::default(),
            &env(&[
                ("ATLAS_PORT", "9001"),
                ("OPENAI_API_KEY", "sk-env"),
                ("ATLAS_HISTORY_WINDOW", "10"),
                ("ATLAS_MODEL", ""),
            ]),
        );
        assert_eq!(config.server.port, 9001);
        assert_eq!(config.provider.api_key.as_deref(), Some("sk-env"));
        assert_eq!(config.chat.history_window, 10);
        assert_eq!(config.provider.model, crate::defaults::DEFAULT_MODEL);
    }

    #[test]
    fn unparseable_override_is_ignored() {
        let config = apply_env_overrides(AtlasConfig::default(), &env(&[("ATLAS_PORT", "http")]));
        assert_eq!(config.server.port, crate::defaults::DEFAULT_PORT);
    }
}
