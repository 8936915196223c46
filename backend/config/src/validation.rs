//! Config validation with user-friendly error messages.

use crate::defaults::MAX_HISTORY_WINDOW;
use crate::schema::AtlasConfig;
use thiserror::Error;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &AtlasConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_server(config, &mut report);
    validate_provider(config, &mut report);
    validate_chat(config, &mut report);
    validate_logging(config, &mut report);
    report
}

fn validate_server(config: &AtlasConfig, report: &mut ValidationReport) {
    if config.server.port == 0 {
        report.error("server.port", "Port must be non-zero");
    }
    if config.server.bind_address.trim().is_empty() {
        report.error("server.bindAddress", "Bind address cannot be empty");
    }
}

fn validate_provider(config: &AtlasConfig, report: &mut ValidationReport) {
    let provider = &config.provider;
    if !provider.base_url.starts_with("http://") && !provider.base_url.starts_with("https://") {
        report.error("provider.baseUrl", "Base URL must start with http:// or https://");
    }
    if provider.model.trim().is_empty() {
        report.error("provider.model", "Model cannot be empty");
    }
    if provider.connect_timeout_secs == 0 {
        report.error("provider.connectTimeoutSecs", "Connect timeout must be at least 1 second");
    }
    if provider.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
        report.warn(
            "provider.apiKey",
            "No API key configured; chat requests will fail until OPENAI_API_KEY is set",
        );
    }
}

fn validate_chat(config: &AtlasConfig, report: &mut ValidationReport) {
    let window = config.chat.history_window;
    if window == 0 {
        report.warn("chat.historyWindow", "History window is 0; requests carry no prior context");
    } else if window > MAX_HISTORY_WINDOW {
        report.error(
            "chat.historyWindow",
            format!("History window must be at most {MAX_HISTORY_WINDOW}"),
        );
    }
}

fn validate_logging(config: &AtlasConfig, report: &mut ValidationReport) {
    if config.logging.level.trim().is_empty() {
        report.error("logging.level", "Log level cannot be empty");
    }
}
