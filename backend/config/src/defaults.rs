//! Default values for every config field.

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

pub const DEFAULT_PROVIDER_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Number of prior messages a client sends with each chat request.
pub const DEFAULT_HISTORY_WINDOW: usize = 6;

/// Upper bound accepted by validation for the history window.
pub const MAX_HISTORY_WINDOW: usize = 50;

pub const DEFAULT_LOG_LEVEL: &str = "info";
