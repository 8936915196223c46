//! Structured logging components for Atlas.
//!
//! Console plus optional rolling JSON file output, and secret redaction for
//! values that end up in log fields.

pub mod logger;
pub mod redact;

pub use logger::init_logger;
pub use redact::redact_sensitive_data;
