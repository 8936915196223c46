//! Config redaction: produce safe-to-share config snapshots by masking secrets.

use serde_json::Value;

/// Field names (case-insensitive) whose string values are masked.
const SECRET_FIELDS: [&str; 5] = ["apikey", "api_key", "token", "secret", "password"];

/// Copy of `value` with every secret field masked.
///
/// Safe to log or print from `atlas config`.
pub fn redact(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(field, inner)| {
                    let masked = match inner {
                        Value::String(secret) if is_secret_field(field) => mask(secret),
                        other => redact(other),
                    };
                    (field.clone(), masked)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact).collect()),
        other => other.clone(),
    }
}

fn is_secret_field(field: &str) -> bool {
    SECRET_FIELDS.iter().any(|name| name.eq_ignore_ascii_case(field))
}

/// Keep a four-character prefix of long secrets so keys stay recognisable.
fn mask(secret: &str) -> Value {
    let masked = match secret.chars().count() {
        0 => String::new(),
        1..=8 => "***".to_string(),
        _ => format!("{}***", secret.chars().take(4).collect::<String>()),
    };
    Value::String(masked)
}
