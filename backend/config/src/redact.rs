//! Redaction of credentials in config snapshots shown to the user.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Field names whose string values are always masked.
static SENSITIVE_KEYS: &[&str] = &[
    "apiKey",
    "api_key",
    "apikey",
    "key",
    "token",
    "accessToken",
    "access_token",
    "secret",
    "password",
];

/// Google API keys, wherever they appear.
static GOOGLE_KEY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"AIza[0-9A-Za-z_\-]{35}").unwrap());

/// Mask a secret, keeping a four character hint.
pub fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        return String::new();
    }
    if secret.chars().count() > 4 {
        format!("{}***", secret.chars().take(4).collect::<String>())
    } else {
        "***".to_string()
    }
}

/// Redact a JSON value tree, masking sensitive fields and embedded Google keys.
pub fn redact(value: &Value) -> Value {
    redact_recursive(value, "")
}

fn is_sensitive_key(key: &str) -> bool {
    SENSITIVE_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
}

fn redact_string(s: &str, key: &str) -> Value {
    if is_sensitive_key(key) {
        return Value::String(mask_secret(s));
    }
    if GOOGLE_KEY_PATTERN.is_match(s) {
        return Value::String(GOOGLE_KEY_PATTERN.replace_all(s, "AIza***").into_owned());
    }
    Value::String(s.to_string())
}

fn redact_recursive(value: &Value, key: &str) -> Value {
    match value {
        Value::String(s) => redact_string(s, key),
        Value::Array(arr) => Value::Array(arr.iter().map(|v| redact_recursive(v, key)).collect()),
        Value::Object(map) => {
            let mut result = serde_json::Map::new();
            for (k, v) in map {
                result.insert(k.clone(), redact_recursive(v, k));
            }
            Value::Object(result)
        }
        other => other.clone(),
    }
}
