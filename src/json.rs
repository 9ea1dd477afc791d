//! Canonical JSON output.

use anyhow::{Context, Result};
use serde::Serialize;

/// Serialize `value` as JCS (RFC 8785) canonical JSON.
///
/// Keys are sorted and numbers normalised, so the same report always
/// prints byte-for-byte the same.
///
/// ```rust
/// let json = savecheck::emit_jcs(&serde_json::json!({"b": 1, "a": [true]})).unwrap();
/// assert_eq!(json, r#"{"a":[true],"b":1}"#);
/// ```
pub fn emit_jcs<T: Serialize>(value: &T) -> Result<String> {
    let json_value =
        serde_json::to_value(value).with_context(|| "Failed to serialize value to JSON")?;
    let json_bytes = serde_json_canonicalizer::to_vec(&json_value)
        .with_context(|| "Failed to canonicalize JSON using JCS")?;
    String::from_utf8(json_bytes).with_context(|| "JCS output contained invalid UTF-8")
}
