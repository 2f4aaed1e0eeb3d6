//! Canonical JSON for timeline hashing.
//!
//! Compact output with object keys sorted at every depth, so the same
//! metadata always hashes to the same bytes regardless of insertion order.

use serde_json::Value;
use std::fmt::Write as _;

/// Render `value` as canonical JSON.
///
/// ```
/// use serde_json::json;
/// use galley_core::timeline::canonical::canonicalize_json;
///
/// let meta = json!({"decision": "accept", "fee": {"waived": false, "amount_minor": 120000}});
/// assert_eq!(
///     canonicalize_json(&meta),
///     r#"{"decision":"accept","fee":{"amount_minor":120000,"waived":false}}"#
/// );
/// ```
#[must_use]
pub fn canonicalize_json(value: &Value) -> String {
    let mut buf = String::new();
    write_canonical(value, &mut buf);
    buf
}

fn write_canonical(value: &Value, buf: &mut String) {
    match value {
        Value::Array(items) => {
            buf.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    buf.push(',');
                }
                write_canonical(item, buf);
            }
            buf.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();

            buf.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    buf.push(',');
                }
                write_string(key, buf);
                buf.push(':');
                if let Some(val) = map.get(key) {
                    write_canonical(val, buf);
                }
            }
            buf.push('}');
        }
        Value::String(s) => write_string(s, buf),
        // Scalars already render compactly.
        scalar => {
            let _ = write!(buf, "{scalar}");
        }
    }
}

fn write_string(s: &str, buf: &mut String) {
    let _ = write!(buf, "{}", Value::from(s));
}
