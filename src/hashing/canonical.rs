//! Canonical JSON encoding
//!
//! Two structurally equal JSON values always encode to the same bytes:
//!
//! - object keys sorted by byte order, at every depth
//! - no whitespace between tokens
//! - a finite number with no fractional part and magnitude below 2^53 is
//!   written as an integer, so `25000` and `25000.0` encode identically
//! - any other number uses the shortest round-trip float form
//! - strings escape `"`, `\` and control characters only

use serde_json::{Number, Value};

/// Largest magnitude at which every integer is exactly representable as f64
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Encodes a JSON value canonically.
pub fn to_canonical_string(value: &Value) -> String {
    let mut out = String::with_capacity(128);
    write_value(&mut out, value);
    out
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(n) => write_number(out, n),
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => {
            // serde_json may be built with preserve_order; never rely on map order
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(out, key);
                out.push(':');
                write_value(out, item);
            }
            out.push('}');
        }
    }
}

/// Writes a number under the fixed formatting rule.
pub(crate) fn write_number(out: &mut String, n: &Number) {
    if let Some(i) = n.as_i64() {
        out.push_str(&i.to_string());
        return;
    }
    if let Some(u) = n.as_u64() {
        out.push_str(&u.to_string());
        return;
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < MAX_SAFE_INTEGER => {
            // Also folds -0.0 into 0
            out.push_str(&(f as i64).to_string());
        }
        _ => out.push_str(&n.to_string()),
    }
}

/// Renders a single f64 with the canonical number rule.
///
/// Non-finite values have no JSON form and render as `null`.
pub fn format_number(value: f64) -> String {
    match Number::from_f64(value) {
        Some(n) => {
            let mut out = String::new();
            write_number(&mut out, &n);
            out
        }
        None => "null".to_string(),
    }
}

fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}
