//! Canonical JSON serialization for deterministic body hashing.
//!
//! The canonical form is used only as hash input, never sent on the wire as
//! the authoritative body:
//! - object keys sorted at every depth (UTF-16 code unit order, which is what
//!   a JavaScript `Object.keys(..).sort()` signer produces)
//! - arrays kept in order
//! - no insignificant whitespace
//! - numbers rendered the way JavaScript's `Number#toString` renders them
//!   (`1.0` → `1`, `1e-6` → `0.000001`, `1e21` → `1e+21`), after rounding to
//!   binary64 as `JSON.parse` does, so integers beyond 2^53 lose precision
//!
//! Bodies with no content (`""`, `null`, `{}`, `[]`) all canonicalize to
//! [`EMPTY_BODY`].

use crate::SealgateError;
use serde_json::{Number, Value};

/// Canonical form of an empty or absent body.
pub const EMPTY_BODY: &str = "{}";

/// Serialize a JSON value with object keys sorted at every depth.
pub fn canonicalize(value: &Value) -> String {
    let mut out = String::new();
    write_value(value, &mut out);
    out
}

/// Canonicalize a parsed body, mapping content-free bodies to [`EMPTY_BODY`].
pub fn canonical_value(value: &Value) -> String {
    if is_empty_body(value) {
        EMPTY_BODY.to_string()
    } else {
        canonicalize(value)
    }
}

/// Canonicalize raw body bytes.
///
/// # Errors
/// * `MalformedBody` - non-empty body that is not JSON
pub fn canonical_body(body: &[u8]) -> Result<String, SealgateError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(EMPTY_BODY.to_string());
    }

    let value: Value =
        serde_json::from_slice(body).map_err(|e| SealgateError::MalformedBody(e.to_string()))?;

    Ok(canonical_value(&value))
}

fn is_empty_body(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => write_number(n, out),
        Value::String(s) => write_string(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.encode_utf16().cmp(b.encode_utf16()));

            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                write_value(item, out);
            }
            out.push('}');
        }
    }
}

fn write_number(n: &Number, out: &mut String) {
    match n.as_f64() {
        Some(f) if f.is_finite() => write_js_number(f, out),
        _ => out.push_str(&n.to_string()),
    }
}

/// ECMAScript `Number::toString(x)` for finite `x`.
fn write_js_number(x: f64, out: &mut String) {
    if x == 0.0 {
        out.push('0');
        return;
    }
    if x < 0.0 {
        out.push('-');
    }

    // `{:e}` yields the shortest round-tripping digits: "d.ddde<exp>".
    let sci = format!("{:e}", x.abs());
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let k = digits.len() as i32;
    // Decimal point position: value = 0.digits × 10^n.
    let n = exp.parse::<i32>().unwrap_or(0) + 1;

    if k <= n && n <= 21 {
        out.push_str(&digits);
        out.extend(std::iter::repeat('0').take((n - k) as usize));
    } else if 0 < n && n <= 21 {
        let (int, frac) = digits.split_at(n as usize);
        out.push_str(int);
        out.push('.');
        out.push_str(frac);
    } else if -6 < n && n <= 0 {
        out.push_str("0.");
        out.extend(std::iter::repeat('0').take((-n) as usize));
        out.push_str(&digits);
    } else {
        let (lead, rest) = digits.split_at(1);
        out.push_str(lead);
        if !rest.is_empty() {
            out.push('.');
            out.push_str(rest);
        }
        let e = n - 1;
        out.push('e');
        out.push(if e >= 0 { '+' } else { '-' });
        out.push_str(&e.abs().to_string());
    }
}

fn write_string(s: &str, out: &mut String) {
    // serde_json escapes exactly what JSON.stringify escapes for valid UTF-8.
    out.push_str(&Value::from(s).to_string());
}
