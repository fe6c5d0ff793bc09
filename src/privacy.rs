//! Aadhaar number masking.

use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde_json::Value;

const AADHAAR_DIGITS: usize = 12;

static DIGIT_RUN: OnceLock<Regex> = OnceLock::new();

/// A maximal run of ASCII digits, optionally separated by a single space,
/// tab, newline or hyphen, bounded by non-word characters.
fn digit_run() -> &'static Regex {
    DIGIT_RUN.get_or_init(|| {
        Regex::new(r"\b[0-9](?:[ \t\n-]?[0-9])*\b").expect("digit run pattern is valid")
    })
}

/// Replaces every 12-digit run with `XXXX-XXXX-<last 4>`. Other text,
/// including shorter or longer digit runs, is left untouched.
pub fn mask_aadhaar(text: &str) -> String {
    digit_run()
        .replace_all(text, |caps: &Captures| {
            let matched = &caps[0];
            let digits: String = matched.chars().filter(|c| c.is_ascii_digit()).collect();
            if digits.len() == AADHAAR_DIGITS {
                format!("XXXX-XXXX-{}", &digits[AADHAAR_DIGITS - 4..])
            } else {
                matched.to_string()
            }
        })
        .into_owned()
}

/// Applies [`mask_aadhaar`] to every string inside a JSON value.
pub fn mask_value(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(mask_aadhaar(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(mask_value).collect()),
        Value::Object(map) => Value::Object(map.into_iter().map(|(k, v)| (k, mask_value(v))).collect()),
        other => other,
    }
}
