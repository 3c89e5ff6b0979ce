// Best-effort structured extraction from model output
//
// Generation models asked for JSON routinely wrap it in prose or code
// fences, use typographic quotes, leave trailing commas, or break strings
// across lines. All of that fragility is contained here: callers get an
// Option and substitute defaults on None, they never see a parse error.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;

// Greedy match from the first brace to the last: tolerates prose and code
// fences on either side of the object.
static BRACE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[\s\S]*\}").expect("brace regex is valid"));
static TRAILING_COMMA_OBJ: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",\s*\}").expect("regex is valid"));
static TRAILING_COMMA_ARR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",\s*\]").expect("regex is valid"));

/// Locate and parse the brace-delimited JSON object embedded in `raw`.
/// Returns None when no object is present or repair fails; never panics.
pub fn extract_json(raw: &str) -> Option<Value> {
    let candidate = BRACE_BLOCK.find(raw)?.as_str();

    // Fast path: well-formed output needs no repair
    if let Ok(value) = serde_json::from_str::<Value>(candidate) {
        return Some(value);
    }

    let cleaned = normalize(candidate);
    match serde_json::from_str::<Value>(&cleaned) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("JSON repair failed: {}", e);
            None
        }
    }
}

/// Extract and deserialize into a caller type. Field-level tolerance is the
/// caller's job (serde defaults); this only handles locating and repairing
/// the object itself.
pub fn extract_into<T: DeserializeOwned>(raw: &str) -> Option<T> {
    let value = extract_json(raw)?;
    match serde_json::from_value::<T>(value) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::warn!("extracted JSON did not match expected shape: {}", e);
            None
        }
    }
}

/// Normalize the malformations observed in practice: literal line breaks
/// and tabs inside strings, trailing commas, smart quotes.
fn normalize(candidate: &str) -> String {
    let mut cleaned = candidate
        .replace("\r\n", " ")
        .replace(['\n', '\r', '\t'], " ");
    cleaned = TRAILING_COMMA_OBJ.replace_all(&cleaned, "}").into_owned();
    cleaned = TRAILING_COMMA_ARR.replace_all(&cleaned, "]").into_owned();
    cleaned
        .replace(['\u{201c}', '\u{201d}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
}
