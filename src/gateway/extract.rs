//! JSON extraction from raw LLM responses.
//!
//! The inference service is not guaranteed to return pure JSON: responses may
//! be wrapped in markdown code fences or surrounded by prose. This strips the
//! fences and isolates the first balanced top-level object or array.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref CODE_FENCE: Regex = Regex::new(r"(?m)^```[A-Za-z]*[ \t]*\r?\n?").unwrap();
}

/// Extract the JSON payload from a raw response.
///
/// Returns the first balanced `{...}` or `[...]` substring after fence
/// stripping, or the trimmed input when no balanced candidate exists.
pub fn extract_json(response: &str) -> String {
    let stripped = CODE_FENCE.replace_all(response, "");
    if let Some(candidate) = first_balanced(&stripped) {
        return candidate.to_string();
    }
    stripped.trim().to_string()
}

/// Scan for the first `{` or `[` and return the slice up to its matching
/// closer. String literals are honored so braces inside them do not count.
fn first_balanced(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}
