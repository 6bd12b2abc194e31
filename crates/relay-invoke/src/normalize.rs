//! Lenient extraction of a [`ReviewResult`] from tool output.
//!
//! Review tools often wrap the JSON they were asked for in prose or markdown
//! fences. Parsing tries the text as-is first, then falls back to the span
//! from the first `{` to the last `}`. Only structure is checked; severities
//! and other values are passed through as given.

use relay_core::{RelayError, ReviewResult};

/// Parse raw review output into a [`ReviewResult`].
///
/// # Errors
///
/// Returns [`RelayError::UnparsableResult`] when the output holds no `{...}`
/// span or the span does not decode as a review result.
///
/// # Examples
///
/// ```
/// use relay_invoke::normalize::parse_review_result;
///
/// let noisy = "Here you go:\n{\"ok\":true,\"summary\":\"clean\"}\nDone.";
/// let result = parse_review_result(noisy).unwrap();
/// assert!(result.ok);
/// ```
pub fn parse_review_result(raw: &str) -> Result<ReviewResult, RelayError> {
    let trimmed = raw.trim();
    if let Ok(result) = serde_json::from_str::<ReviewResult>(trimmed) {
        return Ok(result);
    }

    let span = extract_object(trimmed).ok_or_else(|| {
        RelayError::UnparsableResult(format!("no JSON object in output: {}", preview(trimmed)))
    })?;
    serde_json::from_str(span).map_err(|e| RelayError::UnparsableResult(e.to_string()))
}

/// The slice from the first `{` through the last `}`, if any.
pub fn extract_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn preview(text: &str) -> String {
    const LIMIT: usize = 120;
    match text.char_indices().nth(LIMIT) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
