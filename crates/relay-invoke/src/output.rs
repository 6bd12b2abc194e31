//! Routing of final content to a file or stdout, with status on stderr.
//!
//! Payloads only ever go to the primary writer or the destination file.
//! Everything human-readable goes to the diagnostic writer, so callers can
//! parse stdout as data.

use std::io::Write;
use std::path::Path;

use relay_core::{RelayError, ReviewResult};

/// Write `content` to `destination` (overwriting) or to `out`.
///
/// When a file is written, a confirmation line goes to `diag`.
///
/// # Errors
///
/// Returns [`RelayError::Io`] if the file or either stream cannot be written.
pub fn write_content<W: Write, E: Write>(
    content: &str,
    destination: Option<&Path>,
    out: &mut W,
    diag: &mut E,
) -> Result<(), RelayError> {
    match destination {
        Some(path) => {
            std::fs::write(path, content)?;
            writeln!(diag, "Wrote {}", path.display())?;
        }
        None => {
            out.write_all(content.as_bytes())?;
            if !content.ends_with('\n') {
                out.write_all(b"\n")?;
            }
            out.flush()?;
        }
    }
    Ok(())
}

/// Route generated text and emit a one-line summary.
///
/// # Errors
///
/// Returns [`RelayError::Io`] on write failure.
pub fn emit_generation<W: Write, E: Write>(
    text: &str,
    model: &str,
    destination: Option<&Path>,
    out: &mut W,
    diag: &mut E,
) -> Result<(), RelayError> {
    write_content(text, destination, out, diag)?;
    writeln!(
        diag,
        "Generated {} characters with {model}",
        text.chars().count()
    )?;
    Ok(())
}

/// Route a review result as pretty JSON, then report it on `diag`.
///
/// # Errors
///
/// Returns [`RelayError::Serialization`] or [`RelayError::Io`].
pub fn emit_review<W: Write, E: Write>(
    result: &ReviewResult,
    destination: Option<&Path>,
    out: &mut W,
    diag: &mut E,
) -> Result<(), RelayError> {
    let json = serde_json::to_string_pretty(result)?;
    write_content(&json, destination, out, diag)?;
    for line in review_report(result) {
        writeln!(diag, "{line}")?;
    }
    Ok(())
}

/// Human-readable lines for a review: a summary, then one line per issue.
///
/// # Examples
///
/// ```
/// use relay_core::ReviewResult;
/// use relay_invoke::output::review_report;
///
/// let result = ReviewResult {
///     ok: true,
///     summary: "All good".into(),
///     issues: vec![],
///     passed_checks: vec![],
/// };
/// assert_eq!(review_report(&result), vec!["\u{2714} Review passed: All good (0 issues)"]);
/// ```
pub fn review_report(result: &ReviewResult) -> Vec<String> {
    let (mark, verdict) = if result.ok {
        ("\u{2714}", "passed")
    } else {
        ("\u{2716}", "failed")
    };
    let noun = if result.issues.len() == 1 {
        "issue"
    } else {
        "issues"
    };
    let mut lines = vec![format!(
        "{mark} Review {verdict}: {} ({} {noun})",
        result.summary,
        result.issues.len()
    )];
    for issue in &result.issues {
        let location = match issue.line {
            Some(line) => format!("{}:{line}", issue.file),
            None => issue.file.clone(),
        };
        lines.push(format!(
            "  {} [{}] {location}: {}",
            issue.severity.marker(),
            issue.severity,
            issue.message
        ));
    }
    lines
}
