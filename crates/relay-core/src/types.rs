use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// A named piece of input text: a context file or a file under review.
///
/// # Examples
///
/// ```
/// use relay_core::Artifact;
///
/// let artifact = Artifact::new("notes.md", "hello world");
/// assert_eq!(artifact.label, "notes.md");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Heading under which the body is rendered.
    pub label: String,
    /// Full text content.
    pub body: String,
}

impl Artifact {
    /// Create an artifact from a label and body.
    pub fn new(label: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            body: body.into(),
        }
    }
}

/// One generation call: instruction, ordered context, and model.
///
/// `context` order is kept exactly as supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationRequest {
    /// Primary instruction text.
    pub instruction: String,
    /// Context artifacts in caller order.
    pub context: Vec<Artifact>,
    /// Model identifier sent to the provider.
    pub model: String,
}

/// Issue severity reported by a reviewer.
///
/// `error`, `warning` and `info` are matched case-insensitively and always
/// serialize in lowercase. Unknown values are preserved verbatim so they
/// round-trip unchanged.
///
/// # Examples
///
/// ```
/// use relay_core::Severity;
///
/// let s: Severity = serde_json::from_str("\"error\"").unwrap();
/// assert_eq!(s, Severity::Error);
///
/// let odd: Severity = serde_json::from_str("\"critical\"").unwrap();
/// assert_eq!(serde_json::to_string(&odd).unwrap(), "\"critical\"");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Severity {
    /// Must be fixed.
    Error,
    /// Worth a look.
    Warning,
    /// Informational.
    Info,
    /// Any severity the reviewer invented.
    Other(String),
}

impl Severity {
    /// One-character marker used in diagnostic output.
    pub fn marker(&self) -> &'static str {
        match self {
            Severity::Error => "\u{2716}",
            Severity::Warning => "\u{26a0}",
            Severity::Info => "\u{2139}",
            Severity::Other(_) => "\u{2022}",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
            Severity::Other(s) => write!(f, "{s}"),
        }
    }
}

impl FromStr for Severity {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "error" => Severity::Error,
            "warning" => Severity::Warning,
            "info" => Severity::Info,
            _ => Severity::Other(s.to_string()),
        })
    }
}

impl From<String> for Severity {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(severity) => severity,
            Err(never) => match never {},
        }
    }
}

impl From<Severity> for String {
    fn from(s: Severity) -> Self {
        s.to_string()
    }
}

/// A single finding in a [`ReviewResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    /// Reported severity.
    pub severity: Severity,
    /// File the finding refers to.
    pub file: String,
    /// Line number, when the reviewer gave one.
    #[serde(default)]
    pub line: Option<u32>,
    /// Explanation of the problem.
    pub message: String,
    /// Suggested fix; empty when none was given or given as `null`.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub suggestion: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Normalized outcome of a code review.
///
/// This is the persisted/printed artifact, serialized with camelCase keys.
///
/// # Examples
///
/// ```
/// use relay_core::ReviewResult;
///
/// let result: ReviewResult = serde_json::from_str(
///     r#"{"ok":true,"summary":"clean","issues":[],"passedChecks":["types"]}"#,
/// ).unwrap();
/// assert_eq!(result.exit_code(), 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResult {
    /// Whether the reviewed content passed.
    pub ok: bool,
    /// One-line summary from the reviewer.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub summary: String,
    /// Findings, in reviewer order.
    #[serde(default)]
    pub issues: Vec<Issue>,
    /// Checks the content passed.
    #[serde(default)]
    pub passed_checks: Vec<String>,
}

impl ReviewResult {
    /// Process exit code for this result: 0 when `ok`, otherwise 1.
    pub fn exit_code(&self) -> i32 {
        if self.ok {
            0
        } else {
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_parses_case_insensitively() {
        assert_eq!("ERROR".parse::<Severity>().unwrap(), Severity::Error);
        assert_eq!("Warning".parse::<Severity>().unwrap(), Severity::Warning);
        assert_eq!("info".parse::<Severity>().unwrap(), Severity::Info);
        assert_eq!(
            "nit".parse::<Severity>().unwrap(),
            Severity::Other("nit".into())
        );
    }

    #[test]
    fn unknown_severity_keeps_original_spelling() {
        let issue: Issue = serde_json::from_str(
            r#"{"severity":"Critical","file":"a.ts","message":"x"}"#,
        )
        .unwrap();
        assert_eq!(issue.severity, Severity::Other("Critical".into()));
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["severity"], "Critical");
    }

    #[test]
    fn known_severity_is_lowercased_on_output() {
        let issue: Issue =
            serde_json::from_str(r#"{"severity":"Error","file":"a.rs","message":"x"}"#).unwrap();
        assert_eq!(issue.severity, Severity::Error);
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["severity"], "error");
    }

    #[test]
    fn null_suggestion_and_summary_read_as_empty() {
        let result: ReviewResult = serde_json::from_str(
            r#"{"ok":false,"summary":null,"issues":[{"severity":"warning","file":"a.rs","line":4,"message":"m","suggestion":null}]}"#,
        )
        .unwrap();
        assert!(result.summary.is_empty());
        assert!(result.issues[0].suggestion.is_empty());
        assert_eq!(result.issues[0].line, Some(4));
    }

    #[test]
    fn issue_defaults_optional_fields() {
        let issue: Issue =
            serde_json::from_str(r#"{"severity":"info","file":"a.rs","message":"m"}"#).unwrap();
        assert_eq!(issue.line, None);
        assert!(issue.suggestion.is_empty());
    }

    #[test]
    fn review_result_serializes_camel_case() {
        let result = ReviewResult {
            ok: true,
            summary: "fine".into(),
            issues: vec![],
            passed_checks: vec!["lint".into()],
        };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("passedChecks").is_some());
        assert!(json.get("passed_checks").is_none());
    }

    #[test]
    fn exit_code_follows_ok_flag() {
        let passing = ReviewResult {
            ok: true,
            summary: String::new(),
            issues: vec![],
            passed_checks: vec![],
        };
        assert_eq!(passing.exit_code(), 0);

        let failing = ReviewResult {
            ok: false,
            summary: "broken".into(),
            issues: vec![Issue {
                severity: Severity::Error,
                file: "src/lib.rs".into(),
                line: Some(3),
                message: "panics".into(),
                suggestion: String::new(),
            }],
            passed_checks: vec![],
        };
        assert_eq!(failing.exit_code(), 1);
    }

    #[test]
    fn review_result_requires_ok() {
        let parsed = serde_json::from_str::<ReviewResult>(r#"{"summary":"x"}"#);
        assert!(parsed.is_err());
    }
}
