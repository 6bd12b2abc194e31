use std::fmt::Write;
use std::path::Path;

use relay_core::Artifact;

const REVIEW_INSTRUCTIONS: &str = "\
You are a strict code reviewer. Review the code below for bugs, security \
issues, broken error handling, and significant maintainability problems.

Rules:
- Only report issues you are confident about
- Reference the file path exactly as labeled and a line number when you can
- Do not comment on formatting or naming unless it causes a defect
- Set \"ok\" to false if any issue has severity \"error\"

Respond with ONLY a JSON object, no prose and no markdown fences:
{
  \"ok\": true | false,
  \"summary\": \"One sentence describing the overall result\",
  \"issues\": [
    {
      \"severity\": \"error\" | \"warning\" | \"info\",
      \"file\": \"path/to/file\",
      \"line\": 42,
      \"message\": \"Clear explanation of the issue\",
      \"suggestion\": \"How to fix it\"
    }
  ],
  \"passedChecks\": [\"Short name of each check that passed\"]
}

If you find no issues, return \"ok\": true with an empty \"issues\" array.";

/// Build the full review prompt: fixed instructions followed by `content`.
///
/// # Examples
///
/// ```
/// use relay_invoke::prompt::build_review_prompt;
///
/// let prompt = build_review_prompt("### File: a.rs");
/// assert!(prompt.contains("passedChecks"));
/// assert!(prompt.ends_with("### File: a.rs"));
/// ```
pub fn build_review_prompt(content: &str) -> String {
    format!("{REVIEW_INSTRUCTIONS}\n\n---\n\n{content}")
}

/// Render files and an optional diff as labeled fenced blocks.
///
/// Files come first, in input order, then the diff.
///
/// # Examples
///
/// ```
/// use relay_core::Artifact;
/// use relay_invoke::prompt::build_review_content;
///
/// let content = build_review_content(&[Artifact::new("src/a.rs", "fn a() {}")], None);
/// assert!(content.contains("### File: src/a.rs"));
/// assert!(content.contains("```rs"));
/// ```
pub fn build_review_content(files: &[Artifact], diff: Option<&str>) -> String {
    let mut content = String::new();
    for file in files {
        let lang = fence_language(&file.label);
        let _ = write!(content, "### File: {}\n\n```{lang}\n{}", file.label, file.body);
        if !file.body.ends_with('\n') {
            content.push('\n');
        }
        content.push_str("```\n\n");
    }
    if let Some(diff) = diff {
        let _ = write!(content, "### Git Diff\n\n```diff\n{diff}");
        if !diff.ends_with('\n') {
            content.push('\n');
        }
        content.push_str("```\n");
    }
    content.trim_end().to_string()
}

fn fence_language(label: &str) -> &str {
    Path::new(label)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
}
