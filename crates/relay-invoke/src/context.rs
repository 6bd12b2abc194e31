//! Artifact reading and prompt assembly.

use std::fmt::Write;
use std::path::{Path, PathBuf};

use relay_core::{Artifact, RelayError};

/// Read the full text of `path`.
///
/// # Errors
///
/// Returns [`RelayError::FileUnreadable`] if the file is missing or unreadable.
/// Callers must treat this as fatal rather than substituting empty text.
pub fn read_artifact(path: &Path) -> Result<String, RelayError> {
    std::fs::read_to_string(path).map_err(|source| RelayError::FileUnreadable {
        path: path.to_path_buf(),
        source,
    })
}

/// Read context files, labeling each by its base file name, in input order.
///
/// # Errors
///
/// Fails on the first unreadable path.
pub fn read_context(paths: &[PathBuf]) -> Result<Vec<Artifact>, RelayError> {
    paths
        .iter()
        .map(|path| {
            let label = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            Ok(Artifact::new(label, read_artifact(path)?))
        })
        .collect()
}

/// Read files for review, labeling each by the path as given.
///
/// # Errors
///
/// Fails on the first unreadable path.
pub fn read_review_files(paths: &[PathBuf]) -> Result<Vec<Artifact>, RelayError> {
    paths
        .iter()
        .map(|path| Ok(Artifact::new(path.display().to_string(), read_artifact(path)?)))
        .collect()
}

/// Combine an instruction with context artifacts into a single prompt.
///
/// With no artifacts the instruction is returned verbatim. Otherwise the
/// prompt is a `# Context` block with one `## <label>` section per artifact,
/// in order, followed by a `# Task` block holding the instruction.
///
/// # Examples
///
/// ```
/// use relay_core::Artifact;
/// use relay_invoke::context::assemble_prompt;
///
/// assert_eq!(assemble_prompt("Do it", &[]), "Do it");
///
/// let prompt = assemble_prompt("Do it", &[Artifact::new("design.md", "text")]);
/// assert!(prompt.starts_with("# Context"));
/// assert!(prompt.contains("## design.md"));
/// assert!(prompt.ends_with("# Task\n\nDo it"));
/// ```
pub fn assemble_prompt(instruction: &str, context: &[Artifact]) -> String {
    if context.is_empty() {
        return instruction.to_string();
    }

    let mut prompt = String::from("# Context\n");
    for artifact in context {
        let _ = write!(prompt, "\n## {}\n\n{}", artifact.label, artifact.body);
        if !artifact.body.ends_with('\n') {
            prompt.push('\n');
        }
    }
    let _ = write!(prompt, "\n# Task\n\n{instruction}");
    prompt
}
