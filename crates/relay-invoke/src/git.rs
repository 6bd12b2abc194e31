use std::path::Path;
use std::process::Command;

/// Collect a diff for review from the repository at `repo_root`.
///
/// Prefers the staged diff; when that is empty, uses the unstaged diff.
/// Returns `None` when both are empty or git fails (not a repository, git
/// not installed). A failing git is never fatal to the review.
pub fn collect_diff(repo_root: &Path) -> Option<String> {
    let staged = run_git(repo_root, &["diff", "--cached"])?;
    if !staged.trim().is_empty() {
        return Some(staged);
    }
    let unstaged = run_git(repo_root, &["diff"])?;
    (!unstaged.trim().is_empty()).then_some(unstaged)
}

fn run_git(repo_root: &Path, args: &[&str]) -> Option<String> {
    let output = match Command::new("git")
        .arg("-C")
        .arg(repo_root)
        .args(args)
        .output()
    {
        Ok(output) => output,
        Err(e) => {
            tracing::debug!(error = %e, "git could not be started");
            return None;
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::debug!(?args, stderr = %stderr.trim(), "git diff failed");
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_repository_yields_no_diff() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("not-a-dir");
        assert_eq!(collect_diff(&missing), None);
    }

    #[test]
    fn clean_repository_yields_no_diff() {
        let dir = tempfile::tempdir().unwrap();
        let init = Command::new("git").arg("init").arg(dir.path()).output();
        let Ok(init) = init else { return };
        if !init.status.success() {
            return;
        }
        assert_eq!(collect_diff(dir.path()), None);
    }
}
