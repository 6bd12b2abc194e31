//! Review through a locally installed CLI tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use relay_core::{RelayError, ReviewConfig};
use tempfile::NamedTempFile;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use crate::review::ReviewStrategy;

/// Runs an external review CLI with the prompt as its final argument.
///
/// Prompts larger than `max_arg_bytes` are staged in a temporary file that
/// is piped to the tool's stdin, and `-` is passed instead of the prompt.
/// The temporary file is removed when the call returns, whatever the outcome.
///
/// # Examples
///
/// ```
/// use relay_invoke::cli::CliReviewer;
/// use std::time::Duration;
///
/// let reviewer = CliReviewer::new("codex")
///     .with_args(["exec"])
///     .with_timeout(Duration::from_secs(60));
/// assert_eq!(reviewer.program(), "codex");
/// ```
#[derive(Debug, Clone)]
pub struct CliReviewer {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    max_output_bytes: usize,
    max_arg_bytes: usize,
    staging_dir: Option<PathBuf>,
}

impl CliReviewer {
    /// Reviewer for `program` with default bounds: 120 s, 10 MiB output,
    /// 100 KiB inline prompt.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: Duration::from_secs(120),
            max_output_bytes: 10 * 1024 * 1024,
            max_arg_bytes: 100 * 1024,
            staging_dir: None,
        }
    }

    /// Build from the `[review]` section of the config.
    pub fn from_config(config: &ReviewConfig) -> Self {
        Self::new(config.program.clone())
            .with_args(config.args.iter().cloned())
            .with_timeout(Duration::from_secs(config.cli_timeout_secs))
            .with_max_output_bytes(config.max_output_bytes)
            .with_max_arg_bytes(config.max_arg_bytes)
    }

    /// Arguments placed before the prompt.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Wall-clock bound for one run.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Largest stdout accepted before the run counts as failed.
    pub fn with_max_output_bytes(mut self, bytes: usize) -> Self {
        self.max_output_bytes = bytes;
        self
    }

    /// Prompts above this size go through a staged temp file.
    pub fn with_max_arg_bytes(mut self, bytes: usize) -> Self {
        self.max_arg_bytes = bytes;
        self
    }

    /// Directory for staged prompts instead of the system temp dir.
    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    /// Executable name.
    pub fn program(&self) -> &str {
        &self.program
    }

    async fn run(&self, prompt: &str) -> Result<String, RelayError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Held until the function returns so the file outlives the child.
        let _staged = if prompt.len() > self.max_arg_bytes {
            let staged = stage_prompt(prompt, self.staging_dir.as_deref())?;
            cmd.stdin(Stdio::from(staged.reopen()?)).arg("-");
            tracing::debug!(bytes = prompt.len(), path = %staged.path().display(), "staged prompt");
            Some(staged)
        } else {
            cmd.stdin(Stdio::null()).arg(prompt);
            None
        };

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RelayError::SubprocessUnavailable {
                    program: self.program.clone(),
                }
            } else {
                RelayError::Subprocess(format!("failed to start {}: {e}", self.program))
            }
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RelayError::Subprocess("stdout was not captured".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| RelayError::Subprocess("stderr was not captured".into()))?;

        let limit = self.max_output_bytes;
        let collected = tokio::time::timeout(self.timeout, async {
            tokio::try_join!(
                read_capped(stdout, limit),
                read_capped(stderr, limit),
                child.wait(),
            )
        })
        .await;

        let (stdout, stderr, status) = match collected {
            Err(_) => {
                let _ = child.kill().await;
                return Err(RelayError::Subprocess(format!(
                    "{} timed out after {}s",
                    self.program,
                    self.timeout.as_secs()
                )));
            }
            Ok(Err(e)) => {
                let _ = child.kill().await;
                return Err(RelayError::Subprocess(format!(
                    "reading output of {}: {e}",
                    self.program
                )));
            }
            Ok(Ok(collected)) => collected,
        };

        let (out, overflowed) = stdout;
        if overflowed {
            return Err(RelayError::Subprocess(format!(
                "{} produced more than {limit} bytes of output",
                self.program
            )));
        }
        if !status.success() {
            let (err, _) = stderr;
            return Err(RelayError::Subprocess(format!(
                "{} exited with {status}: {}",
                self.program,
                String::from_utf8_lossy(&err).trim()
            )));
        }

        tracing::debug!(program = %self.program, bytes = out.len(), "review tool finished");
        let text = String::from_utf8_lossy(&out).into_owned();
        if text.trim().is_empty() {
            return Err(RelayError::Subprocess(format!(
                "{} produced no output",
                self.program
            )));
        }
        Ok(text)
    }
}

#[async_trait]
impl ReviewStrategy for CliReviewer {
    fn name(&self) -> &str {
        &self.program
    }

    async fn review(&self, prompt: &str) -> Result<String, RelayError> {
        self.run(prompt).await
    }
}

fn stage_prompt(prompt: &str, dir: Option<&Path>) -> Result<NamedTempFile, RelayError> {
    let mut file = match dir {
        Some(dir) => NamedTempFile::new_in(dir)?,
        None => NamedTempFile::new()?,
    };
    file.write_all(prompt.as_bytes())?;
    file.flush()?;
    Ok(file)
}

/// Read to EOF, keeping at most `cap` bytes. The flag reports whether more
/// was produced. Draining continues past the cap so the child never blocks
/// on a full pipe.
async fn read_capped<R: AsyncRead + Unpin>(
    mut reader: R,
    cap: usize,
) -> std::io::Result<(Vec<u8>, bool)> {
    let mut kept = Vec::new();
    let mut chunk = [0u8; 8192];
    let mut overflowed = false;
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        let room = cap.saturating_sub(kept.len());
        kept.extend_from_slice(&chunk[..n.min(room)]);
        if n > room {
            overflowed = true;
        }
    }
    Ok((kept, overflowed))
}
