use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::EnvFilter;

use relay_core::{Credential, InvocationRequest, RelayConfig};
use relay_invoke::context::{read_artifact, read_context, read_review_files};
use relay_invoke::llm::GenerationClient;
use relay_invoke::output::{emit_generation, emit_review};
use relay_invoke::prompt::build_review_content;
use relay_invoke::review::ReviewRunner;

#[derive(Parser)]
#[command(
    name = "relay",
    version,
    about = "Resilient invocation of AI generation and review providers",
    long_about = "Relay calls AI generation and code-review providers on behalf of automation\n\
                   workflows. Results go to stdout or --output; status goes to stderr.\n\n\
                   Examples:\n  \
                     relay generate --prompt task.md --context design.md api.md\n  \
                     relay generate --prompt task.md --output draft.md\n  \
                     relay review --files src/lib.rs src/main.rs\n  \
                     relay review --diff --output review.json"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (default: .relay.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Generate text from an instruction and optional context files
    #[command(long_about = "Generate text from an instruction and optional context files.\n\n\
        Context files are rendered under their base file names ahead of the instruction.\n\
        Rate-limited requests (HTTP 429) are retried up to 3 times, 15 seconds apart.\n\
        Requires ANTHROPIC_API_KEY (or the variable named by generation.api_key_env).\n\n\
        Examples:\n  relay generate --prompt task.md\n  relay generate --prompt task.md --context a.md b.md --output out.md")]
    Generate {
        /// File holding the instruction
        #[arg(long)]
        prompt: PathBuf,
        /// Context files, rendered in the order given
        #[arg(long, num_args = 1..)]
        context: Vec<PathBuf>,
        /// Write the result here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
        /// Model identifier (default: generation.model from config)
        #[arg(long)]
        model: Option<String>,
    },
    /// Review files and/or the working-tree diff
    #[command(long_about = "Review files and/or the working-tree diff.\n\n\
        Runs the configured review CLI first and falls back to the chat completions API\n\
        when the tool is missing or fails. The fallback needs OPENAI_API_KEY (or the\n\
        variable named by review.api_key_env). Exits 0 only when the review passes.\n\n\
        Examples:\n  relay review --files src/lib.rs\n  relay review --diff --output review.json")]
    Review {
        /// Files to review
        #[arg(long, num_args = 1..)]
        files: Vec<PathBuf>,
        /// Include the staged diff, or the unstaged diff when nothing is staged
        #[arg(long)]
        diff: bool,
        /// Write the result JSON here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
        /// Repository to collect the diff from
        #[arg(long, default_value = ".")]
        repo: PathBuf,
    },
    /// Create a default .relay.toml configuration file
    Init,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

const DEFAULT_CONFIG: &str = r#"# Relay Configuration

[generation]
# endpoint = "https://api.anthropic.com/v1/messages"
# model = "claude-sonnet-4-20250514"
# max_tokens = 4096
# api_key_env = "ANTHROPIC_API_KEY"
# max_attempts = 3
# retry_delay_secs = 15
# timeout_secs = 120

[review]
# program = "codex"
# args = ["exec"]
# cli_timeout_secs = 120
# endpoint = "https://api.openai.com/v1/chat/completions"
# model = "gpt-4o"
# api_key_env = "OPENAI_API_KEY"
"#;

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<RelayConfig> {
    match path {
        Some(path) => Ok(RelayConfig::from_file(path)?),
        None => {
            let default_path = Path::new(".relay.toml");
            if default_path.exists() {
                Ok(RelayConfig::from_file(default_path)?)
            } else {
                Ok(RelayConfig::default())
            }
        }
    }
}

fn spinner(message: &'static str) -> Result<Option<ProgressBar>> {
    if !std::io::stderr().is_terminal() {
        return Ok(None);
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})").into_diagnostic()?,
    );
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(120));
    Ok(Some(pb))
}

async fn run_generate(
    config: &RelayConfig,
    prompt: &Path,
    context: &[PathBuf],
    output: Option<&Path>,
    model: Option<String>,
) -> Result<()> {
    let instruction = read_artifact(prompt)?;
    let context = read_context(context)?;
    let request = InvocationRequest {
        instruction,
        context,
        model: model.unwrap_or_else(|| config.generation.model.clone()),
    };

    let credential = Credential::from_env(&config.generation.api_key_env);
    let client = GenerationClient::new(&config.generation, credential)?;

    let pb = spinner("Generating...")?;
    let result = client.generate(&request).await;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    let text = result?;

    emit_generation(
        &text,
        &request.model,
        output,
        &mut std::io::stdout().lock(),
        &mut std::io::stderr().lock(),
    )?;
    Ok(())
}

async fn run_review(
    config: &RelayConfig,
    files: &[PathBuf],
    diff: bool,
    output: Option<&Path>,
    repo: &Path,
) -> Result<i32> {
    let artifacts = read_review_files(files)?;
    let diff_text = if diff {
        let collected = relay_invoke::git::collect_diff(repo);
        if collected.is_none() {
            eprintln!("No diff found in {}; reviewing files only", repo.display());
        }
        collected
    } else {
        None
    };
    let content = build_review_content(&artifacts, diff_text.as_deref());

    let credential = Credential::from_env(&config.review.api_key_env);
    let runner = ReviewRunner::from_config(&config.review, credential)?;
    tracing::debug!(strategies = ?runner.strategy_names(), "review runner ready");

    let pb = spinner("Reviewing...")?;
    let result = runner.run(&content).await;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    let result = result?;

    emit_review(
        &result,
        output,
        &mut std::io::stdout().lock(),
        &mut std::io::stderr().lock(),
    )?;
    Ok(result.exit_code())
}

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))?;
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Generate {
            ref prompt,
            ref context,
            ref output,
            ref model,
        } => {
            run_generate(&config, prompt, context, output.as_deref(), model.clone()).await?;
        }
        Command::Review {
            ref files,
            diff,
            ref output,
            ref repo,
        } => {
            let code = run_review(&config, files, diff, output.as_deref(), repo).await?;
            if code != 0 {
                std::process::exit(code);
            }
        }
        Command::Init => {
            let path = Path::new(".relay.toml");
            if path.exists() {
                miette::bail!(".relay.toml already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            eprintln!("Created .relay.toml with default configuration");
        }
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "relay", &mut std::io::stdout());
        }
    }

    Ok(())
}
