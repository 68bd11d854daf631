//! Vibe Executor - run a coding-agent CLI and stream its output.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vibe_executor::backend::ExecutionEnv;
use vibe_executor::config::ConfigLoader;
use vibe_executor::display;
use vibe_executor::process::ExitStatus;
use vibe_executor::stream::{Observer, OutputLine};
use vibe_executor::{Executor, ExecutorError};

#[derive(Parser)]
#[command(
    name = "vibe-executor",
    about = "Run a coding-agent CLI and stream its output",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Spawn the configured agent and stream its output.
    Run {
        #[command(flatten)]
        agent: AgentArgs,
        /// Print bare output lines without tags or timestamps.
        #[arg(long)]
        raw: bool,
    },
    /// Print the command that `run` would launch.
    ShowCommand {
        #[command(flatten)]
        agent: AgentArgs,
    },
}

#[derive(Args)]
struct AgentArgs {
    /// The prompt to send.
    prompt: String,
    /// Inline JSON configuration, e.g. '{"GEMINI": {"yolo": true}}'.
    #[arg(long, conflicts_with = "profile")]
    config: Option<String>,
    /// Profile file (.toml or .json) with [settings] and [agent.<KEY>].
    #[arg(long)]
    profile: Option<PathBuf>,
    /// Working directory for the agent.
    #[arg(long, default_value = ".")]
    cwd: PathBuf,
    /// Extra environment variable (KEY=VALUE); repeatable.
    #[arg(long = "env", value_parser = parse_env_pair)]
    env: Vec<(String, String)>,
}

impl AgentArgs {
    fn executor(&self) -> Result<Executor, ExecutorError> {
        if let Some(raw) = &self.config {
            return Ok(Executor::from_config(raw)?);
        }
        let profile = match &self.profile {
            Some(path) => ConfigLoader::load_from(path)?,
            None => ConfigLoader::new().load_required()?,
        };
        Ok(Executor::from_profile(profile))
    }

    fn execution_env(&self) -> ExecutionEnv {
        self.env.iter().cloned().collect()
    }
}

fn parse_env_pair(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Shell convention: the child's code, or 128 + signal.
fn process_exit_code(status: ExitStatus) -> i32 {
    match status {
        ExitStatus::Exited { code } => code,
        ExitStatus::Signaled { signal: Some(sig) } => 128 + sig,
        ExitStatus::Signaled { signal: None } => 1,
    }
}

async fn run(agent: &AgentArgs, raw: bool) -> Result<ExitStatus, ExecutorError> {
    let executor = agent.executor()?;
    let env = agent.execution_env();
    let spec = executor.command_for(&agent.cwd, &agent.prompt, &env);
    display::print_spawn(executor.backend(), &spec.display_command());

    let printer: Arc<dyn Observer> =
        Arc::new(move |line: &OutputLine| display::print_line(line, raw));
    let handle = executor
        .spawn_with_observers(&agent.cwd, &agent.prompt, &env, [printer])
        .await?;

    tokio::select! {
        status = handle.wait() => status,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, terminating agent");
            handle.kill().await
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run { agent, raw } => match run(&agent, raw).await {
            Ok(status) => {
                display::print_exit(status);
                std::process::exit(process_exit_code(status));
            }
            Err(e) => {
                display::print_error(&e.to_string());
                std::process::exit(1);
            }
        },
        Commands::ShowCommand { agent } => match agent.executor() {
            Ok(executor) => {
                let spec = executor.command_for(&agent.cwd, &agent.prompt, &agent.execution_env());
                println!("{}", spec.display_command());
            }
            Err(e) => {
                display::print_error(&e.to_string());
                std::process::exit(1);
            }
        },
    }
}
