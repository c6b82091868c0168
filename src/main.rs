//! assistant-relay - an interactive terminal client for hosted assistants.
//!
//! Relays each question to a configured assistant in a fresh thread, waits
//! for the run to finish and prints the cleaned-up reply.

mod client;
mod config;
mod error;
mod pipeline;
mod protocol;
mod repl;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client::OpenAIClient;
use config::{Config, Credentials};
use pipeline::Pipeline;
use std::path::PathBuf;
use std::process::Command as ProcessCommand;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "assistant-relay")]
#[command(author, version, about = "An interactive terminal client for hosted assistants")]
#[command(long_about = "Relays questions to a hosted assistant and prints its replies.\n\nRequires ASSISTANT_ID and API_KEY in the environment or a .env file.")]
struct Cli {
    /// Assistant to talk to (overrides ASSISTANT_ID)
    #[arg(short = 'a', long, value_name = "ID", global = true)]
    assistant_id: Option<String>,

    /// Give up on a run after this many seconds
    #[arg(short = 't', long, value_name = "SECS", global = true)]
    timeout: Option<u64>,

    /// Read credentials from this file instead of the nearest .env
    #[arg(long, value_name = "PATH", global = true)]
    env_file: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question and print the reply
    Ask {
        /// The question to relay
        #[arg(required = true, value_name = "QUESTION")]
        question: Vec<String>,
    },
    /// Verify the configured assistant exists
    Check,
    /// Open configuration file in $EDITOR
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let overrides = Overrides {
        assistant_id: cli.assistant_id,
        timeout: cli.timeout,
        env_file: cli.env_file,
    };
    match cli.command {
        Some(Commands::Config) => handle_config(),
        Some(Commands::Check) => handle_check(overrides).await,
        Some(Commands::Ask { question }) => handle_ask(overrides, question.join(" ")).await,
        None => handle_interactive(overrides).await,
    }
}

/// Command-line values that take precedence over config and environment.
struct Overrides {
    assistant_id: Option<String>,
    timeout: Option<u64>,
    env_file: Option<PathBuf>,
}

/// Initialize logging on stderr so it never mixes with the prompt.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("assistant_relay={level},reqwest=warn"))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Everything a query needs, built once at startup.
struct Runtime {
    config: Config,
    credentials: Credentials,
    client: OpenAIClient,
}

impl Runtime {
    fn load(overrides: Overrides) -> Result<Self> {
        let mut config = Config::load().context("Failed to load configuration")?;
        if let Some(secs) = overrides.timeout {
            config.polling.max_wait_secs = secs;
        }
        let credentials = match overrides.env_file {
            Some(path) => Credentials::from_env_file(overrides.assistant_id, &path, |name| {
                std::env::var(name).ok()
            })?,
            None => Credentials::from_env(overrides.assistant_id)?,
        };
        let client = OpenAIClient::new(&config.api, credentials.api_key.clone())?;
        info!(
            assistant_id = %credentials.assistant_id,
            base_url = %config.api.base_url,
            "configuration loaded"
        );

        Ok(Self {
            config,
            credentials,
            client,
        })
    }

    fn pipeline(&self) -> Pipeline<'_, OpenAIClient> {
        Pipeline::new(
            &self.client,
            self.credentials.assistant_id.clone(),
            self.config.polling.policy(),
        )
    }
}

/// Run the interactive prompt.
async fn handle_interactive(overrides: Overrides) -> Result<()> {
    let runtime = Runtime::load(overrides)?;
    let pipeline = runtime.pipeline();

    let active = repl::ActiveQuery::default();
    tokio::spawn(repl::watch_interrupts(active.clone()));

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    repl::run(&pipeline, stdin, stdout, &active).await
}

/// Ask one question and print the reply to stdout.
async fn handle_ask(overrides: Overrides, question: String) -> Result<()> {
    if question.trim().is_empty() {
        return Err(anyhow::anyhow!("Question must not be empty"));
    }

    let runtime = Runtime::load(overrides)?;
    let pipeline = runtime.pipeline();

    let active = repl::ActiveQuery::default();
    let cancel = active.begin();
    tokio::spawn(repl::watch_interrupts(active.clone()));

    let outcome = pipeline.get_reply(&question, &cancel).await;
    match &outcome {
        Ok(_) | Err(error::RelayError::IncompleteRun { .. }) => println!("{}", repl::render(&outcome)),
        Err(e) => eprintln!("Error: {}", e),
    }
    if outcome.is_err() {
        std::process::exit(1);
    }
    Ok(())
}

/// Resolve the configured assistant and print what it is.
async fn handle_check(overrides: Overrides) -> Result<()> {
    let runtime = Runtime::load(overrides)?;
    let assistant = tokio::time::timeout(
        Duration::from_secs(runtime.config.api.request_timeout_secs),
        pipeline::resolver::resolve(&runtime.client, &runtime.credentials.assistant_id),
    )
    .await
    .map_err(|_| anyhow::anyhow!("Timed out contacting the assistant service"))??;

    println!("Assistant: {}", assistant.id);
    println!("  name: {}", assistant.name.as_deref().unwrap_or("<unnamed>"));
    println!("  model: {}", assistant.model.as_deref().unwrap_or("<unknown>"));
    if let Some(instructions) = assistant.instructions.as_deref() {
        let first_line = instructions.lines().next().unwrap_or_default();
        println!("  instructions: {}", first_line);
    }
    Ok(())
}

/// Handle the config subcommand.
fn handle_config() -> Result<()> {
    let config_path = Config::config_path()?;

    // Create default config if it doesn't exist
    if !config_path.exists() {
        let default_config = Config::default();
        default_config.save()?;
        println!("Created default config at {}", config_path.display());
    }

    // Open in editor
    let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());
    let status = ProcessCommand::new(&editor)
        .arg(&config_path)
        .status()
        .context("Failed to open editor")?;

    if !status.success() {
        eprintln!("Editor exited with non-zero status");
    }

    Ok(())
}
