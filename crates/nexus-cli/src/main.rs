//! nexus - checkpointed AI coding agent CLI

mod approval;
mod chat;
mod commands;
mod config;
mod input;
mod prompts;
mod render;
mod tools;
mod utils;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use nexus_agent::{CheckpointStore, JsonlCheckpointStore, Orchestrator, ToolRegistry};
use nexus_ai::providers::openai::OpenAiChatModel;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use chat::{ChatSession, DEFAULT_THREAD_ID};
use commands::{DEFAULT_HISTORY_LIMIT, format_checkpoints};
use config::{Config, Overrides, Settings};

/// nexus - checkpointed AI coding agent
#[derive(Parser, Debug)]
#[command(name = "nexus")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Model to use (overrides the config file)
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Working directory for tools and prompts
    #[arg(short, long, global = true)]
    working_dir: Option<PathBuf>,

    /// Run tools without asking for approval
    #[arg(long, global = true)]
    no_approval: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Chat with the agent; interactive unless a message is given
    Chat {
        /// Send a single message and exit
        message: Option<String>,

        /// Conversation thread to use
        #[arg(short, long, default_value = DEFAULT_THREAD_ID)]
        thread_id: String,
    },
    /// Show a thread's checkpoints, newest first
    History {
        #[arg(short, long, default_value = DEFAULT_THREAD_ID)]
        thread_id: String,

        /// Maximum number of checkpoints to show
        #[arg(short = 'n', long, default_value_t = DEFAULT_HISTORY_LIMIT)]
        limit: usize,
    },
    /// List threads with saved checkpoints
    Threads,
    /// Show the effective configuration
    Config,
    /// Delete a thread's checkpoints
    Clear {
        #[arg(short, long, default_value = DEFAULT_THREAD_ID)]
        thread_id: String,
    },
}

fn init_logging(verbose: bool, log_level: &str) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(log_level))
            .unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize config and exit
    if args.init_config {
        let path = Config::init().context("Failed to create config file")?;
        println!("Config file created at: {}", path.display());
        println!("\nExample config:\n{}", config::example_config());
        return Ok(());
    }

    let config_path = Config::config_path();
    let settings = Settings::resolve(
        Config::load_from(&config_path),
        Overrides {
            model: args.model.clone(),
            working_directory: args.working_dir.clone(),
            no_approval: args.no_approval,
        },
        config_path,
    );
    init_logging(args.verbose, &settings.log_level);

    match args.command {
        Some(Commands::History { thread_id, limit }) => {
            let store = JsonlCheckpointStore::new(settings.checkpoint_dir.clone());
            let mut checkpoints = store.list(&thread_id).await?;
            checkpoints.truncate(limit);
            println!("{}", format_checkpoints(&thread_id, &checkpoints));
        }
        Some(Commands::Threads) => {
            let store = JsonlCheckpointStore::new(settings.checkpoint_dir.clone());
            let threads = store.threads().await?;
            if threads.is_empty() {
                println!("No saved threads in {}", settings.checkpoint_dir.display());
            } else {
                for thread in threads {
                    println!("{}", thread);
                }
            }
        }
        Some(Commands::Config) => {
            println!("Configuration:\n");
            println!("{}", settings.table());
        }
        Some(Commands::Clear { thread_id }) => {
            let store = JsonlCheckpointStore::new(settings.checkpoint_dir.clone());
            store.clear(&thread_id).await?;
            println!("Cleared history for thread '{}'.", thread_id);
        }
        Some(Commands::Chat { message, thread_id }) => {
            let session = build_session(&settings, thread_id)?;
            match message {
                Some(message) => {
                    session.resume_pending().await?;
                    session.send(&message).await?;
                }
                None => session.run_interactive().await?,
            }
        }
        None => {
            let session = build_session(&settings, DEFAULT_THREAD_ID.to_string())?;
            session.run_interactive().await?;
        }
    }

    Ok(())
}

fn build_session(settings: &Settings, thread_id: String) -> anyhow::Result<ChatSession> {
    let api_key = settings.api_key.clone().context(
        "No API key found. Set OPENAI_API_KEY or add api_key to the config file (nexus --init-config)",
    )?;
    let model = Arc::new(OpenAiChatModel::new(api_key, settings.openai_settings()));

    let tools = ToolRegistry::from_tools(tools::builtin_tools(
        settings.working_directory.clone(),
        Duration::from_secs(settings.shell_timeout_secs),
    ));
    let store: Arc<dyn CheckpointStore> =
        Arc::new(JsonlCheckpointStore::new(settings.checkpoint_dir.clone()));

    let system_prompt = prompts::load_system_prompt(&settings.working_directory);
    let orchestrator = Orchestrator::new(settings.agent_config(system_prompt), model, tools, store)
        .context("Invalid agent configuration")?;
    tracing::info!(
        model = %settings.model,
        thread_id = %thread_id,
        "Chat session ready"
    );

    Ok(ChatSession::new(
        Arc::new(orchestrator),
        thread_id,
        settings.clone(),
    ))
}
