//! ToolLoop CLI, the main entry point.
//!
//! Commands:
//! - `chat`    Interactive chat or single-message mode
//! - `query`   One question, one answer, no history
//! - `models`  List supported models
//! - `config`  Print the default configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "toolloop",
    about = "ToolLoop: chat with a function-calling agent",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (tool calls and augmented prompts)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the agent
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Augment every message with context from this directory
        #[arg(long, conflicts_with = "retrieve_tools")]
        context_dir: Option<PathBuf>,

        /// Pick tools per message by matching their descriptions
        /// (context agents only take the static tool list)
        #[arg(long)]
        retrieve_tools: bool,
    },

    /// Ask a single question without keeping history
    Query {
        /// The question
        text: String,

        /// Augment the question with context from this directory
        #[arg(long)]
        context_dir: Option<PathBuf>,
    },

    /// List supported models
    Models,

    /// Print the default configuration file
    Config,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Chat {
            message,
            context_dir,
            retrieve_tools,
        } => {
            let options = commands::session::SessionOptions {
                context_dir,
                retrieve_tools,
                verbose: cli.verbose,
            };
            commands::chat::run(message, options).await?
        }
        Commands::Query { text, context_dir } => {
            let options = commands::session::SessionOptions {
                context_dir,
                retrieve_tools: false,
                verbose: cli.verbose,
            };
            commands::query::run(&text, options).await?
        }
        Commands::Models => commands::models::run(),
        Commands::Config => commands::config_cmd::run(),
    }

    Ok(())
}
