//! Qogito CLI: the main entry point.
//!
//! Commands:
//! - `chat`      Interactive chat or single-message mode
//! - `status`    Connect and show the served model
//! - `complete`  Fill-in-the-middle completion at a file offset
//! - `transform` Rewrite text according to an instruction
//! - `config`    Show, initialize or edit settings

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use qogito_core::mode::Mode;

mod commands;

#[derive(Parser)]
#[command(
    name = "qogito",
    about = "Qogito: an agentic coding assistant for llama.cpp servers",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the agent about a workspace
    Chat {
        /// passive (read-only tools) or active (may edit files and run commands)
        #[arg(long, default_value = "passive")]
        mode: Mode,

        /// Workspace folder the tools operate in (defaults to the current directory)
        #[arg(short, long)]
        workspace: Option<PathBuf>,

        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Connect to the agentic server and show what it serves
    Status,

    /// Ask the completion server for text to insert at an offset
    Complete {
        #[arg(short, long)]
        file: PathBuf,

        /// Byte offset of the cursor
        #[arg(short, long)]
        offset: usize,
    },

    /// Rewrite text according to an instruction
    Transform {
        #[arg(short, long)]
        instruction: String,

        /// Read the text from a file instead of stdin
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Change one setting and save it
    Set { key: String, value: String },

    /// Print the config file path
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so piped output stays clean.
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Chat {
            mode,
            workspace,
            message,
        } => commands::chat::run(mode, workspace, message).await?,
        Commands::Status => commands::status::run().await?,
        Commands::Complete { file, offset } => commands::complete::run(&file, offset).await?,
        Commands::Transform { instruction, file } => {
            commands::transform::run(&instruction, file.as_deref()).await?
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show()?,
            ConfigAction::Init { force } => commands::config_cmd::init(force)?,
            ConfigAction::Set { key, value } => commands::config_cmd::set(&key, &value)?,
            ConfigAction::Path => commands::config_cmd::path(),
        },
    }

    Ok(())
}
