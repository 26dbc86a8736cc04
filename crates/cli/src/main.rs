//! Waypost CLI — the main entry point.
//!
//! Commands:
//! - `serve`  — Start the HTTP gateway
//! - `ingest` — Push a knowledge file to a running gateway
//! - `chat`   — One-shot chat turn against an in-process engine
//! - `config` — Print the effective configuration

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "waypost",
    about = "Waypost — tiered answer routing for support conversations",
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
    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Ingest a JSON knowledge file into a running gateway
    Ingest {
        /// Path to a JSON file: [{"question": "...", "answer": "..."}]
        file: std::path::PathBuf,

        /// Gateway base URL
        #[arg(long, default_value = "http://127.0.0.1:8087")]
        url: String,
    },

    /// Send a single message through an in-process engine
    Chat {
        /// The message to route
        #[arg(short, long)]
        message: String,

        /// Optional knowledge file to ingest first
        #[arg(short, long)]
        knowledge: Option<std::path::PathBuf>,
    },

    /// Print the effective configuration (secrets redacted)
    Config {
        /// Print the default config TOML instead
        #[arg(long)]
        default: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
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
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Ingest { file, url } => commands::ingest::run(&file, &url).await?,
        Commands::Chat { message, knowledge } => {
            commands::chat::run(&message, knowledge.as_deref()).await?
        }
        Commands::Config { default } => commands::config_cmd::run(default)?,
    }

    Ok(())
}
