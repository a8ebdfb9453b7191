//! DocChat CLI — the main entry point.
//!
//! Commands:
//! - `serve`    — Start the web UI and HTTP API
//! - `ask`      — Ask one question, optionally about a PDF
//! - `chat`     — Interactive question loop in the terminal
//! - `doctor`   — Diagnose configuration and provider access
//! - `onboard`  — Write a default config file

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "docchat",
    about = "DocChat — ask questions, optionally about a PDF",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web UI and HTTP API
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,

        /// Override the bind address
        #[arg(long)]
        host: Option<String>,
    },

    /// Ask a single question and print the response
    Ask {
        /// The question to ask
        question: String,

        /// PDF whose text is sent as context
        #[arg(long)]
        pdf: Option<PathBuf>,
    },

    /// Interactive chat in the terminal
    Chat {
        /// PDF to attach before the first question
        #[arg(long)]
        pdf: Option<PathBuf>,
    },

    /// Diagnose configuration and provider access
    Doctor,

    /// Write a default config file
    Onboard,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    match cli.command {
        Commands::Serve { port, host } => commands::serve::run(port, host).await?,
        Commands::Ask { question, pdf } => commands::ask::run(question, pdf).await?,
        Commands::Chat { pdf } => commands::chat::run(pdf).await?,
        Commands::Doctor => commands::doctor::run().await?,
        Commands::Onboard => commands::onboard::run().await?,
    }

    Ok(())
}
