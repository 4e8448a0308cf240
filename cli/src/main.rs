//! # Statbot Main Entry Point
//!
//! File: cli/src/main.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! This file serves as the main entry point for the Statbot CLI application.
//! It handles:
//! - Loading a local `.env` file before anything reads the environment
//! - Command-line argument parsing using Clap
//! - Setting up the logging system based on verbosity flags
//! - Routing execution to appropriate command handlers
//!
//! ## Examples
//!
//! ```bash
//! # Start the chat server
//! statbot serve
//!
//! # Ask a single question with debug logging
//! statbot -vv ask "ค่าเทอมเท่าไหร่"
//! ```
//!
//! Command processing flow:
//! 1. Load `.env` and parse command-line args via Clap
//! 2. Configure logging based on verbosity level
//! 3. Route to appropriate command handler
//! 4. Format and display any errors that occur
//!
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

mod chat; // Dataset, history, prompt and generation pipeline
mod commands; // Handles specific command logic (serve, ask, data)
mod core; // Core infrastructure (errors, config)

/// Defines the top-level command-line arguments structure using Clap's derive macros.
#[derive(Parser, Debug)]
#[command(
    name = "statbot",
    about = "🤖 Statbot: university FAQ chat backed by a CSV knowledge base and Gemini",
    long_about = "Serve the Statbot chat endpoint, ask it questions from the terminal,\n\
                  or inspect the reference data it answers from.",
    propagate_version = true,
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

/// Enum defining all available top-level commands.
#[derive(Parser, Debug)]
enum Commands {
    #[command(alias = "s")]
    Serve(commands::serve::ServeArgs),
    #[command(alias = "a")]
    Ask(commands::ask::AskArgs),
    Data(commands::data::DataArgs),
}

/// Default log level for a verbosity count. The server logs requests at
/// `info` even without `-v`.
fn log_level(command: &Commands, verbose: u8) -> &'static str {
    match (command, verbose) {
        (Commands::Serve(_), 0) | (_, 1) => "info",
        (_, 0) => "warn",
        (_, 2) => "debug",
        _ => "trace",
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level(&cli.command, cli.verbose)));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    tracing::debug!("Parsed CLI arguments: {:?}", cli);

    let command_result = match cli.command {
        Commands::Serve(args) => commands::serve::handle_serve(args).await,
        Commands::Ask(args) => commands::ask::handle_ask(args).await,
        Commands::Data(args) => commands::data::handle_data(args).await,
    };

    if let Err(e) = command_result {
        tracing::error!("Command execution failed: {:?}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
