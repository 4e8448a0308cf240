//! # Statbot Command Modules
//!
//! File: cli/src/commands/mod.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Aggregates the top-level commands of the Statbot CLI:
//! - `serve`: the HTTP chat endpoint and embedded chat page
//! - `ask`: the same pipeline from the terminal, one-shot or interactive
//! - `data`: inspects the reference dataset without calling the model
//!
//! Each command defines its own arguments struct and handler. Options shared by
//! all of them live in `CommonArgs` and are flattened into each struct.
//!
use clap::Args;
use std::path::PathBuf;

/// Runs the chat pipeline from the terminal.
pub mod ask;
/// Reports on the reference dataset.
pub mod data;
/// HTTP server exposing the chat endpoint.
pub mod serve;

/// Options accepted by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// Configuration file to use instead of `./statbot.toml`.
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Reference CSV file, overriding `data.path` from configuration.
    #[arg(long)]
    pub data: Option<PathBuf>,
}
