//! # Statbot Chat Core
//!
//! File: cli/src/chat/mod.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Everything between an incoming message and the generated reply:
//! - `dataset`: loads the CSV reference table once at startup
//! - `history`: per-session turn lists with a fixed greeting and a 30-turn window
//! - `prompt`: flattens table + history + message into role-tagged blocks
//! - `generation`: the Gemini call, its typed errors and the apology fallback
//! - `service`: the request pipeline tying the above together
//!
//! The HTTP surface and the CLI live in `commands`; nothing in here knows
//! about cookies, status codes or terminals.
//!
pub mod dataset;
pub mod generation;
pub mod history;
pub mod prompt;
pub mod service;

pub use dataset::{load_reference_table, ReferenceTable};
pub use generation::{GeminiClient, GeminiConfig, Generator};
pub use history::HistoryStore;
pub use service::{ChatService, EMPTY_MESSAGE_REPLY};

use crate::core::config::{self, Config};
use crate::core::error::Result;
use std::sync::Arc;
use std::time::Duration;

/// Builds the chat service from configuration: reads the API key, loads the
/// reference table and prepares the Gemini client.
///
/// A missing API key is fatal; a missing or broken dataset is not.
pub fn build_service(config: &Config) -> Result<ChatService> {
    let api_key = config::read_credential(config::API_KEY_ENV)?;
    let table = load_reference_table(&config.data.path);

    let client = GeminiClient::new(GeminiConfig {
        api_key,
        api_base: config.generation.api_base.clone(),
        connect_timeout: Duration::from_secs(config.generation.connect_timeout_secs),
        timeout: Duration::from_secs(config.generation.timeout_secs),
    })?;

    let idle_timeout = match config.session.idle_timeout_secs {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    };

    Ok(ChatService::new(
        table,
        HistoryStore::new(idle_timeout),
        Arc::new(client),
    ))
}
