//! # Chat Pipeline
//!
//! File: cli/src/chat/service.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! `ChatService` runs one request cycle:
//! 1. Trim and validate the message (empty messages never touch history)
//! 2. Lock the session, seeding it on first use
//! 3. Append the user turn
//! 4. Compose the prompt and make one generation call
//! 5. Append the reply (or the apology) as a model turn
//!
//! The session lock is held from step 2 to step 5, so concurrent requests for
//! one session are handled strictly one after another.
//!
use super::dataset::ReferenceTable;
use super::generation::{reply_or_apology, Generator};
use super::history::{HistoryStore, Turn};
use super::prompt::compose;
use crate::core::error::StatbotError;
use std::sync::Arc;
use tracing::{debug, info};

/// Reply sent when the user submits an empty message.
pub const EMPTY_MESSAGE_REPLY: &str = "กรุณาพิมพ์ข้อความ";

/// Shared state behind every chat request.
pub struct ChatService {
    table: Option<Arc<ReferenceTable>>,
    store: HistoryStore,
    generator: Arc<dyn Generator>,
}

impl ChatService {
    pub fn new(
        table: Option<ReferenceTable>,
        store: HistoryStore,
        generator: Arc<dyn Generator>,
    ) -> Self {
        Self {
            table: table.map(Arc::new),
            store,
            generator,
        }
    }

    /// Produces the reply for `raw_message` in `session_id`'s conversation.
    ///
    /// Only `StatbotError::EmptyMessage` is returned as an error; generation
    /// failures come back as the apology text.
    pub async fn reply(&self, session_id: &str, raw_message: &str) -> Result<String, StatbotError> {
        let message = raw_message.trim();
        if message.is_empty() {
            debug!("Rejected empty message for session {}", session_id);
            return Err(StatbotError::EmptyMessage);
        }

        let mut history = self.store.lock(session_id).await;
        history.append(Turn::user(message));
        history.trim();

        let contents = compose(self.table.as_deref(), &history, message);
        let reply = reply_or_apology(self.generator.as_ref(), &contents).await;

        history.append(Turn::model(reply.clone()));
        history.trim();
        info!(
            "Answered session {} ({} turns in history)",
            session_id,
            history.len()
        );

        Ok(reply)
    }

    /// Current turns of a session (seeding it if new).
    pub async fn history(&self, session_id: &str) -> Vec<Turn> {
        self.store.get_or_init(session_id).await
    }

    /// Number of reference rows, or `None` when no table is loaded.
    pub fn reference_rows(&self) -> Option<usize> {
        self.table.as_ref().map(|table| table.len())
    }

    pub fn store(&self) -> &HistoryStore {
        &self.store
    }
}
