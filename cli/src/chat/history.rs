//! # Session History
//!
//! File: cli/src/chat/history.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Each chat session keeps a short, ordered list of `Turn`s. A history starts
//! with a fixed greeting pair and never grows past `HISTORY_LIMIT` turns; the
//! oldest turns are dropped first.
//!
//! `HistoryStore` maps session ids to histories. Every session sits behind its
//! own async mutex, so one request can hold its session for the whole
//! user-turn → generation → model-turn cycle while requests for other
//! sessions proceed untouched.
//!
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

/// Maximum number of turns kept per session.
pub const HISTORY_LIMIT: usize = 30;

/// Seeded user greeting.
pub const GREETING_USER: &str = "สวัสดี";

/// Seeded model greeting.
pub const GREETING_MODEL: &str =
    "สวัสดีครับ! ผมคือ Statbot ผู้ช่วยของมหาวิทยาลัยมหาสารคาม พร้อมตอบคำถามจากข้อมูลล่าสุดแล้วนะครับ 😊";

/// Speaker of a turn, using the generation API's role names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

/// One role-tagged piece of conversation text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    role: Role,
    text: String,
}

impl Turn {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self::new(Role::Model, text)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Ordered turns of one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHistory {
    turns: Vec<Turn>,
}

impl SessionHistory {
    /// A fresh history holding the greeting pair.
    pub fn seeded() -> Self {
        Self {
            turns: vec![Turn::user(GREETING_USER), Turn::model(GREETING_MODEL)],
        }
    }

    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Keeps only the most recent `HISTORY_LIMIT` turns.
    pub fn trim(&mut self) {
        if self.turns.len() > HISTORY_LIMIT {
            let excess = self.turns.len() - HISTORY_LIMIT;
            self.turns.drain(..excess);
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn latest(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

struct SessionEntry {
    history: Arc<Mutex<SessionHistory>>,
    last_seen: Instant,
}

/// Session-keyed store of chat histories.
pub struct HistoryStore {
    sessions: DashMap<String, SessionEntry>,
    idle_timeout: Option<Duration>,
}

impl HistoryStore {
    /// `idle_timeout` of `None` keeps histories until they are removed explicitly.
    pub fn new(idle_timeout: Option<Duration>) -> Self {
        Self {
            sessions: DashMap::new(),
            idle_timeout,
        }
    }

    /// Snapshot of the session's history, seeding it on first use.
    pub async fn get_or_init(&self, session_id: &str) -> Vec<Turn> {
        self.handle(session_id).lock().await.turns().to_vec()
    }

    /// Appends one turn to the session, then trims it.
    pub async fn append(&self, session_id: &str, turn: Turn) {
        let handle = self.handle(session_id);
        let mut history = handle.lock().await;
        history.append(turn);
        history.trim();
    }

    pub async fn trim(&self, session_id: &str) {
        self.handle(session_id).lock().await.trim();
    }

    /// Exclusive access to a session for a whole request cycle.
    pub async fn lock(&self, session_id: &str) -> OwnedMutexGuard<SessionHistory> {
        self.handle(session_id).lock_owned().await
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    pub fn remove(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn handle(&self, session_id: &str) -> Arc<Mutex<SessionHistory>> {
        self.prune_idle();
        let mut entry = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                debug!("Starting new chat history for session {}", session_id);
                SessionEntry {
                    history: Arc::new(Mutex::new(SessionHistory::seeded())),
                    last_seen: Instant::now(),
                }
            });
        entry.last_seen = Instant::now();
        Arc::clone(&entry.history)
    }

    /// Drops idle sessions. Sessions with a request in flight are kept.
    fn prune_idle(&self) {
        let Some(timeout) = self.idle_timeout else {
            return;
        };
        let now = Instant::now();
        self.sessions.retain(|id, entry| {
            let keep = now.duration_since(entry.last_seen) <= timeout
                || Arc::strong_count(&entry.history) > 1;
            if !keep {
                debug!("Expiring idle chat history for session {}", id);
            }
            keep
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_history() {
        let history = SessionHistory::seeded();
        assert_eq!(history.len(), 2);
        assert_eq!(history.turns()[0], Turn::user(GREETING_USER));
        assert_eq!(history.turns()[1], Turn::model(GREETING_MODEL));
    }

    #[test]
    fn test_trim_keeps_most_recent_in_order() {
        let mut history = SessionHistory::seeded();
        for i in 0..45 {
            history.append(Turn::user(format!("message {}", i)));
            history.trim();
            assert!(history.len() <= HISTORY_LIMIT);
        }
        assert_eq!(history.len(), HISTORY_LIMIT);
        // 47 turns in total; the last 30 are messages 15..45.
        let texts: Vec<&str> = history.turns().iter().map(Turn::text).collect();
        let expected: Vec<String> = (15..45).map(|i| format!("message {}", i)).collect();
        assert_eq!(texts, expected);
    }

    #[test]
    fn test_trim_below_limit_is_noop() {
        let mut history = SessionHistory::seeded();
        history.append(Turn::user("hello"));
        history.trim();
        assert_eq!(history.len(), 3);
        assert_eq!(history.latest(), Some(&Turn::user("hello")));
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Model).unwrap(), "\"model\"");
        assert_eq!(Role::User.as_str(), "user");
    }

    #[tokio::test]
    async fn test_get_or_init_twice_returns_greeting_pair() {
        let store = HistoryStore::new(None);
        let first = store.get_or_init("abc").await;
        let second = store.get_or_init("abc").await;
        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
        assert_eq!(second[0].text(), GREETING_USER);
        assert_eq!(second[1].role(), Role::Model);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_thirty_one_alternating_appends() {
        let store = HistoryStore::new(None);
        store.lock("s").await.turns.clear();

        for i in 1..=31 {
            let turn = if i % 2 == 1 {
                Turn::user(format!("turn {}", i))
            } else {
                Turn::model(format!("turn {}", i))
            };
            store.append("s", turn).await;
        }

        let history = store.get_or_init("s").await;
        assert_eq!(history.len(), 30);
        assert_eq!(history.last(), Some(&Turn::user("turn 31")));
        assert_eq!(history.first(), Some(&Turn::model("turn 2")));
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let store = HistoryStore::new(None);
        store.append("a", Turn::user("from a")).await;
        let b = store.get_or_init("b").await;
        assert_eq!(b.len(), 2);
        assert_eq!(store.get_or_init("a").await.len(), 3);
        assert!(store.remove("a"));
        assert!(!store.contains("a"));
    }

    #[tokio::test]
    async fn test_lock_serializes_same_session() {
        let store = HistoryStore::new(None);
        let guard = store.lock("busy").await;

        let blocked =
            tokio::time::timeout(Duration::from_millis(50), store.lock("busy")).await;
        assert!(blocked.is_err(), "second lock on the same session must wait");

        let other = tokio::time::timeout(Duration::from_millis(50), store.lock("idle")).await;
        assert!(other.is_ok(), "other sessions must not wait");

        drop(guard);
        let unblocked =
            tokio::time::timeout(Duration::from_millis(50), store.lock("busy")).await;
        assert!(unblocked.is_ok());
    }

    #[tokio::test]
    async fn test_idle_sessions_expire() {
        let store = HistoryStore::new(Some(Duration::from_millis(10)));
        store.append("old", Turn::user("hi")).await;
        tokio::time::sleep(Duration::from_millis(30)).await;

        // Touching another session prunes the idle one.
        store.get_or_init("new").await;
        assert!(!store.contains("old"));
        assert_eq!(store.get_or_init("old").await.len(), 2);
    }
}
