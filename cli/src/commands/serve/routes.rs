//! # Statbot HTTP Handlers
//!
//! File: cli/src/commands/serve/routes.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Request handlers mounted by `server_logic::create_app`:
//! - `GET /`: the embedded chat page
//! - `POST /chat`: `{"message": ...}` in, `{"reply": ...}` out
//! - `GET /health`: liveness plus the number of loaded reference rows
//!
//! Conversations are keyed by the `statbot_session` cookie. Requests without a
//! usable cookie get a fresh UUID, returned via `Set-Cookie` once the first
//! reply succeeds.
//!
use crate::chat::generation::APOLOGY;
use crate::chat::{ChatService, EMPTY_MESSAGE_REPLY};
use crate::core::error::StatbotError;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;

/// Cookie carrying the session id.
pub const SESSION_COOKIE: &str = "statbot_session";

const INDEX_HTML: &str = include_str!("../../../static/index.html");

/// Body of `POST /chat`. A missing `message` counts as empty.
#[derive(Deserialize, Debug, Default)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
}

/// Body of every `/chat` response.
#[derive(Serialize, Deserialize, Debug)]
pub struct ChatResponse {
    pub reply: String,
}

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn health(State(service): State<Arc<ChatService>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "reference_rows": service.reference_rows(),
    }))
}

pub async fn chat(
    State(service): State<Arc<ChatService>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    // Unparseable bodies are treated like an empty message.
    let request: ChatRequest = serde_json::from_slice(&body).unwrap_or_else(|e| {
        debug!("Ignoring malformed chat body: {}", e);
        ChatRequest::default()
    });

    let (session_id, is_new) = match session_from_headers(&headers) {
        Some(id) => (id, false),
        None => (Uuid::new_v4().to_string(), true),
    };

    match service.reply(&session_id, &request.message).await {
        Ok(reply) => {
            let mut response = Json(ChatResponse { reply }).into_response();
            if is_new {
                let cookie = format!(
                    "{}={}; Path=/; HttpOnly; SameSite=Lax",
                    SESSION_COOKIE, session_id
                );
                if let Ok(value) = HeaderValue::from_str(&cookie) {
                    response.headers_mut().insert(SET_COOKIE, value);
                }
            }
            response
        }
        Err(StatbotError::EmptyMessage) => (
            StatusCode::BAD_REQUEST,
            Json(ChatResponse {
                reply: EMPTY_MESSAGE_REPLY.to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Chat request failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ChatResponse {
                    reply: APOLOGY.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// Extracts a well-formed session id from the request's cookies.
fn session_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, id)| id.trim())
        .filter(|id| is_valid_session_id(id))
        .map(str::to_string)
}

fn is_valid_session_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= 64 && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}
