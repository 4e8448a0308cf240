//! # Generation Client
//!
//! File: cli/src/chat/generation.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Wraps the single outbound call to Google's Gemini `generateContent` REST
//! endpoint. The model, output limit, temperature and persona are fixed.
//!
//! Failures are reported as a closed `GenerationError` so the cause can be
//! logged precisely, but every failure kind surfaces to the user as the same
//! apology string (`reply_or_apology`). There is no retry.
//!
//! The `Generator` trait is the seam between the chat pipeline and the remote
//! service; tests swap in scripted generators.
//!
use super::prompt::{PromptContents, SYSTEM_INSTRUCTION};
use crate::core::error::Result;
use anyhow::Context;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error};

/// Gemini model used for every reply.
pub const MODEL: &str = "gemini-2.5-flash-lite";

/// Upper bound on generated tokens per reply.
pub const MAX_OUTPUT_TOKENS: u32 = 300;

/// Sampling temperature.
pub const TEMPERATURE: f64 = 0.7;

/// Reply shown to the user whenever generation fails.
pub const APOLOGY: &str = "ขออภัยครับ ระบบมีปัญหาชั่วคราว ลองใหม่ในอีกสักครู่นะครับ 🙏";

/// Why a generation call produced no reply.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("rate limited or quota exhausted")]
    RateLimited,

    #[error("API key rejected (HTTP {0})")]
    Unauthorized(u16),

    #[error("API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("response contained no text")]
    EmptyReply,
}

impl GenerationError {
    /// Short label for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::Network(_) => "network",
            GenerationError::Timeout => "timeout",
            GenerationError::RateLimited => "rate_limited",
            GenerationError::Unauthorized(_) => "unauthorized",
            GenerationError::Api { .. } => "api",
            GenerationError::MalformedResponse(_) => "malformed_response",
            GenerationError::EmptyReply => "empty_reply",
        }
    }
}

/// Produces one reply for a composed prompt.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, contents: &PromptContents) -> std::result::Result<String, GenerationError>;
}

/// Runs one generation call, substituting `APOLOGY` for any failure.
pub async fn reply_or_apology(generator: &dyn Generator, contents: &PromptContents) -> String {
    match generator.generate(contents).await {
        Ok(reply) => reply,
        Err(e) => {
            error!(kind = e.kind(), "Generation failed: {}", e);
            APOLOGY.to_string()
        }
    }
}

/// Connection settings for `GeminiClient`.
#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub api_base: String,
    pub connect_timeout: Duration,
    pub timeout: Duration,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("connect_timeout", &self.connect_timeout)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Gemini REST client.
pub struct GeminiClient {
    config: GeminiConfig,
    http: reqwest::Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .build()
            .context("Failed to build HTTP client for the generation API")?;
        Ok(Self { config, http })
    }

    fn api_url(&self) -> String {
        format!(
            "{}/{}:generateContent",
            self.config.api_base.trim_end_matches('/'),
            MODEL
        )
    }

    fn build_request_body(contents: &PromptContents) -> Value {
        let contents: Vec<Value> = contents
            .blocks()
            .iter()
            .map(|block| {
                json!({
                    "role": block.role.as_str(),
                    "parts": [{ "text": block.text }]
                })
            })
            .collect();

        json!({
            "contents": contents,
            "systemInstruction": {
                "parts": [{ "text": SYSTEM_INSTRUCTION }]
            },
            "generationConfig": {
                "maxOutputTokens": MAX_OUTPUT_TOKENS,
                "temperature": TEMPERATURE,
            }
        })
    }

    fn parse_response(json: &Value) -> std::result::Result<String, GenerationError> {
        let candidates = json["candidates"].as_array().ok_or_else(|| {
            match json["promptFeedback"]["blockReason"].as_str() {
                Some(reason) => {
                    GenerationError::MalformedResponse(format!("prompt blocked: {}", reason))
                }
                None => GenerationError::MalformedResponse("no candidates in response".to_string()),
            }
        })?;
        let first = candidates
            .first()
            .ok_or_else(|| GenerationError::MalformedResponse("empty candidates".to_string()))?;

        let text: String = first["content"]["parts"]
            .as_array()
            .map(|parts| parts.iter().filter_map(|p| p["text"].as_str()).collect())
            .unwrap_or_default();

        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(GenerationError::EmptyReply);
        }
        Ok(trimmed.to_string())
    }
}

#[async_trait]
impl Generator for GeminiClient {
    async fn generate(&self, contents: &PromptContents) -> std::result::Result<String, GenerationError> {
        let body = Self::build_request_body(contents);
        debug!(model = MODEL, blocks = contents.len(), "Gemini API request");

        let response = self
            .http
            .post(self.api_url())
            .header("content-type", "application/json")
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout
                } else {
                    GenerationError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GenerationError::RateLimited);
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(GenerationError::Unauthorized(status.as_u16()));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        let json: Value = response.json().await.map_err(|e| {
            if e.is_timeout() {
                GenerationError::Timeout
            } else {
                GenerationError::MalformedResponse(e.to_string())
            }
        })?;

        Self::parse_response(&json)
    }
}

/// Scripted generators for pipeline and router tests.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    pub(crate) struct ScriptedGenerator {
        reply: Option<String>,
        calls: Mutex<Vec<PromptContents>>,
    }

    impl ScriptedGenerator {
        pub(crate) fn replying(reply: &str) -> Self {
            Self {
                reply: Some(reply.to_string()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn failing() -> Self {
            Self {
                reply: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn calls(&self) -> Vec<PromptContents> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Generator for ScriptedGenerator {
        async fn generate(
            &self,
            contents: &PromptContents,
        ) -> std::result::Result<String, GenerationError> {
            self.calls.lock().unwrap().push(contents.clone());
            match &self.reply {
                Some(reply) => Ok(reply.clone()),
                None => Err(GenerationError::Network("connection reset by peer".into())),
            }
        }
    }
}
