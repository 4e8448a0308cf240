//! # Statbot Terminal Chat
//!
//! File: cli/src/commands/ask.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! `statbot ask` runs the same pipeline as `POST /chat` without the HTTP
//! layer. With a message argument it prints one reply and exits; without one
//! it reads questions from stdin until EOF or `exit`, keeping a single session
//! for the whole conversation.
//!
//! ```bash
//! statbot ask "ค่าเทอมต้องจ่ายเมื่อไหร่"
//! statbot ask --data ./faq.csv
//! ```
//!
use super::CommonArgs;
use crate::chat::{self, ChatService, EMPTY_MESSAGE_REPLY};
use crate::core::config::{self, ConfigOverrides};
use crate::core::error::{Result, StatbotError};
use anyhow::Context;
use clap::Args;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::info;
use uuid::Uuid;

/// Arguments for `statbot ask`.
#[derive(Args, Debug)]
pub struct AskArgs {
    /// Question to ask. Omit to start an interactive conversation.
    pub message: Option<String>,

    #[command(flatten)]
    pub common: CommonArgs,
}

pub async fn handle_ask(args: AskArgs) -> Result<()> {
    info!("Handling ask command with args: {:?}", args);

    let overrides = ConfigOverrides {
        data: args.common.data.clone(),
        ..Default::default()
    };
    let config = config::load_config(args.common.config.as_deref())?.with_overrides(&overrides)?;
    let service = chat::build_service(&config)?;
    let session_id = Uuid::new_v4().to_string();

    let mut stdout = std::io::stdout();
    match args.message {
        Some(message) => {
            writeln!(stdout, "{}", answer(&service, &session_id, &message).await)?;
            Ok(())
        }
        None => {
            let stdin = BufReader::new(tokio::io::stdin());
            run_interactive(&service, &session_id, stdin, &mut stdout).await
        }
    }
}

/// Reply text for one message, with empty input answered politely.
async fn answer(service: &ChatService, session_id: &str, message: &str) -> String {
    match service.reply(session_id, message).await {
        Ok(reply) => reply,
        Err(StatbotError::EmptyMessage) => EMPTY_MESSAGE_REPLY.to_string(),
        Err(e) => e.to_string(),
    }
}

/// Reads questions line by line until EOF or `exit`/`quit`.
async fn run_interactive<R, W>(
    service: &ChatService,
    session_id: &str,
    input: R,
    output: &mut W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    writeln!(
        output,
        "Statbot ({} reference rows). Type 'exit' to quit.",
        service.reference_rows().unwrap_or(0)
    )?;

    let mut lines = input.lines();
    loop {
        write!(output, "> ")?;
        output.flush()?;

        let Some(line) = lines
            .next_line()
            .await
            .context("Failed to read from stdin")?
        else {
            writeln!(output)?;
            break;
        };

        let line = line.trim();
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        let reply = answer(service, session_id, line).await;
        writeln!(output, "{}\n", reply)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::generation::testing::ScriptedGenerator;
    use crate::chat::history::Turn;
    use crate::chat::HistoryStore;
    use std::sync::Arc;

    fn scripted_service(reply: &str) -> (ChatService, Arc<ScriptedGenerator>) {
        let generator = Arc::new(ScriptedGenerator::replying(reply));
        let service = ChatService::new(None, HistoryStore::new(None), generator.clone());
        (service, generator)
    }

    #[tokio::test]
    async fn test_answer_empty_message() {
        let (service, generator) = scripted_service("unused");
        assert_eq!(answer(&service, "s", "  ").await, EMPTY_MESSAGE_REPLY);
        assert!(generator.calls().is_empty());
    }

    #[tokio::test]
    async fn test_interactive_keeps_one_session() {
        let (service, generator) = scripted_service("ได้เลยครับ");
        let input: &[u8] = b"first question\n\n  second question  \nexit\nignored\n";
        let mut output = Vec::new();

        run_interactive(&service, "term", input, &mut output)
            .await
            .unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.starts_with("Statbot (0 reference rows)"));
        assert_eq!(text.matches("ได้เลยครับ").count(), 2);
        assert_eq!(text.matches(EMPTY_MESSAGE_REPLY).count(), 1);
        assert_eq!(generator.calls().len(), 2);

        let history = service.history("term").await;
        assert_eq!(history.len(), 6);
        assert_eq!(history[4], Turn::user("second question"));
    }

    #[tokio::test]
    async fn test_interactive_stops_at_eof() {
        let (service, generator) = scripted_service("ok");
        let input: &[u8] = b"only one";
        let mut output = Vec::new();

        run_interactive(&service, "eof", input, &mut output)
            .await
            .unwrap();

        assert_eq!(generator.calls().len(), 1);
        assert!(String::from_utf8(output).unwrap().ends_with("> \n"));
    }
}
