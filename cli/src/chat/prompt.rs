//! # Prompt Composition
//!
//! File: cli/src/chat/prompt.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Turns the reference table, the session history and the newest user message
//! into the role-tagged content blocks sent to the generation API.
//!
//! The whole table (up to `MAX_CONTEXT_ROWS` rows) is folded into the newest
//! user block on every call instead of retrieving matching rows. Together with
//! the 30-turn history window this bounds the prompt size.
//!
//! ## Layout
//!
//! ```text
//! [user]  สวัสดี                      <- prior turns, verbatim
//! [model] สวัสดีครับ! ...
//! ...
//! [user]  <context string>question from user: <message>
//! ```
//!
use super::dataset::ReferenceTable;
use super::history::{Role, SessionHistory};
use serde::Serialize;

/// Rows of the reference table included in the context string.
pub const MAX_CONTEXT_ROWS: usize = 100;

/// Prefix placed between the context string and the user's message.
pub const USER_QUESTION_PREFIX: &str = "question from user: ";

/// Persona and behavior rules sent with every generation call.
pub const SYSTEM_INSTRUCTION: &str = "คุณคือ Statbot ผู้ช่วยอัจฉริยะของมหาวิทยาลัยมหาสารคาม\n\
ตอบคำถามจากข้อมูลในฐานข้อมูลที่ให้มาเป็นหลัก\n\
ตอบเป็นภาษาไทย สุภาพ เป็นมิตร ชัดเจน\n\
ตอบสั้นกระชับ อ่านง่าย ใช้ emoji นิดหน่อย 😊\n\
ถ้าไม่มีข้อมูลในฐานข้อมูล ให้บอกว่า 'ขออภัยครับ ข้อมูลนี้ยังไม่มีในระบบ ลองติดต่องานทะเบียนโดยตรงนะครับ'";

const CONTEXT_HEADER: &str = "นี่คือข้อมูลจากฐานข้อมูลมหาวิทยาลัยมหาสารคาม (ข้อมูลล่าสุด):";

const CONTEXT_INSTRUCTION: &str = "โปรดใช้ข้อมูลนี้ตอบคำถามของผู้ใช้ให้ถูกต้องที่สุด \
ถ้าไม่มีข้อมูลที่เกี่ยวข้อง ให้บอกสุภาพว่า 'ขออภัยครับ ข้อมูลนี้ยังไม่มีในระบบ'";

/// One role-tagged block of prompt text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentBlock {
    pub role: Role,
    pub text: String,
}

/// Ordered blocks submitted to a single generation call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptContents {
    blocks: Vec<ContentBlock>,
}

impl PromptContents {
    pub fn blocks(&self) -> &[ContentBlock] {
        &self.blocks
    }

    pub fn last(&self) -> Option<&ContentBlock> {
        self.blocks.last()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Reference-data text prepended to the newest user message.
///
/// Empty when there is no table or the table has no rows.
pub fn context_string(table: Option<&ReferenceTable>) -> String {
    match table {
        Some(table) if !table.is_empty() => format!(
            "{}\n{}\n\n{}\n\n",
            CONTEXT_HEADER,
            table.render(MAX_CONTEXT_ROWS),
            CONTEXT_INSTRUCTION
        ),
        _ => String::new(),
    }
}

/// Builds the blocks for one generation call.
///
/// `history` must already end with the turn for `user_message`; that turn is
/// replaced by the context-carrying final block.
pub fn compose(
    table: Option<&ReferenceTable>,
    history: &SessionHistory,
    user_message: &str,
) -> PromptContents {
    let turns = history.turns();
    let prior = &turns[..turns.len().saturating_sub(1)];

    let mut blocks: Vec<ContentBlock> = prior
        .iter()
        .map(|turn| ContentBlock {
            role: turn.role(),
            text: turn.text().to_string(),
        })
        .collect();

    blocks.push(ContentBlock {
        role: Role::User,
        text: format!(
            "{}{}{}",
            context_string(table),
            USER_QUESTION_PREFIX,
            user_message
        ),
    });

    PromptContents { blocks }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::history::{Turn, GREETING_MODEL, GREETING_USER};

    fn history_with(message: &str) -> SessionHistory {
        let mut history = SessionHistory::seeded();
        history.append(Turn::user(message));
        history
    }

    #[test]
    fn test_tuition_scenario() {
        let table = ReferenceTable::parse("Q,A\ntuition deadline,March 31\n").unwrap();
        let context = context_string(Some(&table));
        assert!(context.contains("tuition deadline"));
        assert!(context.contains("March 31"));

        let contents = compose(Some(&table), &history_with("when is tuition due"), "when is tuition due");
        let last = contents.last().unwrap();
        assert_eq!(last.role, Role::User);
        assert_eq!(
            last.text,
            format!("{}question from user: when is tuition due", context)
        );
    }

    #[test]
    fn test_no_dataset_scenario() {
        assert_eq!(context_string(None), "");

        let contents = compose(None, &history_with("hello"), "hello");
        assert_eq!(contents.last().unwrap().text, "question from user: hello");
    }

    #[test]
    fn test_empty_table_gives_empty_context() {
        let table = ReferenceTable::parse("Q,A\n").unwrap();
        assert_eq!(context_string(Some(&table)), "");
    }

    #[test]
    fn test_prior_turns_are_verbatim() {
        let mut history = SessionHistory::seeded();
        history.append(Turn::user("first question"));
        history.append(Turn::model("first answer"));
        history.append(Turn::user("second question"));

        let contents = compose(None, &history, "second question");
        assert_eq!(contents.len(), 5);
        let blocks = contents.blocks();
        assert_eq!((blocks[0].role, blocks[0].text.as_str()), (Role::User, GREETING_USER));
        assert_eq!((blocks[1].role, blocks[1].text.as_str()), (Role::Model, GREETING_MODEL));
        assert_eq!((blocks[2].role, blocks[2].text.as_str()), (Role::User, "first question"));
        assert_eq!((blocks[3].role, blocks[3].text.as_str()), (Role::Model, "first answer"));
        assert_eq!(blocks[4].text, "question from user: second question");
    }

    #[test]
    fn test_context_covers_every_row_up_to_limit() {
        let mut csv = String::from("Q,A\n");
        for i in 0..MAX_CONTEXT_ROWS {
            csv.push_str(&format!("question-{:03},answer-{:03}\n", i, i));
        }
        let table = ReferenceTable::parse(&csv).unwrap();
        let context = context_string(Some(&table));
        for i in 0..MAX_CONTEXT_ROWS {
            assert!(context.contains(&format!("question-{:03}", i)));
        }
    }

    #[test]
    fn test_context_truncates_after_limit() {
        let mut csv = String::from("Q\n");
        for i in 0..(MAX_CONTEXT_ROWS + 20) {
            csv.push_str(&format!("row-{:03}\n", i));
        }
        let table = ReferenceTable::parse(&csv).unwrap();
        let context = context_string(Some(&table));
        assert!(context.contains("row-099"));
        assert!(!context.contains("row-100"));
        assert!(!context.contains("row-119"));
    }

    #[test]
    fn test_context_framing() {
        let table = ReferenceTable::parse("Q,A\nq,a\n").unwrap();
        let context = context_string(Some(&table));
        assert!(context.starts_with(CONTEXT_HEADER));
        assert!(context.ends_with("ยังไม่มีในระบบ'\n\n"));
    }
}
