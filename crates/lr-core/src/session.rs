//! Session store trait and types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;

/// One question/answer exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub question: String,
    pub answer: String,
    pub at: DateTime<Utc>,
}

/// Render turns as a transcript for the system prompt
pub fn format_history(turns: &[Turn]) -> String {
    turns
        .iter()
        .map(|turn| format!("User: {}\nAssistant: {}", turn.question, turn.answer))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Per-client conversation history, injected wherever it is needed.
///
/// Implementations keep at most a fixed number of turns per session and drop
/// the oldest turn first.
pub trait SessionStore: Send + Sync {
    /// Allocate a new, empty session and return its id
    fn create_session(&self) -> Result<String>;

    /// Append an exchange, creating the session if it does not exist yet
    fn add_exchange(&self, session_id: &str, question: &str, answer: &str) -> Result<()>;

    /// Turns of a session, oldest first
    fn turns(&self, session_id: &str) -> Result<Vec<Turn>>;

    /// Formatted transcript, or `None` for unknown or empty sessions
    fn history(&self, session_id: &str) -> Result<Option<String>> {
        let turns = self.turns(session_id)?;
        if turns.is_empty() {
            return Ok(None);
        }
        Ok(Some(format_history(&turns)))
    }
}
