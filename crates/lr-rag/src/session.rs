//! In-memory conversation sessions

use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use lr_core::{Error, Result, SessionStore, Turn};

/// Session store backed by a process-local map.
///
/// Ids are `session_1`, `session_2`, ... and are never reused within a
/// process. Each session keeps at most `max_history` turns.
pub struct InMemorySessionStore {
    max_history: usize,
    counter: AtomicU64,
    sessions: RwLock<HashMap<String, VecDeque<Turn>>>,
}

impl InMemorySessionStore {
    pub fn new(max_history: usize) -> Self {
        Self {
            max_history,
            counter: AtomicU64::new(0),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    pub fn session_count(&self) -> Result<usize> {
        let sessions = self
            .sessions
            .read()
            .map_err(|e| Error::Session(format!("Lock error: {}", e)))?;
        Ok(sessions.len())
    }
}

impl SessionStore for InMemorySessionStore {
    fn create_session(&self) -> Result<String> {
        let id = format!("session_{}", self.counter.fetch_add(1, Ordering::SeqCst) + 1);
        self.sessions
            .write()
            .map_err(|e| Error::Session(format!("Lock error: {}", e)))?
            .insert(id.clone(), VecDeque::new());
        debug!(session_id = %id, "Created session");
        Ok(id)
    }

    fn add_exchange(&self, session_id: &str, question: &str, answer: &str) -> Result<()> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|e| Error::Session(format!("Lock error: {}", e)))?;
        let turns = sessions.entry(session_id.to_string()).or_default();

        turns.push_back(Turn {
            question: question.to_string(),
            answer: answer.to_string(),
            at: Utc::now(),
        });
        while turns.len() > self.max_history {
            turns.pop_front();
        }
        Ok(())
    }

    fn turns(&self, session_id: &str) -> Result<Vec<Turn>> {
        let sessions = self
            .sessions
            .read()
            .map_err(|e| Error::Session(format!("Lock error: {}", e)))?;
        Ok(sessions
            .get(session_id)
            .map(|turns| turns.iter().cloned().collect())
            .unwrap_or_default())
    }
}
