//! Common types used across the lessonrag system

use serde::{Deserialize, Serialize};

/// A reference to the course material an answer drew on
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Source {
    pub course_title: String,
    pub lesson_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lesson_link: Option<String>,
}

impl Source {
    /// Human readable label, e.g. `Intro to RAG - Lesson 2`
    pub fn label(&self) -> String {
        match self.lesson_number {
            Some(n) => format!("{} - Lesson {}", self.course_title, n),
            None => self.course_title.clone(),
        }
    }
}

/// Answer text plus the sources collected while producing it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedAnswer {
    pub answer: String,
    pub sources: Vec<Source>,
}

/// Result of one question against the RAG system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOutcome {
    pub answer: String,
    pub sources: Vec<Source>,
    pub session_id: String,
}

/// Catalog statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseAnalytics {
    pub count: usize,
    pub titles: Vec<String>,
}
