//! Request and response bodies

use serde::{Deserialize, Serialize};

use lr_core::{CourseAnalytics, QueryOutcome, Source};

#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    #[serde(alias = "query")]
    pub question: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl QueryRequest {
    /// Session id to continue, ignoring blank values sent by the frontend
    pub fn session(&self) -> Option<&str> {
        self.session_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub answer: String,
    pub sources: Vec<Source>,
    pub session_id: String,
}

impl From<QueryOutcome> for QueryResponse {
    fn from(outcome: QueryOutcome) -> Self {
        Self {
            answer: outcome.answer,
            sources: outcome.sources,
            session_id: outcome.session_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseStats {
    pub count: usize,
    pub titles: Vec<String>,
}

impl From<CourseAnalytics> for CourseStats {
    fn from(analytics: CourseAnalytics) -> Self {
        Self {
            count: analytics.count,
            titles: analytics.titles,
        }
    }
}
