//! Vector store trait and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Course, CourseChunk, Error, Result};

/// Optional restrictions applied to a content search
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilter {
    /// Partial or fuzzy course name, resolved against the catalog
    pub course_name: Option<String>,
    pub lesson_number: Option<u32>,
}

impl SearchFilter {
    pub fn course(mut self, name: impl Into<String>) -> Self {
        self.course_name = Some(name.into());
        self
    }

    pub fn lesson(mut self, lesson_number: u32) -> Self {
        self.lesson_number = Some(lesson_number);
        self
    }
}

/// A content filter after course-name resolution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentFilter {
    pub course_title: Option<String>,
    pub lesson_number: Option<u32>,
}

/// One matching chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub text: String,
    pub course_title: String,
    pub lesson_number: Option<u32>,
    pub chunk_index: usize,
    pub score: f32,
}

/// Search result from vector store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResults {
    pub hits: Vec<SearchHit>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }
}

/// Trait for vector stores (e.g., Qdrant or the in-memory store)
///
/// Stores hold two collections: a course catalog with one record per course,
/// and course content with one record per chunk. Similarity ranking belongs
/// entirely to the store implementation.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Store or replace the catalog record for a course
    async fn add_course_metadata(&self, course: &Course) -> Result<()>;

    /// Store or replace content chunks
    async fn add_course_content(&self, chunks: &[CourseChunk]) -> Result<()>;

    /// Remove every content chunk of a course, keeping its catalog record
    async fn delete_course_content(&self, course_title: &str) -> Result<()>;

    /// Find the catalog title closest to a partial course name
    async fn resolve_course_name(&self, course_name: &str) -> Result<Option<String>>;

    /// Top-k content chunks for a query, restricted by an already resolved filter
    async fn query_content(
        &self,
        query: &str,
        filter: &ContentFilter,
        limit: usize,
    ) -> Result<SearchResults>;

    /// Titles of every course in the catalog
    async fn course_titles(&self) -> Result<Vec<String>>;

    /// Number of courses in the catalog
    async fn course_count(&self) -> Result<usize> {
        Ok(self.course_titles().await?.len())
    }

    /// Link of a lesson, if the catalog knows one
    async fn lesson_link(&self, course_title: &str, lesson_number: u32) -> Result<Option<String>>;

    /// Drop both collections
    async fn clear(&self) -> Result<()>;

    /// Search course content.
    ///
    /// A course name in the filter is resolved against the catalog first; an
    /// unresolvable name yields [`Error::CourseNotFound`].
    async fn search(
        &self,
        query: &str,
        filter: &SearchFilter,
        limit: usize,
    ) -> Result<SearchResults> {
        let course_title = match filter.course_name.as_deref() {
            Some(name) => Some(
                self.resolve_course_name(name)
                    .await?
                    .ok_or_else(|| Error::CourseNotFound(name.to_string()))?,
            ),
            None => None,
        };

        let content_filter = ContentFilter {
            course_title,
            lesson_number: filter.lesson_number,
        };

        self.query_content(query, &content_filter, limit).await
    }
}
