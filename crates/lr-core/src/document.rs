//! Course documents and the chunks cut from them

use serde::{Deserialize, Serialize};

/// A lesson inside a course document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub lesson_number: u32,
    pub title: String,
    pub lesson_link: Option<String>,
}

/// A course parsed from a document header and its lesson markers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    /// Course titles double as catalog identifiers
    pub title: String,
    pub course_link: Option<String>,
    pub instructor: Option<String>,
    pub lessons: Vec<Lesson>,
}

impl Course {
    /// Create a course with only a title
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            course_link: None,
            instructor: None,
            lessons: Vec::new(),
        }
    }

    /// Look up a lesson by number
    pub fn lesson(&self, lesson_number: u32) -> Option<&Lesson> {
        self.lessons.iter().find(|l| l.lesson_number == lesson_number)
    }
}

/// A bounded span of course text, the unit of retrieval.
///
/// Chunks are never mutated after the document processor emits them.
/// `chunk_index` is contiguous across the whole source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseChunk {
    pub text: String,
    pub course_title: String,
    pub lesson_number: Option<u32>,
    pub chunk_index: usize,
}

impl CourseChunk {
    /// Stable identifier derived from the owning course and position.
    ///
    /// The index follows the last `#`, so distinct titles never share a key.
    pub fn key(&self) -> String {
        format!("{}#{}", self.course_title, self.chunk_index)
    }
}
