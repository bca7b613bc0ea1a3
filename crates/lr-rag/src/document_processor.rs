//! Course document parsing and chunking
//!
//! Course files are plain text with a short header followed by lesson blocks:
//!
//! ```text
//! Course Title: Building Towards Computer Use
//! Course Link: https://example.com/course
//! Course Instructor: Colt Steele
//!
//! Lesson 0: Introduction
//! Lesson Link: https://example.com/lesson-0
//! Lesson body text...
//! ```

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, warn};

use lr_core::{Course, CourseChunk, Error, Lesson, Result};

use crate::config::RagConfig;

static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^course\s+(\w+)\s*:\s*(.*)$").expect("valid regex"));
static LESSON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^lesson\s+(\d+)\s*:\s*(.+)$").expect("valid regex"));
static LESSON_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^lesson\s+link\s*:\s*(.+)$").expect("valid regex"));

/// A parsed course and the chunks cut from its body
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedCourse {
    pub course: Course,
    pub chunks: Vec<CourseChunk>,
}

enum HeaderLine {
    Title(String),
    Link(String),
    Instructor(String),
    Malformed,
    NotHeader,
}

fn classify_header(line: &str) -> HeaderLine {
    let Some(caps) = HEADER_RE.captures(line) else {
        return HeaderLine::NotHeader;
    };
    let value = caps[2].trim().to_string();
    if value.is_empty() {
        return HeaderLine::Malformed;
    }
    match caps[1].to_lowercase().as_str() {
        "title" => HeaderLine::Title(value),
        "link" => HeaderLine::Link(value),
        "instructor" => HeaderLine::Instructor(value),
        _ => HeaderLine::Malformed,
    }
}

/// Splits course files into overlapping, sentence-aligned chunks
#[derive(Debug, Clone)]
pub struct DocumentProcessor {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl DocumentProcessor {
    /// Create a processor; the overlap must be smaller than the chunk size
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 || chunk_overlap >= chunk_size {
            return Err(Error::Configuration(format!(
                "invalid chunking parameters: size {}, overlap {}",
                chunk_size, chunk_overlap
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn from_config(config: &RagConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Chunk text into pieces of at most `chunk_size` characters.
    ///
    /// Whitespace is collapsed first. Whole sentences are packed greedily and
    /// the next chunk restarts at the trailing sentences that fit in
    /// `chunk_overlap`. A sentence longer than `chunk_size` is cut into fixed
    /// windows overlapping by exactly `chunk_overlap` characters.
    pub fn chunk_text(&self, text: &str) -> Vec<String> {
        let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let sentences = split_sentences(&normalized);
        let mut chunks = Vec::new();
        let mut i = 0;

        while i < sentences.len() {
            if char_len(sentences[i]) > self.chunk_size {
                chunks.extend(self.split_windows(sentences[i]));
                i += 1;
                continue;
            }

            let mut current: Vec<&str> = Vec::new();
            let mut size = 0;
            for &sentence in &sentences[i..] {
                let addition = char_len(sentence) + usize::from(!current.is_empty());
                if size + addition > self.chunk_size {
                    break;
                }
                current.push(sentence);
                size += addition;
            }

            chunks.push(current.join(" "));
            if i + current.len() >= sentences.len() {
                break;
            }

            let mut overlap_size = 0;
            let mut overlap_sentences = 0;
            for (k, sentence) in current.iter().enumerate().rev() {
                let len = char_len(sentence) + usize::from(k + 1 < current.len());
                if overlap_size + len > self.chunk_overlap {
                    break;
                }
                overlap_size += len;
                overlap_sentences += 1;
            }

            // Keep the overlap only when the next sentence still fits after it
            let next = i + current.len();
            if overlap_sentences > 0
                && overlap_size + 1 + char_len(sentences[next]) > self.chunk_size
            {
                overlap_sentences = 0;
            }

            i = (next - overlap_sentences).max(i + 1);
        }

        chunks
    }

    /// Fixed character windows for text with no usable sentence boundary
    fn split_windows(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let mut windows = Vec::new();
        let mut start = 0;

        while start < chars.len() {
            let end = (start + self.chunk_size).min(chars.len());
            windows.push(chars[start..end].iter().collect());

            if end >= chars.len() {
                break;
            }

            start = end - self.chunk_overlap;
        }

        windows
    }

    /// Parse a course document and chunk every lesson body.
    ///
    /// `fallback_title` is used when the header carries no title. Text before
    /// the first lesson marker, or the whole body when there are no lesson
    /// markers, becomes course-level chunks with no lesson number.
    pub fn parse_course(&self, content: &str, fallback_title: &str) -> Result<ProcessedCourse> {
        let mut title: Option<String> = None;
        let mut course_link = None;
        let mut instructor = None;

        let lines: Vec<&str> = content.lines().collect();
        let mut body_start = lines.len();

        for (idx, raw) in lines.iter().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            if LESSON_RE.is_match(line) {
                body_start = idx;
                break;
            }
            match classify_header(line) {
                HeaderLine::Title(value) => title = Some(value),
                HeaderLine::Link(value) => course_link = Some(value),
                HeaderLine::Instructor(value) => instructor = Some(value),
                HeaderLine::Malformed => {
                    warn!(line = idx + 1, "Skipping malformed header line: {}", line);
                }
                HeaderLine::NotHeader => {
                    // A bare first line names the course, as in older exports
                    if title.is_none() && course_link.is_none() && instructor.is_none() {
                        title = Some(line.to_string());
                        continue;
                    }
                    body_start = idx;
                    break;
                }
            }
        }

        let title = match title {
            Some(t) => t,
            None => {
                let fallback = fallback_title.trim();
                if fallback.is_empty() {
                    return Err(Error::DocumentProcessing(
                        "course document has no title".to_string(),
                    ));
                }
                warn!("No course title found, using '{}'", fallback);
                fallback.to_string()
            }
        };

        let mut course = Course {
            title,
            course_link,
            instructor,
            lessons: Vec::new(),
        };
        let mut chunks = Vec::new();

        let mut section_lesson: Option<u32> = None;
        let mut section_body: Vec<&str> = Vec::new();
        let mut idx = body_start;

        while idx < lines.len() {
            let line = lines[idx].trim();

            if let Some(caps) = LESSON_RE.captures(line) {
                self.flush_section(&course.title, section_lesson, &section_body, &mut chunks);
                section_body.clear();

                let lesson_number: u32 = caps[1].parse().map_err(|_| {
                    Error::DocumentProcessing(format!("lesson number out of range: {}", &caps[1]))
                })?;
                let mut lesson = Lesson {
                    lesson_number,
                    title: caps[2].trim().to_string(),
                    lesson_link: None,
                };

                if let Some(next) = lines.get(idx + 1) {
                    if let Some(link) = LESSON_LINK_RE.captures(next.trim()) {
                        lesson.lesson_link = Some(link[1].trim().to_string());
                        idx += 1;
                    }
                }

                course.lessons.push(lesson);
                section_lesson = Some(lesson_number);
            } else {
                section_body.push(line);
            }

            idx += 1;
        }
        self.flush_section(&course.title, section_lesson, &section_body, &mut chunks);

        debug!(
            course = %course.title,
            lessons = course.lessons.len(),
            chunks = chunks.len(),
            "Parsed course document"
        );

        Ok(ProcessedCourse { course, chunks })
    }

    fn flush_section(
        &self,
        course_title: &str,
        lesson_number: Option<u32>,
        body: &[&str],
        chunks: &mut Vec<CourseChunk>,
    ) {
        let text = body.join("\n");
        let pieces = self.chunk_text(&text);
        if pieces.is_empty() {
            if let Some(n) = lesson_number {
                debug!(course = %course_title, lesson = n, "Lesson body is empty");
            }
            return;
        }

        for piece in pieces {
            let chunk_index = chunks.len();
            chunks.push(CourseChunk {
                text: piece,
                course_title: course_title.to_string(),
                lesson_number,
                chunk_index,
            });
        }
    }

    /// Read and parse a course file, falling back to the file stem as title
    pub async fn process_course_file(&self, path: &Path) -> Result<ProcessedCourse> {
        let content = tokio::fs::read_to_string(path).await?;
        let fallback = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.parse_course(&content, &fallback)
    }
}

/// Whether a path looks like an ingestible course file
pub fn is_course_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"))
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Split normalized text at `.`, `!` or `?` followed by a space and an
/// uppercase letter. Dotted abbreviations (`e.g.`) and short titles (`Dr.`)
/// do not end a sentence.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let Some(&(space_idx, ' ')) = chars.peek() else {
            continue;
        };
        let next_is_upper = text[space_idx + 1..]
            .chars()
            .next()
            .is_some_and(char::is_uppercase);
        if !next_is_upper {
            continue;
        }
        if c == '.' && is_abbreviation(&text[start..idx]) {
            continue;
        }

        let sentence = text[start..=idx].trim();
        if !sentence.is_empty() {
            sentences.push(sentence);
        }
        start = space_idx + 1;
    }

    let rest = text[start..].trim();
    if !rest.is_empty() {
        sentences.push(rest);
    }
    sentences
}

fn is_abbreviation(before_dot: &str) -> bool {
    let word = before_dot.rsplit(' ').next().unwrap_or("");
    if word.contains('.') {
        return true;
    }
    let mut chars = word.chars();
    matches!(
        (chars.next(), chars.next(), chars.next()),
        (Some(a), Some(b), None) if a.is_uppercase() && b.is_lowercase()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const COURSE: &str = "Course Title: Building Towards Computer Use
Course Link: https://example.com/computer-use
Course Instructor: Colt Steele

Lesson 0: Introduction
Lesson Link: https://example.com/computer-use/lesson-0
Welcome to the course. We will build an agent that uses a computer.

Lesson 1: Working With The API
Lesson Link: https://example.com/computer-use/lesson-1
The messages endpoint takes a list of turns. Each turn has a role.

Lesson 2: Empty Lesson
";

    #[test]
    fn test_split_sentences() {
        let sentences = split_sentences("First one. Second one! Third, e.g. this. Dr. Who? yes.");
        assert_eq!(
            sentences,
            vec!["First one.", "Second one!", "Third, e.g. this.", "Dr. Who? yes."]
        );
    }

    #[test]
    fn test_parse_course_header_and_lessons() {
        let processor = DocumentProcessor::new(800, 100).unwrap();
        let processed = processor.parse_course(COURSE, "fallback").unwrap();
        let course = &processed.course;

        assert_eq!(course.title, "Building Towards Computer Use");
        assert_eq!(course.instructor.as_deref(), Some("Colt Steele"));
        assert_eq!(
            course.course_link.as_deref(),
            Some("https://example.com/computer-use")
        );
        assert_eq!(course.lessons.len(), 3);
        assert_eq!(
            course.lesson(1).and_then(|l| l.lesson_link.as_deref()),
            Some("https://example.com/computer-use/lesson-1")
        );

        // Lesson 2 has no body and yields no chunk
        let lessons: Vec<_> = processed.chunks.iter().map(|c| c.lesson_number).collect();
        assert_eq!(lessons, vec![Some(0), Some(1)]);
        let indices: Vec<_> = processed.chunks.iter().map(|c| c.chunk_index).collect();
        assert_eq!(indices, vec![0, 1]);
        assert!(processed.chunks[1].text.starts_with("The messages endpoint"));
    }

    #[test]
    fn test_malformed_header_lines_are_skipped() {
        let content = "Course Title: Prompt Compression\nCourse Level:\nCourse Instructor: Ada\nLesson 1: Start\nBody text.";
        let processor = DocumentProcessor::new(800, 100).unwrap();
        let processed = processor.parse_course(content, "x").unwrap();

        assert_eq!(processed.course.title, "Prompt Compression");
        assert_eq!(processed.course.instructor.as_deref(), Some("Ada"));
        assert_eq!(processed.chunks.len(), 1);
    }

    #[test]
    fn test_missing_title_falls_back() {
        let processor = DocumentProcessor::new(800, 100).unwrap();
        let processed = processor
            .parse_course("Course Instructor: Ada\nLesson 1: Start\nBody.", "course2_script")
            .unwrap();
        assert_eq!(processed.course.title, "course2_script");
    }

    #[test]
    fn test_document_without_lessons() {
        let processor = DocumentProcessor::new(800, 100).unwrap();
        let processed = processor
            .parse_course(
                "Course Title: Notes\nCourse Instructor: Ada\n\nJust some notes. Nothing else.",
                "x",
            )
            .unwrap();

        assert!(processed.course.lessons.is_empty());
        assert_eq!(processed.chunks.len(), 1);
        assert_eq!(processed.chunks[0].lesson_number, None);
        assert_eq!(processed.chunks[0].text, "Just some notes. Nothing else.");
    }

    #[test]
    fn test_bare_first_line_is_title() {
        let processor = DocumentProcessor::new(800, 100).unwrap();
        let processed = processor
            .parse_course("Intro to Embeddings\nLesson 1: Vectors\nVectors are lists.", "x")
            .unwrap();
        assert_eq!(processed.course.title, "Intro to Embeddings");
    }

    #[test]
    fn test_chunks_respect_size_and_overlap() {
        let processor = DocumentProcessor::new(120, 40).unwrap();
        let text = (0..30)
            .map(|i| format!("Sentence number {} talks about topic {}.", i, i % 4))
            .collect::<Vec<_>>()
            .join(" ");
        let chunks = processor.chunk_text(&text);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 120, "chunk too long: {}", chunk);
        }

        // Every chunk after the first starts with the last sentence of its predecessor
        for pair in chunks.windows(2) {
            let last_sentence = split_sentences(&pair[0]).last().copied().unwrap();
            assert!(pair[1].starts_with(last_sentence));
        }

        // Start offsets strictly increase
        let mut previous = None;
        for chunk in &chunks {
            let offset = text.find(chunk.as_str()).expect("chunk is a substring");
            if let Some(prev) = previous {
                assert!(offset > prev);
            }
            previous = Some(offset);
        }

        // The final chunk ends the text
        assert!(text.ends_with(chunks.last().unwrap().as_str()));
    }

    #[test]
    fn test_overlap_is_skipped_when_next_sentence_cannot_follow() {
        fn sentence(len: usize) -> String {
            format!("A{}.", "b".repeat(len - 2))
        }

        let processor = DocumentProcessor::new(100, 40).unwrap();
        let text = [sentence(50), sentence(30), sentence(90)].join(" ");
        let chunks = processor.chunk_text(&text);

        let lengths: Vec<usize> = chunks.iter().map(|c| c.chars().count()).collect();
        assert_eq!(lengths, vec![81, 90]);
        assert_eq!(chunks[1], sentence(90));
    }

    #[test]
    fn test_long_unbroken_text_uses_fixed_windows() {
        let processor = DocumentProcessor::new(100, 20).unwrap();
        let text = "x".repeat(1000);
        let chunks = processor.chunk_text(&text);

        // ceil((L - O) / (C - O)) = ceil(980 / 80) = 13
        assert_eq!(chunks.len(), 13);
        for pair in chunks.windows(2) {
            let tail: String = pair[0].chars().rev().take(20).collect();
            let head: String = pair[1].chars().take(20).collect();
            assert_eq!(tail, head);
        }
    }

    #[test]
    fn test_chunking_is_deterministic() {
        let processor = DocumentProcessor::new(200, 50).unwrap();
        let first = processor.parse_course(COURSE, "x").unwrap();
        let second = processor.parse_course(COURSE, "x").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        let processor = DocumentProcessor::new(100, 10).unwrap();
        assert!(processor.chunk_text("   \n\t ").is_empty());
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(DocumentProcessor::new(100, 100).is_err());
        assert!(DocumentProcessor::new(0, 0).is_err());
    }

    #[test]
    fn test_course_file_filter() {
        assert!(is_course_file(Path::new("docs/course1_script.txt")));
        assert!(is_course_file(Path::new("docs/COURSE.TXT")));
        assert!(!is_course_file(Path::new("docs/slides.pdf")));
    }

    #[tokio::test]
    async fn test_process_course_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("course1_script.txt");
        tokio::fs::write(&path, COURSE).await.unwrap();

        let processor = DocumentProcessor::new(800, 100).unwrap();
        let processed = processor.process_course_file(&path).await.unwrap();
        assert_eq!(processed.course.title, "Building Towards Computer Use");
        assert_eq!(processed.chunks.len(), 2);
    }
}
