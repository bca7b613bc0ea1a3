//! RAG system orchestration

use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use lr_core::{
    ChatProvider, Course, CourseAnalytics, QueryOutcome, Result, SessionStore, VectorStore,
};

use crate::config::RagConfig;
use crate::document_processor::{DocumentProcessor, ProcessedCourse, is_course_file};
use crate::embedder::HashEmbedder;
use crate::generator::AiGenerator;
use crate::search_tool::{CourseSearchTool, ToolRegistry};
use crate::session::InMemorySessionStore;
use crate::vector_store::LocalVectorStore;

/// Files parsed concurrently during folder ingestion
const PARSE_CONCURRENCY: usize = 4;

/// Outcome of a folder ingestion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub courses_added: usize,
    pub chunks_added: usize,
}

/// Ties document processing, retrieval, generation and sessions together
pub struct RagSystem {
    config: RagConfig,
    processor: DocumentProcessor,
    store: Arc<dyn VectorStore>,
    sessions: Arc<dyn SessionStore>,
    generator: AiGenerator,
    tools: ToolRegistry,
}

impl RagSystem {
    pub fn new(
        config: RagConfig,
        provider: Arc<dyn ChatProvider>,
        store: Arc<dyn VectorStore>,
        sessions: Arc<dyn SessionStore>,
    ) -> Result<Self> {
        config.validate()?;
        let processor = DocumentProcessor::from_config(&config)?;

        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(CourseSearchTool::new(
            store.clone(),
            config.max_results,
        )));

        Ok(Self {
            config,
            processor,
            store,
            sessions,
            generator: AiGenerator::new(provider),
            tools,
        })
    }

    /// In-memory store with the hash embedder and in-memory sessions
    pub fn in_memory(config: RagConfig, provider: Arc<dyn ChatProvider>) -> Result<Self> {
        let embedder = Arc::new(HashEmbedder::new(config.embedding_dimension));
        let store = Arc::new(LocalVectorStore::new(embedder));
        let sessions = Arc::new(InMemorySessionStore::new(config.max_history));
        Self::new(config, provider, store, sessions)
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    async fn store_course(&self, processed: &ProcessedCourse) -> Result<usize> {
        self.store.add_course_metadata(&processed.course).await?;
        self.store
            .delete_course_content(&processed.course.title)
            .await?;
        self.store.add_course_content(&processed.chunks).await?;
        Ok(processed.chunks.len())
    }

    /// Parse one course file and store its catalog entry and chunks
    pub async fn add_course_document(&self, path: &Path) -> Result<(Course, usize)> {
        let processed = self.processor.process_course_file(path).await?;
        let chunks = self.store_course(&processed).await?;
        info!(
            course = %processed.course.title,
            chunks,
            path = %path.display(),
            "Added course document"
        );
        Ok((processed.course, chunks))
    }

    /// Ingest every `.txt` course file in `dir`.
    ///
    /// Courses already in the catalog are skipped unless `clear_existing`
    /// wipes the store first. Files that fail to parse are logged and skipped.
    pub async fn add_course_folder(&self, dir: &Path, clear_existing: bool) -> Result<IngestReport> {
        let mut report = IngestReport::default();

        if clear_existing {
            info!("Clearing existing course data");
            self.store.clear().await?;
        }

        if !tokio::fs::try_exists(dir).await.unwrap_or(false) {
            warn!(path = %dir.display(), "Course folder does not exist");
            return Ok(report);
        }

        let mut paths: Vec<PathBuf> = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_file() && is_course_file(&path) {
                paths.push(path);
            }
        }
        paths.sort();
        debug!(files = paths.len(), path = %dir.display(), "Found course files");

        let mut known: HashSet<String> = self.store.course_titles().await?.into_iter().collect();

        let processor = &self.processor;
        let parsed: Vec<(PathBuf, Result<ProcessedCourse>)> = stream::iter(paths)
            .map(move |path| async move {
                let result = processor.process_course_file(&path).await;
                (path, result)
            })
            .buffered(PARSE_CONCURRENCY)
            .collect()
            .await;

        for (path, result) in parsed {
            let processed = match result {
                Ok(processed) => processed,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping course file");
                    continue;
                }
            };

            let title = processed.course.title.clone();
            if known.contains(&title) {
                info!(course = %title, "Course already loaded");
                continue;
            }

            match self.store_course(&processed).await {
                Ok(chunks) => {
                    info!(course = %title, chunks, "Added new course");
                    report.courses_added += 1;
                    report.chunks_added += chunks;
                    known.insert(title);
                }
                Err(e) => warn!(course = %title, error = %e, "Failed to store course"),
            }
        }

        Ok(report)
    }

    /// Answer a question, continuing `session_id` or starting a new session.
    ///
    /// A new session is only created once the model has answered.
    pub async fn query(&self, question: &str, session_id: Option<&str>) -> Result<QueryOutcome> {
        let history = match session_id {
            Some(id) => self.sessions.history(id)?,
            None => None,
        };

        let prompt = format!("Answer this question about course materials: {}", question);
        let generated = self
            .generator
            .generate_response(&prompt, history.as_deref(), Some(&self.tools))
            .await?;

        let session_id = match session_id {
            Some(id) => id.to_string(),
            None => self.sessions.create_session()?,
        };

        self.sessions
            .add_exchange(&session_id, question, &generated.answer)?;

        Ok(QueryOutcome {
            answer: generated.answer,
            sources: generated.sources,
            session_id,
        })
    }

    /// Number and titles of the courses in the catalog
    pub async fn course_analytics(&self) -> Result<CourseAnalytics> {
        let titles = self.store.course_titles().await?;
        Ok(CourseAnalytics {
            count: titles.len(),
            titles,
        })
    }
}
