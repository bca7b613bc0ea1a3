//! Retrieval-augmented question answering over course materials
//!
//! This crate provides document processing, embedders, vector stores, the
//! course search tool, session storage, answer generation and the
//! [`RagSystem`] that ties them together.

pub mod config;
pub mod document_processor;
pub mod embedder;
pub mod engine;
pub mod generator;
pub mod search_tool;
pub mod session;
pub mod vector_store;


pub use config::RagConfig;
pub use document_processor::{DocumentProcessor, ProcessedCourse};
pub use embedder::{HashEmbedder, HttpEmbedder};
pub use engine::{IngestReport, RagSystem};
pub use generator::{AiGenerator, ModelTurn, ToolCall};
pub use search_tool::{CourseSearchTool, SEARCH_TOOL_NAME, ToolRegistry};
pub use session::InMemorySessionStore;
pub use vector_store::{LocalVectorStore, QdrantVectorStore};

// Re-export core types for convenience
pub use lr_core::{
    ChatProvider, CourseAnalytics, Embedder, Error, QueryOutcome, Result, SessionStore, Source,
    VectorStore,
};
