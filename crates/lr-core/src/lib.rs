//! Core traits and types for lessonrag
//!
//! This crate defines the fundamental traits and types used across the system.
//! It provides capability-facing interfaces for chat providers, vector stores,
//! embedders, model-invoked tools and session stores, so every collaborator
//! can be swapped for a fake in tests.

pub mod document;
pub mod embedder;
pub mod error;
pub mod llm;
pub mod session;
pub mod tool;
pub mod types;
pub mod vector_store;


pub use document::{Course, CourseChunk, Lesson};
pub use embedder::Embedder;
pub use error::{Error, Result};
pub use llm::{
    ChatProvider, ChatRequest, ChatResponse, ContentBlock, Message, Role, StopReason,
    ToolDefinition,
};
pub use session::{SessionStore, Turn, format_history};
pub use tool::{Tool, ToolOutput};
pub use types::*;
pub use vector_store::{ContentFilter, SearchFilter, SearchHit, SearchResults, VectorStore};
