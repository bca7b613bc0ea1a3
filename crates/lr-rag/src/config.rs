//! Retrieval configuration

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

use lr_core::{Error, Result};

/// Configuration for chunking, retrieval and conversation memory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagConfig {
    /// Maximum characters per chunk
    pub chunk_size: usize,
    /// Characters shared by consecutive chunks
    pub chunk_overlap: usize,
    /// Chunks returned per search
    pub max_results: usize,
    /// Exchanges remembered per session
    pub max_history: usize,
    /// Qdrant endpoint; `None` keeps everything in memory
    pub qdrant_url: Option<String>,
    pub collection_prefix: String,
    /// OpenAI-compatible embeddings endpoint; `None` uses the local hash embedder
    pub embedding_url: Option<String>,
    pub embedding_model: String,
    pub embedding_dimension: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 100,
            max_results: 5,
            max_history: 2,
            qdrant_url: None,
            collection_prefix: "lessonrag".to_string(),
            embedding_url: None,
            embedding_model: "all-MiniLM-L6-v2".to_string(),
            embedding_dimension: 384,
        }
    }
}

impl RagConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let config = Self {
            chunk_size: parse_var("CHUNK_SIZE", defaults.chunk_size)?,
            chunk_overlap: parse_var("CHUNK_OVERLAP", defaults.chunk_overlap)?,
            max_results: parse_var("MAX_RESULTS", defaults.max_results)?,
            max_history: parse_var("MAX_HISTORY", defaults.max_history)?,
            qdrant_url: non_empty_var("QDRANT_URL"),
            collection_prefix: non_empty_var("COLLECTION_PREFIX")
                .unwrap_or(defaults.collection_prefix),
            embedding_url: non_empty_var("EMBEDDING_URL"),
            embedding_model: non_empty_var("EMBEDDING_MODEL")
                .unwrap_or(defaults.embedding_model),
            embedding_dimension: parse_var("EMBEDDING_DIMENSION", defaults.embedding_dimension)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the chunker and store cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Configuration("CHUNK_SIZE must be positive".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::Configuration(format!(
                "CHUNK_OVERLAP ({}) must be smaller than CHUNK_SIZE ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.max_results == 0 {
            return Err(Error::Configuration("MAX_RESULTS must be positive".to_string()));
        }
        if self.embedding_dimension == 0 {
            return Err(Error::Configuration(
                "EMBEDDING_DIMENSION must be positive".to_string(),
            ));
        }
        for (name, value) in [("QDRANT_URL", &self.qdrant_url), ("EMBEDDING_URL", &self.embedding_url)] {
            if let Some(raw) = value {
                url::Url::parse(raw)
                    .map_err(|e| Error::Configuration(format!("{} is not a valid URL: {}", name, e)))?;
            }
        }
        Ok(())
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T> {
    match non_empty_var(name) {
        Some(raw) => raw.trim().parse().map_err(|_| {
            Error::Configuration(format!("{} has an invalid value: {}", name, raw))
        }),
        None => Ok(default),
    }
}
