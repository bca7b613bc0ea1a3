//! Anthropic integration for lessonrag
//!
//! This crate provides the Anthropic Messages API implementation of the
//! ChatProvider trait, including tool-use content blocks.

mod client;
mod config;

#[cfg(test)]
mod tests;

pub use client::AnthropicClient;
pub use config::{AnthropicConfig, DEFAULT_BASE_URL, DEFAULT_MAX_TOKENS};

// Re-export core types for convenience
pub use lr_core::{ChatProvider, ChatRequest, ChatResponse, Error, Result};
