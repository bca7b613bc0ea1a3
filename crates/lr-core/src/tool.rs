//! Tool trait for model-invoked functions

use async_trait::async_trait;

use crate::{Result, Source, ToolDefinition};

/// What a tool hands back to the model, plus the sources it drew on
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolOutput {
    pub content: String,
    pub sources: Vec<Source>,
}

impl ToolOutput {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            sources: Vec::new(),
        }
    }
}

/// A named function the hosted model can ask the caller to run
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name, description and JSON schema advertised to the model
    fn definition(&self) -> ToolDefinition;

    /// Run the tool with the model-supplied arguments
    async fn execute(&self, input: &serde_json::Value) -> Result<ToolOutput>;
}
