//! Answer generation over a hosted chat model with tool calling

use std::sync::Arc;
use tracing::{debug, info, warn};

use lr_core::{
    ChatProvider, ChatRequest, ChatResponse, ContentBlock, GeneratedAnswer, Message, Result,
    Role, Source,
};

use crate::search_tool::ToolRegistry;

const SYSTEM_PROMPT: &str = "\
You are an assistant for questions about course materials, with access to a search tool over the course content.

Search tool usage:
- Use the search tool only for questions about specific course content or detailed educational material
- One search per query at most
- Synthesize the search results into accurate, fact-based answers
- If the search yields no results, say so clearly without offering alternatives

Response protocol:
- General knowledge questions: answer from existing knowledge without searching
- Course-specific questions: search first, then answer
- No meta-commentary: do not mention the search, your reasoning, or the tool results; give the answer only

All responses must be brief and focused, educational, clear, and supported by examples when they help.";

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub input: serde_json::Value,
}

/// What a model reply asks of the caller
#[derive(Debug, Clone, PartialEq)]
pub enum ModelTurn {
    /// Final text, nothing left to run
    Answer(String),
    /// The model wants these tools run before it answers
    ToolCalls(Vec<ToolCall>),
}

impl ModelTurn {
    pub fn classify(response: &ChatResponse) -> Self {
        let calls: Vec<ToolCall> = response
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::ToolUse { id, name, input } => Some(ToolCall {
                    id: id.clone(),
                    name: name.clone(),
                    input: input.clone(),
                }),
                _ => None,
            })
            .collect();

        if calls.is_empty() {
            ModelTurn::Answer(response.text())
        } else {
            ModelTurn::ToolCalls(calls)
        }
    }
}

/// Generates answers, running at most one round of tool calls
pub struct AiGenerator {
    provider: Arc<dyn ChatProvider>,
    temperature: f32,
}

impl AiGenerator {
    pub fn new(provider: Arc<dyn ChatProvider>) -> Self {
        Self {
            provider,
            temperature: 0.0,
        }
    }

    pub fn model_id(&self) -> &str {
        self.provider.model_id()
    }

    fn system_prompt(history: Option<&str>) -> String {
        match history {
            Some(history) if !history.trim().is_empty() => {
                format!("{}\n\nPrevious conversation:\n{}", SYSTEM_PROMPT, history)
            }
            _ => SYSTEM_PROMPT.to_string(),
        }
    }

    /// Answer `query`, letting the model call tools from `tools` once
    pub async fn generate_response(
        &self,
        query: &str,
        history: Option<&str>,
        tools: Option<&ToolRegistry>,
    ) -> Result<GeneratedAnswer> {
        let system = Self::system_prompt(history);
        let mut messages = vec![Message::user(query)];

        let request = ChatRequest {
            system: system.clone(),
            messages: messages.clone(),
            tools: tools.map(|t| t.definitions()).unwrap_or_default(),
            temperature: self.temperature,
        };
        debug!(model = %self.model_id(), tools = request.tools.len(), "Requesting completion");
        let response = self.provider.complete(&request).await?;

        let (calls, registry) = match (ModelTurn::classify(&response), tools) {
            (ModelTurn::Answer(answer), _) => {
                return Ok(GeneratedAnswer {
                    answer,
                    sources: Vec::new(),
                });
            }
            (ModelTurn::ToolCalls(_), None) => {
                warn!("Model requested a tool but none were offered");
                return Ok(GeneratedAnswer {
                    answer: response.text(),
                    sources: Vec::new(),
                });
            }
            (ModelTurn::ToolCalls(calls), Some(registry)) => (calls, registry),
        };

        let mut sources: Vec<Source> = Vec::new();
        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            info!(tool = %call.name, input = %call.input, "Running tool");
            let block = match registry.execute(&call.name, &call.input).await {
                Ok(output) => {
                    for source in output.sources {
                        if !sources.contains(&source) {
                            sources.push(source);
                        }
                    }
                    ContentBlock::ToolResult {
                        tool_use_id: call.id,
                        content: output.content,
                        is_error: false,
                    }
                }
                Err(e) => {
                    warn!(tool = %call.name, error = %e, "Tool call failed");
                    ContentBlock::ToolResult {
                        tool_use_id: call.id,
                        content: e.to_string(),
                        is_error: true,
                    }
                }
            };
            results.push(block);
        }

        let assistant_content: Vec<ContentBlock> = response
            .content
            .into_iter()
            .filter(|block| !matches!(block, ContentBlock::Unsupported))
            .collect();
        messages.push(Message::assistant(assistant_content));
        messages.push(Message {
            role: Role::User,
            content: results,
        });

        // Tools are withheld so the second reply has to be the answer
        let follow_up = ChatRequest {
            system,
            messages,
            tools: Vec::new(),
            temperature: self.temperature,
        };
        let final_response = self.provider.complete(&follow_up).await?;

        Ok(GeneratedAnswer {
            answer: final_response.text(),
            sources,
        })
    }
}
