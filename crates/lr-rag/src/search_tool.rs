//! Model-invoked tools and their registry

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use lr_core::{
    Error, Result, SearchFilter, SearchResults, Source, Tool, ToolDefinition, ToolOutput,
    VectorStore,
};

pub const SEARCH_TOOL_NAME: &str = "search_course_content";

#[derive(Debug, Deserialize)]
struct SearchInput {
    query: String,
    #[serde(default)]
    course_name: Option<String>,
    #[serde(default)]
    lesson_number: Option<u32>,
}

/// Searches course content through a [`VectorStore`]
pub struct CourseSearchTool {
    store: Arc<dyn VectorStore>,
    max_results: usize,
}

impl CourseSearchTool {
    pub fn new(store: Arc<dyn VectorStore>, max_results: usize) -> Self {
        Self { store, max_results }
    }

    async fn format_results(&self, results: &SearchResults) -> Result<ToolOutput> {
        let mut blocks = Vec::with_capacity(results.len());
        let mut sources: Vec<Source> = Vec::new();

        for hit in &results.hits {
            let header = match hit.lesson_number {
                Some(n) => format!("[{} - Lesson {}]", hit.course_title, n),
                None => format!("[{}]", hit.course_title),
            };
            blocks.push(format!("{}\n{}", header, hit.text));

            let lesson_link = match hit.lesson_number {
                Some(n) => self.store.lesson_link(&hit.course_title, n).await?,
                None => None,
            };
            let source = Source {
                course_title: hit.course_title.clone(),
                lesson_number: hit.lesson_number,
                lesson_link,
            };
            if !sources.contains(&source) {
                sources.push(source);
            }
        }

        Ok(ToolOutput {
            content: blocks.join("\n\n"),
            sources,
        })
    }
}

fn empty_message(input: &SearchInput) -> String {
    let mut message = String::from("No relevant content found");
    if let Some(ref course) = input.course_name {
        message.push_str(&format!(" in course '{}'", course));
    }
    if let Some(n) = input.lesson_number {
        message.push_str(&format!(" in lesson {}", n));
    }
    message.push('.');
    message
}

#[async_trait]
impl Tool for CourseSearchTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: SEARCH_TOOL_NAME.to_string(),
            description: "Search course materials with smart course name matching and lesson filtering"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "What to search for in the course content"
                    },
                    "course_name": {
                        "type": "string",
                        "description": "Course title (partial matches work, e.g. 'MCP', 'Introduction')"
                    },
                    "lesson_number": {
                        "type": "integer",
                        "description": "Specific lesson number to search within (e.g. 1, 2, 3)"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn execute(&self, input: &serde_json::Value) -> Result<ToolOutput> {
        let input: SearchInput = serde_json::from_value(input.clone())
            .map_err(|e| Error::InvalidInput(format!("invalid search arguments: {}", e)))?;

        let filter = SearchFilter {
            course_name: input.course_name.clone(),
            lesson_number: input.lesson_number,
        };
        debug!(query = %input.query, ?filter, "Searching course content");

        let results = match self.store.search(&input.query, &filter, self.max_results).await {
            Ok(results) => results,
            Err(err @ Error::CourseNotFound(_)) => return Ok(ToolOutput::text(err.to_string())),
            Err(err) => return Err(err),
        };

        if results.is_empty() {
            return Ok(ToolOutput::text(empty_message(&input)));
        }
        self.format_results(&results).await
    }
}

/// Tools offered to the model, looked up by name
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its advertised name, replacing any previous one
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.definition().name;
        if self.tools.insert(name.clone(), tool).is_some() {
            warn!(tool = %name, "Replacing registered tool");
        }
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|tool| tool.definition()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Run a tool by name
    pub async fn execute(&self, name: &str, input: &serde_json::Value) -> Result<ToolOutput> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| Error::ToolNotFound(name.to_string()))?;
        tool.execute(input).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::HashEmbedder;
    use crate::vector_store::LocalVectorStore;
    use lr_core::{Course, CourseChunk, Lesson};

    async fn store() -> Arc<dyn VectorStore> {
        let store = LocalVectorStore::new(Arc::new(HashEmbedder::default()));
        let mut course = Course::new("Advanced Retrieval for AI");
        course.lessons.push(Lesson {
            lesson_number: 3,
            title: "Query Expansion".to_string(),
            lesson_link: Some("https://example.com/retrieval/3".to_string()),
        });
        store.add_course_metadata(&course).await.unwrap();
        store
            .add_course_content(&[
                CourseChunk {
                    text: "Query expansion rewrites the question before retrieval.".to_string(),
                    course_title: course.title.clone(),
                    lesson_number: Some(3),
                    chunk_index: 0,
                },
                CourseChunk {
                    text: "Query expansion can also generate hypothetical answers.".to_string(),
                    course_title: course.title.clone(),
                    lesson_number: Some(3),
                    chunk_index: 1,
                },
            ])
            .await
            .unwrap();
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_search_formats_hits_and_sources() {
        let tool = CourseSearchTool::new(store().await, 5);
        let output = tool
            .execute(&json!({"query": "query expansion", "course_name": "retrieval"}))
            .await
            .unwrap();

        assert!(output.content.starts_with("[Advanced Retrieval for AI - Lesson 3]\n"));
        assert_eq!(output.content.matches("[Advanced Retrieval for AI - Lesson 3]").count(), 2);
        // Both hits come from the same lesson, so one source remains
        assert_eq!(
            output.sources,
            vec![Source {
                course_title: "Advanced Retrieval for AI".to_string(),
                lesson_number: Some(3),
                lesson_link: Some("https://example.com/retrieval/3".to_string()),
            }]
        );
    }

    #[tokio::test]
    async fn test_unknown_course_is_reported_to_model() {
        let empty = LocalVectorStore::new(Arc::new(HashEmbedder::default()));
        let tool = CourseSearchTool::new(Arc::new(empty), 5);
        let output = tool
            .execute(&json!({"query": "anything", "course_name": "Underwater Welding"}))
            .await
            .unwrap();
        assert_eq!(output.content, "No course found matching 'Underwater Welding'");
        assert!(output.sources.is_empty());
    }

    #[tokio::test]
    async fn test_empty_results_message() {
        let tool = CourseSearchTool::new(store().await, 5);
        let output = tool
            .execute(&json!({"query": "anything", "course_name": "Retrieval", "lesson_number": 9}))
            .await
            .unwrap();
        assert_eq!(
            output.content,
            "No relevant content found in course 'Retrieval' in lesson 9."
        );
    }

    #[tokio::test]
    async fn test_invalid_arguments() {
        let tool = CourseSearchTool::new(store().await, 5);
        let err = tool.execute(&json!({"course_name": "x"})).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_registry_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(CourseSearchTool::new(store().await, 5)));

        let definitions = registry.definitions();
        assert_eq!(definitions.len(), 1);
        assert_eq!(definitions[0].name, SEARCH_TOOL_NAME);

        let err = registry.execute("get_weather", &json!({})).await.unwrap_err();
        assert_eq!(err.to_string(), "Tool 'get_weather' not found");

        let output = registry
            .execute(SEARCH_TOOL_NAME, &json!({"query": "hypothetical answers"}))
            .await
            .unwrap();
        assert!(!output.sources.is_empty());
    }
}
