//! Snapshot tests for the Anthropic client

#[cfg(test)]
mod snapshot_tests {
    use crate::client::parse_response;
    use crate::{AnthropicClient, AnthropicConfig};
    use insta::{assert_snapshot, assert_yaml_snapshot};
    use lr_core::{ChatRequest, ContentBlock, Message, Role, StopReason, ToolDefinition};
    use serde_json::json;

    fn client() -> AnthropicClient {
        AnthropicClient::new(AnthropicConfig::new("test_api_key_redacted")).unwrap()
    }

    #[test]
    fn test_config_snapshot() {
        let config = AnthropicConfig::new("test_api_key_redacted");

        assert_yaml_snapshot!(config, @r###"
        ---
        api_key: test_api_key_redacted
        model: claude-sonnet-4-20250514
        base_url: "https://api.anthropic.com"
        max_tokens: 800
        "###);
    }

    #[test]
    fn test_first_request_offers_tools() {
        let client = client();
        let request = ChatRequest {
            system: "You answer questions.".to_string(),
            messages: vec![Message::user("What is MCP?")],
            tools: vec![ToolDefinition {
                name: "search_course_content".to_string(),
                description: "Search".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {"query": {"type": "string"}},
                    "required": ["query"]
                }),
            }],
            temperature: 0.0,
        };

        let body = serde_json::to_value(client.build_request(&request)).unwrap();
        assert_eq!(
            body,
            json!({
                "model": "claude-sonnet-4-20250514",
                "max_tokens": 800,
                "temperature": 0.0,
                "system": "You answer questions.",
                "messages": [
                    {"role": "user", "content": [{"type": "text", "text": "What is MCP?"}]}
                ],
                "tools": [{
                    "name": "search_course_content",
                    "description": "Search",
                    "input_schema": {
                        "type": "object",
                        "properties": {"query": {"type": "string"}},
                        "required": ["query"]
                    }
                }],
                "tool_choice": {"type": "auto"}
            })
        );
    }

    #[test]
    fn test_follow_up_request_snapshot() {
        let client = client();
        let request = ChatRequest {
            system: "You answer questions.".to_string(),
            messages: vec![
                Message::user("What is MCP?"),
                Message::assistant(vec![ContentBlock::ToolUse {
                    id: "toolu_01".to_string(),
                    name: "search_course_content".to_string(),
                    input: json!({"query": "MCP"}),
                }]),
                Message {
                    role: Role::User,
                    content: vec![ContentBlock::ToolResult {
                        tool_use_id: "toolu_01".to_string(),
                        content: "[MCP - Lesson 1]\nServers expose tools.".to_string(),
                        is_error: false,
                    }],
                },
            ],
            tools: Vec::new(),
            temperature: 0.0,
        };

        let body = serde_json::to_string_pretty(&client.build_request(&request)).unwrap();
        assert_snapshot!(body, @r#"
        {
          "model": "claude-sonnet-4-20250514",
          "max_tokens": 800,
          "temperature": 0.0,
          "system": "You answer questions.",
          "messages": [
            {
              "role": "user",
              "content": [
                {
                  "type": "text",
                  "text": "What is MCP?"
                }
              ]
            },
            {
              "role": "assistant",
              "content": [
                {
                  "type": "tool_use",
                  "id": "toolu_01",
                  "name": "search_course_content",
                  "input": {
                    "query": "MCP"
                  }
                }
              ]
            },
            {
              "role": "user",
              "content": [
                {
                  "type": "tool_result",
                  "tool_use_id": "toolu_01",
                  "content": "[MCP - Lesson 1]\nServers expose tools."
                }
              ]
            }
          ]
        }
        "#);
    }

    #[test]
    fn test_parse_tool_use_response() {
        let body = r#"{
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "model": "claude-sonnet-4-20250514",
            "content": [
                {"type": "text", "text": "I'll search the course."},
                {"type": "tool_use", "id": "toolu_01", "name": "search_course_content",
                 "input": {"query": "MCP", "lesson_number": 2}}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 412, "output_tokens": 57}
        }"#;

        let response = parse_response(body).unwrap();
        assert_eq!(response.stop_reason, Some(StopReason::ToolUse));
        assert!(response.has_tool_use());
        assert_eq!(response.text(), "I'll search the course.");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_response("not json").is_err());
    }
}
