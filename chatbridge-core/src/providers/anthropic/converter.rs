//! Conversion between the canonical protocol and Anthropic format
//!
//! System messages are lifted into the top-level `system` field and
//! consecutive turns with the same role are merged, since the Messages API
//! expects user and assistant turns to alternate.

use super::types::*;
use crate::protocol::{
    parse_data_uri, ChatResponse, CompletionUsage, ContentPart, Message, MessageContent,
    MessageRole, ResponseChoice, ResponseMessage, ToolCall, ToolDefinition,
};
use crate::providers::pipeline::PreparedRequest;
use serde_json::{json, Value};
use uuid::Uuid;

/// Convert a prepared request to Anthropic format
///
/// `default_max_tokens` applies when the caller set no limit; the Messages
/// API requires one. Frequency and presence penalties have no Anthropic
/// equivalent and are dropped.
pub fn to_anthropic_request(
    request: &PreparedRequest<'_>,
    default_max_tokens: u32,
) -> AnthropicRequest {
    let options = request.options;
    let tools = options.tool_definitions();

    let system = request
        .messages
        .iter()
        .filter(|m| m.role == MessageRole::System)
        .map(|m| m.content.text())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");

    AnthropicRequest {
        model: options.model.clone(),
        messages: convert_messages(&request.messages),
        max_tokens: options.max_tokens.unwrap_or(default_max_tokens),
        system: (!system.is_empty()).then_some(system),
        temperature: options.temperature,
        top_p: options.top_p,
        tools: (!tools.is_empty()).then(|| tools.iter().map(to_anthropic_tool).collect()),
    }
}

/// Convert non-system messages, merging consecutive turns of one role
fn convert_messages(messages: &[Message]) -> Vec<AnthropicMessage> {
    let mut converted: Vec<AnthropicMessage> = Vec::new();

    for message in messages {
        let role = match message.role {
            MessageRole::System => continue,
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        };

        let blocks = convert_content(&message.content);
        if blocks.is_empty() {
            continue;
        }

        match converted.last_mut() {
            Some(last) if last.role == role => last.content.extend(blocks),
            _ => converted.push(AnthropicMessage {
                role,
                content: blocks,
            }),
        }
    }

    converted
}

/// Convert message content to content blocks, dropping empty text
fn convert_content(content: &MessageContent) -> Vec<AnthropicContentBlock> {
    match content {
        MessageContent::Text(text) if text.is_empty() => Vec::new(),
        MessageContent::Text(text) => vec![AnthropicContentBlock::Text { text: text.clone() }],
        MessageContent::Parts(parts) => parts
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text { text } if text.is_empty() => None,
                ContentPart::Text { text } => {
                    Some(AnthropicContentBlock::Text { text: text.clone() })
                }
                ContentPart::ImageUrl { image_url } => Some(AnthropicContentBlock::Image {
                    source: image_source(&image_url.url),
                }),
            })
            .collect(),
    }
}

fn image_source(url: &str) -> AnthropicImageSource {
    match parse_data_uri(url) {
        Some((media_type, data)) => AnthropicImageSource::Base64 {
            media_type: media_type.to_string(),
            data: data.to_string(),
        },
        None => AnthropicImageSource::Url {
            url: url.to_string(),
        },
    }
}

/// Convert a tool definition to Anthropic format
fn to_anthropic_tool(tool: &ToolDefinition) -> AnthropicTool {
    AnthropicTool {
        name: tool.function.name.clone(),
        description: tool.function.description.clone(),
        input_schema: tool
            .function
            .parameters
            .clone()
            .unwrap_or_else(|| json!({"type": "object", "properties": {}})),
    }
}

/// Convert an Anthropic response to canonical format
pub fn from_anthropic_response(response: AnthropicResponse, model: &str) -> ChatResponse {
    let mut text = Vec::new();
    let mut tool_calls = Vec::new();

    for block in response.content {
        match block {
            AnthropicResponseBlock::Text { text: chunk } => text.push(chunk),
            AnthropicResponseBlock::ToolUse { id, name, input } => {
                let arguments = match input {
                    Value::Null => "{}".to_string(),
                    other => other.to_string(),
                };
                tool_calls.push(ToolCall::function(id, name, arguments));
            }
            AnthropicResponseBlock::Other => {}
        }
    }

    let usage = response
        .usage
        .map(|u| CompletionUsage::new(u.input_tokens, u.output_tokens))
        .unwrap_or_default();

    ChatResponse {
        id: response
            .id
            .unwrap_or_else(|| format!("msg_{}", Uuid::new_v4().simple())),
        object: "chat.completion".to_string(),
        created: chrono::Utc::now().timestamp(),
        model: response.model.unwrap_or_else(|| model.to_string()),
        choices: vec![ResponseChoice {
            index: 0,
            message: ResponseMessage {
                role: MessageRole::Assistant,
                content: (!text.is_empty()).then(|| text.concat()),
                tool_calls,
            },
            finish_reason: convert_stop_reason(response.stop_reason.as_deref()),
        }],
        usage,
    }
}

/// Map Anthropic `stop_reason` values to OpenAI-style finish reasons
fn convert_stop_reason(reason: Option<&str>) -> String {
    match reason {
        None | Some("end_turn") | Some("stop_sequence") => "stop",
        Some("max_tokens") => "length",
        Some("tool_use") => "tool_calls",
        Some(other) => other,
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ChatCompletionOptions;
    use test_case::test_case;

    fn prepared<'a>(options: &'a ChatCompletionOptions) -> PreparedRequest<'a> {
        PreparedRequest {
            options,
            messages: options.messages.clone(),
            response_schema: None,
            request_id: "req-1",
        }
    }

    #[test]
    fn test_system_lifted_and_turns_merged() {
        let options = ChatCompletionOptions::new(
            "claude-3-5-haiku-20241022",
            vec![
                Message::system("Be terse."),
                Message::user("What is 2+2?"),
                Message::user("Answer in JSON."),
                Message::assistant(""),
            ],
        );

        let request = to_anthropic_request(&prepared(&options), 1024);

        assert_eq!(request.system.as_deref(), Some("Be terse."));
        assert_eq!(request.max_tokens, 1024);
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].role, "user");
        assert_eq!(request.messages[0].content.len(), 2);
    }

    #[test]
    fn test_image_blocks() {
        let options = ChatCompletionOptions::new(
            "claude-3-5-haiku-20241022",
            vec![Message::with_parts(
                MessageRole::User,
                vec![
                    ContentPart::image_url("data:image/jpeg;base64,/9j/AA=="),
                    ContentPart::text("a cat"),
                    ContentPart::image_url("https://example.com/dog.png"),
                ],
            )],
        )
        .with_max_tokens(64);

        let body = serde_json::to_value(to_anthropic_request(&prepared(&options), 1024)).unwrap();
        let content = &body["messages"][0]["content"];

        assert_eq!(body["max_tokens"], 64);
        assert_eq!(content[0]["type"], "image");
        assert_eq!(content[0]["source"]["type"], "base64");
        assert_eq!(content[0]["source"]["media_type"], "image/jpeg");
        assert_eq!(content[0]["source"]["data"], "/9j/AA==");
        assert_eq!(content[1]["text"], "a cat");
        assert_eq!(content[2]["source"]["type"], "url");
        assert!(body.get("system").is_none());
    }

    #[test]
    fn test_tools_forwarded() {
        let options = ChatCompletionOptions::new("claude", vec![Message::user("weather?")])
            .with_tools(vec![ToolDefinition::function("get_weather", None, None)]);

        let body = serde_json::to_value(to_anthropic_request(&prepared(&options), 1024)).unwrap();
        assert_eq!(body["tools"][0]["name"], "get_weather");
        assert_eq!(body["tools"][0]["input_schema"]["type"], "object");
    }

    #[test]
    fn test_tool_use_response() {
        let raw = json!({
            "id": "msg_01",
            "model": "claude-3-5-haiku-20241022",
            "content": [
                { "type": "thinking", "thinking": "hmm" },
                { "type": "text", "text": "Checking." },
                { "type": "tool_use", "id": "toolu_1", "name": "get_weather", "input": {"city": "Tokyo"} }
            ],
            "stop_reason": "tool_use",
            "usage": { "input_tokens": 12, "output_tokens": 7 }
        });
        let response: AnthropicResponse = serde_json::from_value(raw).unwrap();
        let canonical = from_anthropic_response(response, "claude");

        let choice = &canonical.choices[0];
        assert_eq!(choice.finish_reason, "tool_calls");
        assert_eq!(choice.message.content.as_deref(), Some("Checking."));
        assert_eq!(choice.message.tool_calls[0].id, "toolu_1");
        assert_eq!(choice.message.tool_calls[0].function.arguments, r#"{"city":"Tokyo"}"#);
        assert_eq!(canonical.usage, CompletionUsage::new(12, 7));
        assert_eq!(canonical.id, "msg_01");
    }

    #[test_case(Some("end_turn"), "stop")]
    #[test_case(Some("stop_sequence"), "stop")]
    #[test_case(Some("max_tokens"), "length")]
    #[test_case(Some("tool_use"), "tool_calls")]
    #[test_case(Some("refusal"), "refusal")]
    #[test_case(None, "stop")]
    fn test_stop_reason_mapping(reason: Option<&str>, expected: &str) {
        assert_eq!(convert_stop_reason(reason), expected);
    }
}
