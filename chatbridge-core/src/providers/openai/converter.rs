//! Conversion between the canonical protocol and OpenAI format

use super::types::*;
use crate::protocol::{
    ChatResponse, CompletionUsage, ContentPart, Message, MessageContent, MessageRole,
    ResponseChoice, ResponseMessage, ToolCall, ToolDefinition,
};
use crate::providers::pipeline::{NativeSchema, PreparedRequest};
use crate::providers::shaping::flatten_to_text;
use regex::Regex;
use std::sync::LazyLock;
use uuid::Uuid;

/// Characters OpenAI rejects in a `json_schema` name
static INVALID_SCHEMA_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_-]+").expect("schema name pattern is valid"));

/// Convert a prepared request to OpenAI format
///
/// With `supports_vision` off every message is flattened to plain text.
pub fn to_openai_request(request: &PreparedRequest<'_>, supports_vision: bool) -> OpenAIRequest {
    let options = request.options;
    let tools = options.tool_definitions();

    OpenAIRequest {
        model: options.model.clone(),
        messages: request
            .messages
            .iter()
            .map(|message| to_openai_message(message, supports_vision))
            .collect(),
        temperature: options.temperature,
        max_tokens: options.max_tokens,
        top_p: options.top_p,
        frequency_penalty: options.frequency_penalty,
        presence_penalty: options.presence_penalty,
        response_format: request.response_schema.as_ref().map(to_openai_response_format),
        tools: (!tools.is_empty()).then(|| tools.iter().map(to_openai_tool).collect()),
        stream: false,
    }
}

/// Convert a canonical message to OpenAI format
fn to_openai_message(message: &Message, supports_vision: bool) -> OpenAIMessage {
    OpenAIMessage {
        role: message.role.as_str().to_string(),
        content: Some(to_openai_content(&message.content, supports_vision)),
        tool_calls: None,
    }
}

/// Convert message content to OpenAI format
fn to_openai_content(content: &MessageContent, supports_vision: bool) -> OpenAIContent {
    match content {
        MessageContent::Text(text) => OpenAIContent::Text(text.clone()),
        MessageContent::Parts(_) if !supports_vision => {
            OpenAIContent::Text(flatten_to_text(content))
        }
        MessageContent::Parts(parts) => OpenAIContent::Parts(
            parts
                .iter()
                .map(|part| match part {
                    ContentPart::Text { text } => OpenAIContentPart::Text { text: text.clone() },
                    ContentPart::ImageUrl { image_url } => OpenAIContentPart::ImageUrl {
                        image_url: OpenAIImageUrl {
                            url: image_url.url.clone(),
                            detail: image_url.detail.clone(),
                        },
                    },
                })
                .collect(),
        ),
    }
}

/// Build the native `json_schema` response format
fn to_openai_response_format(schema: &NativeSchema<'_>) -> OpenAIResponseFormat {
    let name = INVALID_SCHEMA_NAME.replace_all(schema.name, "_");
    let name = if name.is_empty() { "response".into() } else { name };

    OpenAIResponseFormat {
        format_type: "json_schema".to_string(),
        json_schema: Some(OpenAIJsonSchema {
            name: name.into_owned(),
            schema: schema.schema.clone(),
        }),
    }
}

/// Convert a tool definition to OpenAI format
fn to_openai_tool(tool: &ToolDefinition) -> OpenAITool {
    OpenAITool {
        tool_type: tool.tool_type.clone(),
        function: OpenAIFunction {
            name: tool.function.name.clone(),
            description: tool.function.description.clone(),
            parameters: tool.function.parameters.clone(),
        },
    }
}

/// Convert an OpenAI response to canonical format
///
/// `model` fills in for servers that do not echo the model back.
pub fn from_openai_response(response: OpenAIResponse, model: &str) -> ChatResponse {
    ChatResponse {
        id: response
            .id
            .unwrap_or_else(|| format!("chatcmpl-{}", Uuid::new_v4().simple())),
        object: "chat.completion".to_string(),
        created: response
            .created
            .unwrap_or_else(|| chrono::Utc::now().timestamp()),
        model: response.model.unwrap_or_else(|| model.to_string()),
        choices: response.choices.into_iter().map(from_openai_choice).collect(),
        usage: response.usage.map(from_openai_usage).unwrap_or_default(),
    }
}

/// Convert an OpenAI choice to canonical format
fn from_openai_choice(choice: OpenAIChoice) -> ResponseChoice {
    ResponseChoice {
        index: choice.index,
        message: from_openai_message(choice.message),
        finish_reason: choice.finish_reason.unwrap_or_else(|| "stop".to_string()),
    }
}

/// Convert an OpenAI message to canonical format
fn from_openai_message(message: OpenAIMessage) -> ResponseMessage {
    let role = match message.role.as_str() {
        "system" => MessageRole::System,
        "user" => MessageRole::User,
        _ => MessageRole::Assistant,
    };

    let content = message.content.map(|content| match content {
        OpenAIContent::Text(text) => text,
        OpenAIContent::Parts(parts) => parts
            .into_iter()
            .filter_map(|part| match part {
                OpenAIContentPart::Text { text } => Some(text),
                OpenAIContentPart::ImageUrl { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n"),
    });

    ResponseMessage {
        role,
        content,
        tool_calls: message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCall {
                id: tc.id,
                tool_type: tc.tool_type,
                function: crate::protocol::FunctionCall {
                    name: tc.function.name,
                    arguments: tc.function.arguments,
                },
            })
            .collect(),
    }
}

/// Convert OpenAI usage to canonical format
fn from_openai_usage(usage: OpenAIUsage) -> CompletionUsage {
    let mut converted = CompletionUsage::new(usage.prompt_tokens, usage.completion_tokens);
    if let Some(total) = usage.total_tokens {
        converted.total_tokens = total;
    }
    converted
}
