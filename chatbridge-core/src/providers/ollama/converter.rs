//! Conversion between the canonical protocol and Ollama format
//!
//! Ollama takes plain-string content; images travel separately as raw
//! base64 strings in the message's `images` list. Tool definitions are not
//! forwarded.

use super::types::*;
use crate::protocol::{
    parse_data_uri, ChatResponse, CompletionUsage, Message, MessageRole, ResponseChoice,
    ResponseMessage,
};
use crate::providers::pipeline::PreparedRequest;
use crate::providers::shaping::flatten_to_text;
use chrono::DateTime;
use tracing::warn;
use uuid::Uuid;

/// Convert a prepared request to Ollama format
pub fn to_ollama_request(request: &PreparedRequest<'_>) -> OllamaRequest {
    let options = request.options;
    let generation = OllamaOptions {
        temperature: options.temperature,
        top_p: options.top_p,
        frequency_penalty: options.frequency_penalty,
        presence_penalty: options.presence_penalty,
        num_predict: options.max_tokens,
    };

    OllamaRequest {
        model: options.model.clone(),
        messages: request
            .messages
            .iter()
            .map(|message| to_ollama_message(message, request.request_id))
            .collect(),
        stream: false,
        options: (!generation.is_empty()).then_some(generation),
    }
}

/// Convert a canonical message to Ollama format
fn to_ollama_message(message: &Message, request_id: &str) -> OllamaMessage {
    let images = if message.role == MessageRole::User {
        message
            .content
            .images()
            .into_iter()
            .filter_map(|url| match parse_data_uri(url) {
                Some((_, data)) => Some(data.to_string()),
                None => {
                    warn!(request_id, "Ollama accepts only inline images, dropping {}", url);
                    None
                }
            })
            .collect()
    } else {
        Vec::new()
    };

    OllamaMessage {
        role: message.role.as_str().to_string(),
        content: flatten_to_text(&message.content),
        images,
    }
}

/// Convert an Ollama response to canonical format
pub fn from_ollama_response(response: OllamaResponse, model: &str) -> ChatResponse {
    let created = response
        .created_at
        .as_deref()
        .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
        .map(|ts| ts.timestamp())
        .unwrap_or_else(|| chrono::Utc::now().timestamp());

    let usage = CompletionUsage::new(
        response.prompt_eval_count.unwrap_or(0),
        response.eval_count.unwrap_or(0),
    );

    ChatResponse {
        id: format!("chatcmpl-{}", Uuid::new_v4().simple()),
        object: "chat.completion".to_string(),
        created,
        model: response.model.unwrap_or_else(|| model.to_string()),
        choices: vec![ResponseChoice {
            index: 0,
            message: ResponseMessage {
                role: MessageRole::Assistant,
                content: response.message.map(|m| m.content),
                tool_calls: Vec::new(),
            },
            finish_reason: response.done_reason.unwrap_or_else(|| "stop".to_string()),
        }],
        usage,
    }
}
