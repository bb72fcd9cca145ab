//! Structured output extraction
//!
//! Providers without schema-constrained generation are asked for JSON in
//! the prompt itself:
//!
//! 1. the caller's schema is described ([`describe_schema`])
//! 2. a user message carrying the description is appended ([`instruction_message`])
//! 3. the first choice's text is parsed as JSON ([`parse_payload`])
//! 4. the parsed value is validated against the schema ([`extract_structured`])
//!
//! Each step has its own [`CompletionError`] variant so the retry
//! controller can tell them apart. Providers with native structured output
//! skip step 2 and still run steps 3 and 4.

use crate::protocol::{ChatResponse, Message, ResponseModel, ToolCall};
use crate::providers::error::{CompletionError, CompletionResult};
use crate::schema::SchemaError;
use serde_json::Value;
use uuid::Uuid;

/// Describe the response model's schema as JSON
pub fn describe_schema(model: &ResponseModel) -> CompletionResult<Value> {
    model
        .schema
        .describe()
        .map_err(|e| CompletionError::SchemaSerialization {
            name: model.name.clone(),
            message: e.to_string(),
        })
}

/// Build the user message asking the model for schema-shaped JSON
pub fn instruction_message(name: &str, description: &Value) -> Message {
    let schema_json =
        serde_json::to_string_pretty(description).unwrap_or_else(|_| description.to_string());

    Message::user(format!(
        "Respond with a single JSON value describing \"{name}\" that conforms exactly to this JSON Schema:\n\
         {schema_json}\n\
         Reply with the JSON only. Do not add any explanation or surrounding text, \
         and do not wrap the JSON in markdown code fences."
    ))
}

/// Parse the reply text as JSON
pub fn parse_payload(text: &str) -> CompletionResult<Value> {
    serde_json::from_str(text.trim()).map_err(|e| CompletionError::SchemaParse {
        message: e.to_string(),
        raw: text.to_string(),
    })
}

/// Parse and validate the first choice of a response
pub fn extract_structured(response: &ChatResponse, model: &ResponseModel) -> CompletionResult<Value> {
    let text = response
        .first_text()
        .ok_or_else(|| CompletionError::SchemaParse {
            message: "model returned no text content for structured output".to_string(),
            raw: String::new(),
        })?;

    let value = parse_payload(text)?;

    model.schema.validate(&value).map_err(|e| match e {
        SchemaError::Mismatch(message) => CompletionError::SchemaValidation {
            message,
            raw: text.to_string(),
        },
        SchemaError::Describe(message) => CompletionError::SchemaSerialization {
            name: model.name.clone(),
            message,
        },
    })?;

    Ok(value)
}

/// Build a tool call from a `{ name, arguments }` payload
///
/// Returns `None` when the payload has no string `name`. Non-string
/// arguments are JSON-encoded; a missing `arguments` field encodes as `{}`.
pub fn synthesize_tool_call(payload: &Value) -> Option<ToolCall> {
    let name = payload.get("name")?.as_str()?;
    let arguments = match payload.get("arguments") {
        Some(Value::String(raw)) => raw.clone(),
        Some(other) => other.to_string(),
        None => "{}".to_string(),
    };

    Some(ToolCall::function(
        format!("call_{}", Uuid::new_v4().simple()),
        name,
        arguments,
    ))
}

/// Replace the first choice's text with a single tool call
pub fn attach_tool_call(mut response: ChatResponse, call: ToolCall) -> ChatResponse {
    if let Some(choice) = response.choices.first_mut() {
        choice.message.content = None;
        choice.message.tool_calls = vec![call];
        choice.finish_reason = "tool_calls".to_string();
    }
    response
}
