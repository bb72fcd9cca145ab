//! Protocol module for canonical chat completion structures
//!
//! This module defines the provider-agnostic request and response model.
//! Every provider client converts from and to these types, so callers never
//! see a provider's native wire format.

pub mod types;

pub use types::{
    parse_data_uri, ChatCompletionOptions, ChatResponse, CompletionOutcome, CompletionUsage,
    ContentPart, FunctionCall, FunctionDefinition, ImageAttachment, ImageUrl, Message,
    MessageContent, MessageRole, ResponseChoice, ResponseMessage, ResponseModel, ToolCall,
    ToolDefinition, DEFAULT_RETRIES,
};
