//! Ollama chat API types
//!
//! These types match the non-streaming `POST /api/chat` wire format.

use serde::{Deserialize, Serialize};

/// Ollama chat request
#[derive(Debug, Serialize)]
pub struct OllamaRequest {
    pub model: String,
    pub messages: Vec<OllamaMessage>,
    pub stream: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<OllamaOptions>,
}

/// Message with flattened text and raw base64 images
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OllamaMessage {
    pub role: String,

    #[serde(default)]
    pub content: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

/// Generation options
#[derive(Debug, Default, Serialize)]
pub struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
}

impl OllamaOptions {
    /// Whether no option is set
    pub fn is_empty(&self) -> bool {
        self.temperature.is_none()
            && self.top_p.is_none()
            && self.frequency_penalty.is_none()
            && self.presence_penalty.is_none()
            && self.num_predict.is_none()
    }
}

/// Ollama chat response
#[derive(Debug, Deserialize)]
pub struct OllamaResponse {
    #[serde(default)]
    pub model: Option<String>,

    /// RFC 3339 timestamp
    #[serde(default)]
    pub created_at: Option<String>,

    #[serde(default)]
    pub message: Option<OllamaMessage>,

    #[serde(default)]
    pub done_reason: Option<String>,

    #[serde(default)]
    pub prompt_eval_count: Option<u32>,

    #[serde(default)]
    pub eval_count: Option<u32>,
}
