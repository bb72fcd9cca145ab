//! Shared completion pipeline
//!
//! ```text
//! START -> CACHE_CHECK -> HIT: return
//!                      -> MISS: BUILD_REQUEST -> DISPATCH -> NORMALIZE
//!                               -> (EXTRACT -> VALIDATE)
//!                               -> OK: CACHE_STORE -> return
//!                               -> FAIL: retry or fail
//! ```
//!
//! Every attempt rebuilds its messages from the caller's options, so
//! injected instructions never pile up across retries.

use crate::cache::{CacheEntry, CacheKey, CacheSettings};
use crate::protocol::{ChatCompletionOptions, CompletionOutcome, Message, DEFAULT_RETRIES};
use crate::providers::adapter::{ProviderBackend, ProviderCapabilities};
use crate::providers::error::{CompletionError, CompletionResult};
use crate::providers::retry::{RetryExecutor, RetryPolicy};
use crate::providers::shaping::{fold_system_messages, image_message, normalize_roles};
use crate::structured;
use serde_json::Value;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Identity and per-client switches shared by every provider variant
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Client name used in logs and errors
    pub name: String,

    /// Native features of the target
    pub capabilities: ProviderCapabilities,

    /// Models this client serves; empty means any
    pub models: Vec<String>,

    /// Response cache switch
    pub cache: CacheSettings,

    /// Retry budget for calls that leave `ChatCompletionOptions::retries` unset
    pub default_retries: u32,
}

impl ClientSettings {
    /// Create settings with no model restriction and caching off
    pub fn new(name: impl Into<String>, capabilities: ProviderCapabilities) -> Self {
        Self {
            name: name.into(),
            capabilities,
            models: Vec::new(),
            cache: CacheSettings::disabled(),
            default_retries: DEFAULT_RETRIES,
        }
    }

    /// Restrict the client to the given models
    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.models = models;
        self
    }

    /// Set the cache switch
    pub fn with_cache(mut self, cache: CacheSettings) -> Self {
        self.cache = cache;
        self
    }

    /// Set the retry budget used when a call does not carry its own
    pub fn with_default_retries(mut self, retries: u32) -> Self {
        self.default_retries = retries;
        self
    }

    /// Budget for one call: the caller's override, else the client default
    pub fn retries_for(&self, options: &ChatCompletionOptions) -> u32 {
        options.retries.unwrap_or(self.default_retries)
    }

    /// Whether the client serves `model`
    pub fn supports_model(&self, model: &str) -> bool {
        self.models.is_empty() || self.models.iter().any(|m| m == model)
    }
}

/// Schema passed to providers with native structured output
#[derive(Debug, Clone)]
pub struct NativeSchema<'a> {
    /// Response model name
    pub name: &'a str,
    /// JSON Schema description
    pub schema: Value,
}

/// One attempt's request, ready for provider-specific conversion
#[derive(Debug)]
pub struct PreparedRequest<'a> {
    /// The caller's untouched options
    pub options: &'a ChatCompletionOptions,

    /// Role-normalized messages with the image and schema instruction appended
    pub messages: Vec<Message>,

    /// Set only for providers that constrain generation natively
    pub response_schema: Option<NativeSchema<'a>>,

    /// Correlation id for logs and the `X-Request-ID` header
    pub request_id: &'a str,
}

/// Run a full completion call against a backend
pub async fn complete<B>(
    backend: &B,
    options: &ChatCompletionOptions,
) -> CompletionResult<CompletionOutcome>
where
    B: ProviderBackend + ?Sized,
{
    let settings = backend.settings();
    let request_id = options
        .request_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    validate_options(settings, options)?;

    let cache = settings.cache.port();
    let cache_key = match cache.map(|_| CacheKey::from_options(options)) {
        Some(Ok(key)) => Some(key),
        Some(Err(e)) => {
            warn!(
                category = "cache",
                request_id = %request_id,
                "Cache key unavailable, bypassing cache: {}",
                e
            );
            None
        }
        None => None,
    };

    if let (Some(cache), Some(key)) = (cache, cache_key.as_ref()) {
        match cache.get(key, &request_id).await {
            Ok(Some(entry)) => {
                info!(
                    category = "cache",
                    request_id = %request_id,
                    provider = %settings.name,
                    cache_key = %key,
                    "Cache hit, skipping provider call"
                );
                return Ok(entry.into());
            }
            Ok(None) => {
                debug!(category = "cache", request_id = %request_id, cache_key = %key, "Cache miss");
            }
            Err(e) => {
                warn!(
                    category = "cache",
                    request_id = %request_id,
                    cache_key = %key,
                    "Cache lookup failed, treating as miss: {}",
                    e
                );
            }
        }
    }

    let policy = RetryPolicy::new(settings.retries_for(options));
    let executor = RetryExecutor::new(policy, &request_id);
    let outcome = executor
        .execute(|attempt| run_attempt(backend, options, &request_id, attempt))
        .await
        .into_result()
        .inspect_err(|e| {
            if !e.is_retryable() && !matches!(e, CompletionError::InvalidResponseSchema { .. }) {
                error!(
                    category = "failure",
                    request_id = %request_id,
                    provider = %settings.name,
                    "Chat completion failed: {}",
                    e
                );
            }
        })?;

    if let (Some(cache), Some(key)) = (cache, cache_key.as_ref()) {
        if let Err(e) = cache
            .set(key, CacheEntry::from(outcome.clone()), &request_id)
            .await
        {
            warn!(
                category = "cache",
                request_id = %request_id,
                cache_key = %key,
                "Cache store failed, result not cached: {}",
                e
            );
        }
    }

    Ok(outcome)
}

fn validate_options(
    settings: &ClientSettings,
    options: &ChatCompletionOptions,
) -> CompletionResult<()> {
    if options.messages.is_empty() {
        return Err(CompletionError::InvalidRequest(
            "at least one message is required".to_string(),
        ));
    }

    if !settings.supports_model(&options.model) {
        return Err(CompletionError::UnsupportedModel {
            provider: settings.name.clone(),
            model: options.model.clone(),
        });
    }

    Ok(())
}

async fn run_attempt<B>(
    backend: &B,
    options: &ChatCompletionOptions,
    request_id: &str,
    attempt: u32,
) -> CompletionResult<CompletionOutcome>
where
    B: ProviderBackend + ?Sized,
{
    let settings = backend.settings();
    let capabilities = &settings.capabilities;

    let mut messages = normalize_roles(&options.messages);
    if !capabilities.supports_system_role {
        messages = fold_system_messages(&messages);
    }
    if let Some(image) = &options.image {
        messages.push(image_message(image));
    }

    let mut response_schema = None;
    if let Some(model) = &options.response_model {
        let schema = structured::describe_schema(model)?;
        if capabilities.supports_native_structured_output {
            response_schema = Some(NativeSchema {
                name: &model.name,
                schema,
            });
        } else {
            messages.push(structured::instruction_message(&model.name, &schema));
        }
    }

    info!(
        category = "dispatch",
        request_id,
        provider = %settings.name,
        model = %options.model,
        attempt,
        messages = messages.len(),
        "Dispatching chat completion"
    );

    let response = backend
        .dispatch(PreparedRequest {
            options,
            messages,
            response_schema,
            request_id,
        })
        .await?;

    info!(
        category = "response",
        request_id,
        provider = %settings.name,
        response_id = %response.id,
        choices = response.choices.len(),
        total_tokens = response.usage.total_tokens,
        "Received chat completion"
    );

    let Some(model) = &options.response_model else {
        return Ok(CompletionOutcome::Response(response));
    };

    let payload = structured::extract_structured(&response, model)?;

    // Providers without native tools answer tool requests through the schema
    if !options.tool_definitions().is_empty() && !capabilities.supports_functions {
        if let Some(call) = structured::synthesize_tool_call(&payload) {
            debug!(request_id, tool = %call.function.name, "Synthesized tool call from structured payload");
            return Ok(CompletionOutcome::Response(structured::attach_tool_call(
                response, call,
            )));
        }
    }

    Ok(CompletionOutcome::Structured(payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{
        ChatResponse, CompletionUsage, MessageRole, ResponseChoice, ResponseMessage,
    };
    use crate::providers::adapter::ChatCompletion;
    use crate::providers::error::{ProviderError, ProviderResult};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Scripted {
        settings: ClientSettings,
        replies: Mutex<Vec<ProviderResult<ChatResponse>>>,
        seen: Mutex<Vec<Vec<Message>>>,
    }

    impl Scripted {
        fn new(capabilities: ProviderCapabilities, replies: Vec<ProviderResult<ChatResponse>>) -> Self {
            Self {
                settings: ClientSettings::new("scripted", capabilities),
                replies: Mutex::new(replies),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ProviderBackend for Scripted {
        fn settings(&self) -> &ClientSettings {
            &self.settings
        }

        async fn dispatch(&self, request: PreparedRequest<'_>) -> ProviderResult<ChatResponse> {
            self.seen.lock().unwrap().push(request.messages);
            self.replies.lock().unwrap().remove(0)
        }
    }

    fn reply(text: &str) -> ProviderResult<ChatResponse> {
        Ok(ChatResponse {
            id: "chatcmpl-1".to_string(),
            object: "chat.completion".to_string(),
            created: 0,
            model: "test".to_string(),
            choices: vec![ResponseChoice {
                index: 0,
                message: ResponseMessage {
                    role: MessageRole::Assistant,
                    content: Some(text.to_string()),
                    tool_calls: Vec::new(),
                },
                finish_reason: "stop".to_string(),
            }],
            usage: CompletionUsage::new(3, 2),
        })
    }

    #[tokio::test]
    async fn test_empty_messages_rejected() {
        let backend = Scripted::new(ProviderCapabilities::default(), Vec::new());
        let err = backend
            .create_chat_completion(&ChatCompletionOptions::new("m", Vec::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_unlisted_model_rejected() {
        let mut backend = Scripted::new(ProviderCapabilities::default(), Vec::new());
        backend.settings = backend.settings.clone().with_models(vec!["gemma2:2b".to_string()]);

        let err = backend
            .create_chat_completion(&ChatCompletionOptions::new("llama3", vec![Message::user("hi")]))
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::UnsupportedModel { .. }));
    }

    #[tokio::test]
    async fn test_plain_completion_passes_through() {
        let backend = Scripted::new(ProviderCapabilities::default(), vec![reply("hello")]);
        let outcome = backend
            .create_chat_completion(&ChatCompletionOptions::new("m", vec![Message::user("hi")]))
            .await
            .unwrap();

        assert_eq!(outcome.as_response().and_then(|r| r.first_text()), Some("hello"));
        assert_eq!(backend.seen.lock().unwrap()[0].len(), 1);
    }

    #[tokio::test]
    async fn test_upstream_error_surfaces_once() {
        let backend = Scripted::new(
            ProviderCapabilities::default(),
            vec![Err(ProviderError::Timeout), reply("unused")],
        );
        let err = backend
            .create_chat_completion(&ChatCompletionOptions::new("m", vec![Message::user("hi")]))
            .await
            .unwrap_err();

        assert_eq!(err, CompletionError::Upstream(ProviderError::Timeout));
        assert_eq!(backend.seen.lock().unwrap().len(), 1);
    }

    fn answer_options() -> ChatCompletionOptions {
        ChatCompletionOptions::new("m", vec![Message::user("What is 2+2?")]).with_response_model(
            crate::protocol::ResponseModel::new(
                "Answer",
                crate::schema::JsonSchema::new(serde_json::json!({
                    "type": "object",
                    "properties": { "value": { "type": "integer" } },
                    "required": ["value"]
                })),
            ),
        )
    }

    #[tokio::test]
    async fn test_client_default_retries_apply_when_call_sets_none() {
        let mut backend = Scripted::new(
            ProviderCapabilities::default(),
            vec![reply("not json"), reply("{\"value\": 4}")],
        );
        backend.settings = backend.settings.clone().with_default_retries(0);

        let err = backend
            .create_chat_completion(&answer_options())
            .await
            .unwrap_err();

        assert!(matches!(err, CompletionError::SchemaParse { .. }));
        assert_eq!(backend.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_call_retries_override_client_default() {
        let mut backend = Scripted::new(
            ProviderCapabilities::default(),
            vec![reply("not json"), reply("{\"value\": 4}")],
        );
        backend.settings = backend.settings.clone().with_default_retries(0);

        let outcome = backend
            .create_chat_completion(&answer_options().with_retries(1))
            .await
            .unwrap();

        assert_eq!(outcome.as_structured(), Some(&serde_json::json!({ "value": 4 })));
        assert_eq!(backend.seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_system_messages_folded_without_system_role() {
        let capabilities = ProviderCapabilities {
            supports_system_role: false,
            ..ProviderCapabilities::default()
        };
        let backend = Scripted::new(capabilities, vec![reply("4")]);
        let options = ChatCompletionOptions::new(
            "m",
            vec![Message::system("You are a calculator"), Message::user("What is 2+2?")],
        );

        backend.create_chat_completion(&options).await.unwrap();

        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen[0].len(), 1);
        assert_eq!(seen[0][0].role, MessageRole::User);
        assert_eq!(
            seen[0][0].content.text(),
            "You are a calculator\n\nWhat is 2+2?"
        );
    }
}
