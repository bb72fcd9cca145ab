//! Request fingerprinting
//!
//! A cache key is the SHA-256 of the canonical JSON of the fields that
//! determine a completion. The caller's request id and the retry budget are
//! left out so that retried or re-labelled calls share one entry. A request
//! that cannot be fingerprinted has no key and is never cached.

use super::CacheError;
use crate::protocol::{ChatCompletionOptions, Message, ToolDefinition};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;

/// Deterministic fingerprint of a cacheable request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

#[derive(Serialize)]
struct Fingerprint<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: Option<f32>,
    top_p: Option<f32>,
    frequency_penalty: Option<f32>,
    presence_penalty: Option<f32>,
    image: Option<ImageFingerprint<'a>>,
    response_model: Option<ResponseModelFingerprint<'a>>,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    tools: &'a [ToolDefinition],
}

#[derive(Serialize)]
struct ImageFingerprint<'a> {
    data: String,
    description: Option<&'a str>,
}

#[derive(Serialize)]
struct ResponseModelFingerprint<'a> {
    name: &'a str,
    schema: Value,
}

impl CacheKey {
    /// Compute the key for a set of options
    pub fn from_options(options: &ChatCompletionOptions) -> Result<Self, CacheError> {
        let response_model = match &options.response_model {
            Some(model) => Some(ResponseModelFingerprint {
                name: &model.name,
                schema: model
                    .schema
                    .describe()
                    .map_err(|e| CacheError::Serialization(e.to_string()))?,
            }),
            None => None,
        };

        let fingerprint = Fingerprint {
            model: &options.model,
            messages: &options.messages,
            temperature: options.temperature,
            top_p: options.top_p,
            frequency_penalty: options.frequency_penalty,
            presence_penalty: options.presence_penalty,
            image: options.image.as_ref().map(|image| ImageFingerprint {
                data: image.to_data_uri(),
                description: image.description.as_deref(),
            }),
            response_model,
            tools: options.tool_definitions(),
        };

        let json = serde_json::to_string(&fingerprint)
            .map_err(|e| CacheError::Serialization(e.to_string()))?;
        let hash = Sha256::digest(json.as_bytes());
        Ok(Self(format!("{:x}", hash)))
    }

    /// Hex digest of the key
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ImageAttachment, ResponseModel};
    use crate::schema::JsonSchema;
    use proptest::prelude::*;
    use serde_json::json;

    fn options() -> ChatCompletionOptions {
        ChatCompletionOptions::new("gemma2:2b", vec![Message::user("2+2?")])
    }

    fn key(options: &ChatCompletionOptions) -> CacheKey {
        CacheKey::from_options(options).unwrap()
    }

    #[test]
    fn test_key_is_hex_sha256() {
        let key = key(&options());
        assert_eq!(key.as_str().len(), 64);
        assert!(key.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_key_ignores_request_id_and_retries() {
        let a = options().with_request_id("req-a").with_retries(0);
        let b = options().with_request_id("req-b").with_retries(5);
        assert_eq!(key(&a), key(&b));
        assert_eq!(key(&a), key(&options()));
    }

    #[test]
    fn test_key_tracks_sampling_and_schema() {
        let base = key(&options());
        assert_ne!(base, key(&options().with_temperature(0.2)));
        assert_ne!(base, key(&options().with_top_p(0.5)));

        let schema = JsonSchema::new(json!({"type": "object"}));
        let with_model = options().with_response_model(ResponseModel::new("Answer", schema));
        assert_ne!(base, key(&with_model));
    }

    #[test]
    fn test_key_tracks_image() {
        let base = key(&options());
        let image = ImageAttachment::new(vec![1, 2, 3]);
        let with_image = options().with_image(image.clone());
        let described = options().with_image(image.with_description("a red button"));

        assert_ne!(base, key(&with_image));
        assert_ne!(key(&with_image), key(&described));
    }

    #[test]
    fn test_undescribable_schema_has_no_key() {
        let broken = JsonSchema::new(json!({"type": 12}));
        let options = options().with_response_model(ResponseModel::new("Broken", broken));

        let err = CacheKey::from_options(&options).unwrap_err();
        assert!(matches!(err, CacheError::Serialization(_)));
    }

    proptest! {
        #[test]
        fn prop_key_independent_of_request_id(
            text in ".{0,64}",
            temperature in proptest::option::of(0.0f32..2.0),
            first_id in "[a-z0-9-]{1,16}",
            second_id in "[a-z0-9-]{1,16}",
        ) {
            let build = |id: &str| {
                let mut options = ChatCompletionOptions::new("gpt-4o", vec![Message::user(text.clone())])
                    .with_request_id(id);
                options.temperature = temperature;
                options
            };
            prop_assert_eq!(key(&build(&first_id)), key(&build(&second_id)));
        }
    }
}
