//! Schema capability for structured output
//!
//! The completion core never interprets a schema itself. It asks a
//! [`ResponseSchema`] for a textual description to put in front of the model
//! and for a yes/no verdict on the parsed reply. [`JsonSchema`] is the
//! default capability, backed by the `jsonschema` crate.

use serde_json::Value;
use thiserror::Error;

/// Errors raised by a schema capability
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    /// The schema could not be turned into a description
    #[error("schema cannot be described: {0}")]
    Describe(String),

    /// The candidate value does not conform to the schema
    #[error("{0}")]
    Mismatch(String),
}

/// A caller-supplied schema the model reply must conform to
pub trait ResponseSchema: Send + Sync {
    /// Produce a JSON-Schema-like description of the expected shape
    fn describe(&self) -> Result<Value, SchemaError>;

    /// Check a parsed reply against the schema
    fn validate(&self, value: &Value) -> Result<(), SchemaError>;
}

/// A JSON Schema document used for structured output
///
/// ```rust
/// use chatbridge_core::schema::{JsonSchema, ResponseSchema};
///
/// let schema = JsonSchema::new(serde_json::json!({
///     "type": "object",
///     "properties": { "value": { "type": "number" } },
///     "required": ["value"]
/// }));
/// assert!(schema.validate(&serde_json::json!({"value": 4})).is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct JsonSchema(Value);

impl JsonSchema {
    /// Creates a schema from a raw JSON value
    pub fn new(schema: Value) -> Self {
        Self(schema)
    }

    /// Derives a schema from a type implementing [`schemars::JsonSchema`]
    pub fn for_type<T: schemars::JsonSchema>() -> Result<Self, SchemaError> {
        let schema = schemars::schema_for!(T);
        serde_json::to_value(schema)
            .map(Self)
            .map_err(|e| SchemaError::Describe(e.to_string()))
    }

    /// Returns a reference to the underlying JSON value
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    fn validator(&self) -> Result<jsonschema::Validator, SchemaError> {
        jsonschema::validator_for(&self.0)
            .map_err(|e| SchemaError::Describe(format!("invalid JSON schema: {}", e)))
    }
}

impl ResponseSchema for JsonSchema {
    fn describe(&self) -> Result<Value, SchemaError> {
        self.validator()?;
        Ok(self.0.clone())
    }

    fn validate(&self, value: &Value) -> Result<(), SchemaError> {
        let validator = self.validator()?;
        let errors: Vec<String> = validator
            .iter_errors(value)
            .map(|e| e.to_string())
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::Mismatch(errors.join("; ")))
        }
    }
}
