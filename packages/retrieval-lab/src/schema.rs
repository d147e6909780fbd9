//! Strict JSON schemas for structured calls, and the typed decode step.
//!
//! A response shape is any `JsonSchema + DeserializeOwned` type. Its schema
//! is generated with subschemas inlined, then tightened for strict-mode
//! providers: every object lists all of its properties as required and
//! forbids additional properties.
//!
//! ```rust,ignore
//! #[derive(Deserialize, JsonSchema)]
//! struct Answer { question: String, answer: String }
//!
//! let schema = Answer::strict_schema();
//! match decode::<Answer>(raw) {
//!     Decoded::Valid(answer) => ...,
//!     Decoded::Invalid { reason, .. } => ...,
//! }
//! ```

use schemars::gen::SchemaSettings;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{CallError, CallResult};

/// A type a model can be asked to produce.
pub trait StructuredOutput: JsonSchema + DeserializeOwned {
    /// Strict-mode schema for this shape.
    fn strict_schema() -> Value {
        let mut settings = SchemaSettings::draft07();
        settings.inline_subschemas = true;
        settings.meta_schema = None;

        let root = settings.into_generator().into_root_schema_for::<Self>();
        let mut value = serde_json::to_value(root).unwrap_or_default();
        if let Value::Object(map) = &mut value {
            map.remove("definitions");
        }
        strictify(&mut value);
        value
    }

    /// Name sent alongside the schema.
    fn shape_name() -> String {
        <Self as JsonSchema>::schema_name()
    }
}

impl<T: JsonSchema + DeserializeOwned> StructuredOutput for T {}

fn strictify(value: &mut Value) {
    match value {
        Value::Object(map) => {
            // Strict mode accepts anyOf but not oneOf.
            if let Some(variants) = map.remove("oneOf") {
                map.insert("anyOf".to_string(), variants);
            }

            if map.get("type").and_then(Value::as_str) == Some("object") {
                let required: Vec<Value> = map
                    .get("properties")
                    .and_then(Value::as_object)
                    .map(|props| props.keys().cloned().map(Value::String).collect())
                    .unwrap_or_default();
                map.insert("required".to_string(), Value::Array(required));
                map.insert("additionalProperties".to_string(), Value::Bool(false));
            }

            map.values_mut().for_each(strictify);
        }
        Value::Array(items) => items.iter_mut().for_each(strictify),
        _ => {}
    }
}

/// Outcome of decoding a model response into a typed shape.
#[derive(Debug)]
pub enum Decoded<T> {
    Valid(T),
    Invalid { reason: String, raw: Value },
}

impl<T> Decoded<T> {
    pub fn is_valid(&self) -> bool {
        matches!(self, Decoded::Valid(_))
    }

    /// Convert to a call result; invalid output becomes a schema-validation failure.
    pub fn into_result(self) -> CallResult<T> {
        match self {
            Decoded::Valid(value) => Ok(value),
            Decoded::Invalid { reason, .. } => Err(CallError::SchemaValidation(reason)),
        }
    }
}

/// Decode a JSON value into `T`.
pub fn decode<T: DeserializeOwned>(raw: Value) -> Decoded<T> {
    match T::deserialize(&raw) {
        Ok(value) => Decoded::Valid(value),
        Err(e) => Decoded::Invalid {
            reason: e.to_string(),
            raw,
        },
    }
}

/// Decode model text (expected to be a JSON document) into `T`.
pub fn decode_str<T: DeserializeOwned>(text: &str) -> Decoded<T> {
    match serde_json::from_str::<Value>(text) {
        Ok(raw) => decode(raw),
        Err(e) => Decoded::Invalid {
            reason: format!("response is not JSON: {}", e),
            raw: Value::String(text.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::enrichment::{CapabilityResponse, CategoryResponse, QuestionAnswer};

    #[derive(Debug, Deserialize, JsonSchema)]
    struct Contact {
        name: String,
        phone: Option<String>,
    }

    #[derive(Debug, Deserialize, JsonSchema)]
    struct Directory {
        contacts: Vec<Contact>,
    }

    fn required_of(schema: &Value) -> Vec<String> {
        schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_optional_fields_are_required() {
        let schema = Contact::strict_schema();
        let mut required = required_of(&schema);
        required.sort();
        assert_eq!(required, vec!["name", "phone"]);
        assert_eq!(schema["additionalProperties"], Value::Bool(false));
    }

    #[test]
    fn test_nested_shapes_are_inlined() {
        let schema = Directory::strict_schema();
        let text = serde_json::to_string(&schema).unwrap();

        assert!(!text.contains("$ref"));
        assert!(schema.get("definitions").is_none());
        assert!(schema.get("$schema").is_none());

        let item = &schema["properties"]["contacts"]["items"];
        assert_eq!(item["additionalProperties"], Value::Bool(false));
    }

    #[test]
    fn test_enum_shape_has_no_one_of() {
        let text = serde_json::to_string(&CapabilityResponse::strict_schema()).unwrap();
        assert!(!text.contains("oneOf"));
        assert!(text.contains("numeric_fact"));

        let text = serde_json::to_string(&CategoryResponse::strict_schema()).unwrap();
        assert!(text.contains("stat.ML"));
    }

    #[test]
    fn test_decode_valid_and_invalid() {
        let ok = decode::<QuestionAnswer>(serde_json::json!({
            "chain_of_thought": "c",
            "question": "q",
            "answer": "a"
        }));
        assert!(ok.is_valid());

        let bad = decode::<QuestionAnswer>(serde_json::json!({"question": "q"}));
        match bad {
            Decoded::Invalid { reason, raw } => {
                assert!(reason.contains("missing field"));
                assert_eq!(raw["question"], "q");
            }
            Decoded::Valid(_) => panic!("expected invalid"),
        }
    }

    #[test]
    fn test_decode_str_rejects_non_json() {
        let err = decode_str::<QuestionAnswer>("Sure! Here is your answer")
            .into_result()
            .unwrap_err();
        assert!(matches!(err, CallError::SchemaValidation(_)));
    }
}
