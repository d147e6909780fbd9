//! OpenAI implementation of the structured-client and embedder traits.
//!
//! Structured calls use chat completions with a strict `json_schema`
//! response format; embeddings default to `text-embedding-3-small`.
//!
//! # Example
//!
//! ```rust,ignore
//! use retrieval_lab::ai::OpenAI;
//!
//! let openai = OpenAI::from_env()?;
//! let pipeline = EnrichmentPipeline::new(&openai, &executor);
//! ```

use async_trait::async_trait;
use reqwest::Client;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ai::http::post_json;
use crate::error::{CallError, CallResult, ConfigError};
use crate::traits::ai::{Embedder, StructuredClient, StructuredRequest};

const PROVIDER: &str = "openai";

/// OpenAI-backed structured client and embedder.
pub struct OpenAI {
    client: Client,
    api_key: SecretString,
    embedding_model: String,
    base_url: String,
}

impl OpenAI {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: SecretString::from(api_key.into()),
            embedding_model: "text-embedding-3-small".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    /// Create from environment variable `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ConfigError::MissingCredential("OPENAI_API_KEY".into()))?;
        Ok(Self::new(api_key))
    }

    /// Set the embedding model (default: text-embedding-3-small).
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    /// Set a custom base URL (for Azure, proxies, etc.).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct JsonSchemaFormat<'a> {
    name: String,
    strict: bool,
    schema: &'a Value,
}

#[derive(Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    format_type: &'static str,
    json_schema: JsonSchemaFormat<'a>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    response_format: ResponseFormat<'a>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    content: Option<String>,
    refusal: Option<String>,
}

fn chat_request(request: &StructuredRequest) -> ChatRequest<'_> {
    ChatRequest {
        model: &request.model,
        messages: vec![
            ChatMessage {
                role: "system",
                content: &request.system_prompt,
            },
            ChatMessage {
                role: "user",
                content: &request.user_prompt,
            },
        ],
        temperature: 0.0,
        response_format: ResponseFormat {
            format_type: "json_schema",
            json_schema: JsonSchemaFormat {
                name: schema_name(&request.shape_name),
                strict: true,
                schema: &request.schema,
            },
        },
    }
}

/// Schema names may only hold ASCII alphanumerics, `_` and `-`.
fn schema_name(shape_name: &str) -> String {
    shape_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .take(64)
        .collect()
}

/// Pull the JSON answer out of a chat response.
fn answer(response: ChatResponse) -> CallResult<Value> {
    let message = response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message)
        .ok_or_else(|| CallError::Api("no choices in response".into()))?;

    if let Some(refusal) = message.refusal {
        return Err(CallError::SchemaValidation(format!("model refused: {}", refusal)));
    }
    let content = message
        .content
        .ok_or_else(|| CallError::SchemaValidation("empty message content".into()))?;
    serde_json::from_str(&content)
        .map_err(|e| CallError::SchemaValidation(format!("content is not JSON: {}", e)))
}

#[async_trait]
impl StructuredClient for OpenAI {
    async fn call(&self, request: StructuredRequest) -> CallResult<Value> {
        let url = format!("{}/chat/completions", self.base_url);
        let response: ChatResponse = post_json(
            &self.client,
            PROVIDER,
            &url,
            &self.api_key,
            &chat_request(&request),
        )
        .await?;
        answer(response)
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for OpenAI {
    async fn embed_batch(&self, texts: &[String]) -> CallResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/embeddings", self.base_url);
        let body = EmbeddingRequest {
            model: &self.embedding_model,
            input: texts,
        };
        let response: EmbeddingResponse =
            post_json(&self.client, PROVIDER, &url, &self.api_key, &body).await?;

        let mut data = response.data;
        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> StructuredRequest {
        StructuredRequest {
            model: "gpt-4o".into(),
            system_prompt: "sys".into(),
            user_prompt: "user".into(),
            shape_name: "Enriched<Doc, Answer>".into(),
            schema: json!({ "type": "object" }),
        }
    }

    #[test]
    fn test_request_uses_strict_json_schema() {
        let request = request();
        let body = serde_json::to_value(chat_request(&request)).unwrap();

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "user");
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(body["response_format"]["json_schema"]["strict"], true);
        assert_eq!(
            body["response_format"]["json_schema"]["name"],
            "Enriched_Doc__Answer_"
        );
    }

    #[test]
    fn test_answer_decodes_content() {
        let response: ChatResponse = serde_json::from_value(json!({
            "choices": [{ "message": { "content": "{\"category\": \"cs.IR\"}" } }]
        }))
        .unwrap();
        assert_eq!(answer(response).unwrap(), json!({ "category": "cs.IR" }));
    }

    #[test]
    fn test_refusal_and_garbage_are_schema_failures() {
        let refused: ChatResponse = serde_json::from_value(json!({
            "choices": [{ "message": { "content": null, "refusal": "no" } }]
        }))
        .unwrap();
        assert!(matches!(answer(refused), Err(CallError::SchemaValidation(_))));

        let garbage: ChatResponse = serde_json::from_value(json!({
            "choices": [{ "message": { "content": "not json" } }]
        }))
        .unwrap();
        assert!(matches!(answer(garbage), Err(CallError::SchemaValidation(_))));
    }

    #[test]
    fn test_missing_key_is_config_error() {
        // Only meaningful when the variable is absent from the test environment.
        if std::env::var("OPENAI_API_KEY").is_err() {
            assert!(matches!(
                OpenAI::from_env(),
                Err(ConfigError::MissingCredential(_))
            ));
        }
    }
}
