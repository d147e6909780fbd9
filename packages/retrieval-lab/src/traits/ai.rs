//! Structured extraction and embedding collaborators.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::CallResult;
use crate::schema::{decode, StructuredOutput};

/// One structured call: prompts plus the schema the answer must satisfy.
#[derive(Debug, Clone, Serialize)]
pub struct StructuredRequest {
    pub model: String,
    pub system_prompt: String,
    pub user_prompt: String,
    pub shape_name: String,
    pub schema: Value,
}

impl StructuredRequest {
    /// Build a request for the response shape `T`.
    pub fn for_shape<T: StructuredOutput>(
        model: impl Into<String>,
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            shape_name: T::shape_name(),
            schema: T::strict_schema(),
        }
    }
}

/// Invokes a language model and returns its JSON answer.
///
/// Implementations report every failure as a [`CallError`](crate::CallError);
/// decoding into a typed shape happens in [`extract`].
#[async_trait]
pub trait StructuredClient: Send + Sync {
    async fn call(&self, request: StructuredRequest) -> CallResult<Value>;
}

#[async_trait]
impl<C: StructuredClient + ?Sized> StructuredClient for std::sync::Arc<C> {
    async fn call(&self, request: StructuredRequest) -> CallResult<Value> {
        (**self).call(request).await
    }
}

/// Ask `client` for a `T` and decode the answer.
///
/// A response that does not match the shape comes back as
/// `CallError::SchemaValidation`, which the retry layer treats as transient.
pub async fn extract<C, T>(
    client: &C,
    model: &str,
    system_prompt: &str,
    user_prompt: &str,
) -> CallResult<T>
where
    C: StructuredClient + ?Sized,
    T: StructuredOutput,
{
    let request = StructuredRequest::for_shape::<T>(model, system_prompt, user_prompt);
    let raw = client.call(request).await?;
    decode::<T>(raw).into_result()
}

/// Produces dense embeddings for text.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> CallResult<Vec<Vec<f32>>>;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> CallResult<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| crate::error::CallError::Api("empty embedding response".into()))
    }
}
