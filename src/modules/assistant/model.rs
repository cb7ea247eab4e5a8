// Port onto the language model. Completions are schema-constrained JSON so
// downstream code never parses free text.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model unreachable: {0}")]
    Network(String),

    #[error("model reply was not valid JSON: {0}")]
    Serialization(String),

    #[error("model rejected the credentials")]
    Authentication,

    #[error("model rate limit hit")]
    RateLimit,

    #[error("model unavailable: {message}")]
    ServiceUnavailable { message: String },

    #[error("model reply did not match the schema: {message}")]
    InvalidResponse { message: String },
}

pub type ModelResult<T> = Result<T, ModelError>;

#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Completion constrained by a JSON schema; the returned value conforms
    /// to `response_schema`.
    async fn complete_structured(
        &self,
        prompt: &str,
        response_schema: &Value,
    ) -> ModelResult<Value>;

    fn provider_name(&self) -> &'static str;
}

/// Runs a structured completion and deserializes the reply into `T`.
pub async fn structured<T: DeserializeOwned>(
    provider: &dyn ModelProvider,
    prompt: &str,
    response_schema: &Value,
) -> ModelResult<T> {
    let value = provider.complete_structured(prompt, response_schema).await?;
    serde_json::from_value(value).map_err(|err| ModelError::InvalidResponse {
        message: err.to_string(),
    })
}
