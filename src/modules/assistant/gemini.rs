// Gemini adapter for the ModelProvider port, using the generateContent REST
// endpoint with a response schema so replies come back as JSON.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use tracing::debug;

use crate::modules::assistant::model::{ModelError, ModelProvider, ModelResult};
use crate::shared::config::Settings;

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiProvider {
    http: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiProvider {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            http: Client::new(),
            api_key: settings.gemini_api_key.clone(),
            model: settings.gemini_model.clone(),
            base_url: DEFAULT_API_BASE.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

/// Text of the first candidate part, where the JSON payload lives.
fn extract_text(reply: &Value) -> ModelResult<&str> {
    reply["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .ok_or_else(|| ModelError::InvalidResponse {
            message: "no text part in first candidate".into(),
        })
}

#[async_trait]
impl ModelProvider for GeminiProvider {
    async fn complete_structured(
        &self,
        prompt: &str,
        response_schema: &Value,
    ) -> ModelResult<Value> {
        let body = json!({
            "contents": [
                { "role": "user", "parts": [ { "text": prompt } ] },
            ],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": response_schema,
            },
        });

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| ModelError::Network(err.to_string()))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(ModelError::Authentication);
            }
            StatusCode::TOO_MANY_REQUESTS => return Err(ModelError::RateLimit),
            status if status.is_server_error() => {
                return Err(ModelError::ServiceUnavailable {
                    message: format!("status {status}"),
                });
            }
            status => {
                return Err(ModelError::InvalidResponse {
                    message: format!("unexpected status {status}"),
                });
            }
        }

        let reply: Value = response
            .json()
            .await
            .map_err(|err| ModelError::Serialization(err.to_string()))?;
        let text = extract_text(&reply)?;
        debug!(chars = text.len(), "model replied");
        serde_json::from_str(text).map_err(|err| ModelError::Serialization(err.to_string()))
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }
}
