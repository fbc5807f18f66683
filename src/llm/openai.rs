//! OpenAI-compatible chat-completions provider.

use secrecy::{ExposeSecret, SecretString};

use crate::config::LlmSettings;
use crate::error::LlmError;
use crate::llm::{CompletionRequest, CompletionResponse, LlmProvider};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Chat-completions provider for OpenAI and API-compatible services.
pub struct OpenAiProvider {
    http: reqwest::Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl OpenAiProvider {
    /// Create a provider from classifier settings.
    pub fn new(settings: &LlmSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the provider at a different API-compatible endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn request_failed(&self, reason: impl Into<String>) -> LlmError {
        LlmError::RequestFailed {
            provider: "openai".to_string(),
            reason: reason.into(),
        }
    }

    fn invalid_response(&self, reason: impl Into<String>) -> LlmError {
        LlmError::InvalidResponse {
            provider: "openai".to_string(),
            reason: reason.into(),
        }
    }
}

#[async_trait::async_trait]
impl LlmProvider for OpenAiProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": request.messages,
        });
        if let Some(temperature) = request.temperature {
            body["temperature"] = serde_json::json!(temperature);
        }
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        if request.json_object {
            body["response_format"] = serde_json::json!({"type": "json_object"});
        }

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.request_failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(self.request_failed(format!("HTTP {status}: {detail}")));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| self.invalid_response(e.to_string()))?;

        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| self.invalid_response("missing message content"))?
            .to_string();

        let input_tokens = payload["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32;
        let output_tokens = payload["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32;

        tracing::debug!(
            model = %self.model,
            input_tokens,
            output_tokens,
            "Completion received"
        );

        Ok(CompletionResponse {
            content,
            input_tokens,
            output_tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> LlmSettings {
        LlmSettings {
            api_key: SecretString::from("test-key"),
            model: "gpt-4o".to_string(),
            temperature: 0.2,
        }
    }

    #[test]
    fn provider_reports_model_name() {
        let provider = OpenAiProvider::new(&settings());
        assert_eq!(provider.model_name(), "gpt-4o");
    }

    #[test]
    fn provider_base_url_override() {
        let provider = OpenAiProvider::new(&settings()).with_base_url("http://localhost:11434/v1");
        assert_eq!(provider.base_url, "http://localhost:11434/v1");
    }
}
