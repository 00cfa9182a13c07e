//! Completion over a local Ollama server's `/api/generate` endpoint.

use async_trait::async_trait;
use psychbot_chat::CompletionService;
use psychbot_core::config::LlmConfig;
use psychbot_core::error::CapabilityError;
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Non-streaming completion client for Ollama.
pub struct OllamaCompletion {
    client: Client,
    endpoint: String,
    model: String,
}

impl OllamaCompletion {
    pub fn new(config: &LlmConfig) -> Result<Self, CapabilityError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| CapabilityError::LlmUnavailable(format!("HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.endpoint)
    }

    fn request<'a>(&'a self, prompt: &'a str, max_tokens: u32, temperature: f32) -> GenerateRequest<'a> {
        GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature,
                num_predict: max_tokens,
            },
        }
    }
}

#[async_trait]
impl CompletionService for OllamaCompletion {
    async fn complete(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, CapabilityError> {
        let response = self
            .client
            .post(self.generate_url())
            .json(&self.request(prompt, max_tokens, temperature))
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    CapabilityError::LlmUnavailable(format!("connection failed: {}", e))
                } else {
                    CapabilityError::LlmUnavailable(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CapabilityError::LlmUnavailable(format!(
                "status {}: {}",
                status, body
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| CapabilityError::LlmUnavailable(format!("bad response body: {}", e)))?;
        tracing::debug!(model = %self.model, chars = parsed.response.len(), "Completion received");
        Ok(parsed.response)
    }
}
