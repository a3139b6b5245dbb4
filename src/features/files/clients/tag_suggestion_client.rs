use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::config::SuggestionConfig;
use crate::core::error::{AppError, Result};

/// External text-generation service used to suggest tags
#[async_trait]
pub trait TagSuggestionClient: Send + Sync {
    /// Send one instruction and return the raw response text
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Client for any OpenAI-compatible chat completions endpoint
pub struct OpenAiCompatibleClient {
    http_client: Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatApiResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessageResp,
}

#[derive(Deserialize)]
struct ChatMessageResp {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiCompatibleClient {
    /// Build the client, or `None` when no API key is configured
    pub fn from_config(config: &SuggestionConfig) -> Result<Option<Self>> {
        let Some(api_key) = config.api_key.clone() else {
            return Ok(None);
        };

        let http_client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Some(Self {
            http_client,
            base_url: config.base_url.clone(),
            api_key,
            model: config.model.clone(),
            timeout: config.timeout,
        }))
    }

    fn map_transport_error(&self, e: reqwest::Error) -> AppError {
        if e.is_timeout() {
            AppError::SuggestionTimeout(self.timeout)
        } else {
            AppError::ExternalServiceError {
                status: e.status().map(|s| s.as_u16()),
                body: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl TagSuggestionClient for OpenAiCompatibleClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: 0.2,
        };

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Suggestion request failed: {:?}", e);
                self.map_transport_error(e)
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        if !status.is_success() {
            tracing::warn!("Suggestion service returned status: {}", status);
            return Err(AppError::ExternalServiceError {
                status: Some(status.as_u16()),
                body: text,
            });
        }

        // An unexpected envelope is treated as an empty answer
        let content = serde_json::from_str::<ChatApiResponse>(&text)
            .ok()
            .and_then(|parsed| parsed.choices.into_iter().next())
            .and_then(|choice| choice.message.content)
            .unwrap_or_else(|| {
                tracing::warn!("Suggestion response had no message content");
                String::new()
            });

        tracing::debug!(
            "Raw suggestion response (first 500 chars): {}",
            content.chars().take(500).collect::<String>()
        );

        Ok(content)
    }
}
