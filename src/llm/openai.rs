//! OpenAI-compatible chat completion backend (OpenAI, Together.ai).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::prompt::build_prompt;
use super::{classification_or_empty, http_client, ClassificationBackend, LlmConfig, LlmError};
use crate::config::Taxonomy;
use crate::models::ClassificationResult;

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<CompletionMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct CompletionMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Option<Vec<CompletionChoice>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

impl CompletionResponse {
    /// Content of the first choice, trimmed.
    fn into_content(self) -> Result<String, LlmError> {
        if let Some(error) = self.error {
            return Err(LlmError::Api(error.message));
        }

        self.choices
            .and_then(|choices| choices.into_iter().next())
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| LlmError::Parse("response has no choices[0].message.content".to_string()))
    }
}

/// Remote model behind an OpenAI-compatible API; one request, one reply.
pub struct OpenAiBackend {
    config: LlmConfig,
    client: Client,
}

impl OpenAiBackend {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let client = http_client(&config)?;
        Ok(Self { config, client })
    }

    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let request = CompletionRequest {
            model: &self.config.model,
            messages: vec![CompletionMessage {
                role: "user",
                content: prompt,
            }],
        };

        let url = format!("{}/v1/chat/completions", self.config.base_url());
        let mut builder = self.client.post(&url).json(&request);
        if let Some(ref api_key) = self.config.api_key {
            builder = builder.bearer_auth(api_key);
        } else {
            debug!("No API key configured for {}", url);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| LlmError::Connection(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("HTTP {}: {}", status, body)));
        }

        let completion: CompletionResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Parse(format!("Failed to parse response: {}", e)))?;

        completion.into_content()
    }
}

#[async_trait]
impl ClassificationBackend for OpenAiBackend {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn classify(&self, content: &str, taxonomy: &Taxonomy) -> ClassificationResult {
        info!("Classifying {} chars with {}", content.len(), self.config.model);
        let prompt = build_prompt(content, taxonomy);
        let reply = self.complete(&prompt).await.and_then(|text| {
            ClassificationResult::from_reply(&text).map_err(|e| LlmError::Parse(e.to_string()))
        });
        classification_or_empty(self.name(), reply)
    }
}
