//! Streaming Ollama chat backend.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::prompt::build_prompt;
use super::{classification_or_empty, http_client, ClassificationBackend, LlmConfig, LlmError};
use crate::config::Taxonomy;
use crate::models::ClassificationResult;

/// Ollama `/api/chat` request format.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// One NDJSON line of a streamed chat reply.
#[derive(Debug, Deserialize)]
struct ChatFragment {
    #[serde(default)]
    message: Option<FragmentMessage>,
}

#[derive(Debug, Deserialize)]
struct FragmentMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Reassembles a streamed reply from newline-delimited JSON fragments.
///
/// Chunks may split lines anywhere; bytes are buffered until a newline
/// arrives. Each complete non-empty line contributes its `message.content`.
/// Lines that are not valid fragments are logged and skipped.
#[derive(Debug, Default)]
pub struct FragmentAccumulator {
    pending: Vec<u8>,
    text: String,
    fragments: usize,
    skipped: usize,
}

impl FragmentAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next chunk of the response body.
    pub fn push(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            self.push_line(&line[..line.len() - 1]);
        }
    }

    /// Flush any trailing unterminated line and return the accumulated text.
    pub fn finish(mut self) -> String {
        let rest = std::mem::take(&mut self.pending);
        self.push_line(&rest);
        debug!(
            "Reassembled reply from {} fragment(s), {} skipped",
            self.fragments, self.skipped
        );
        self.text
    }

    fn push_line(&mut self, line: &[u8]) {
        let line = line.trim_ascii();
        if line.is_empty() {
            return;
        }

        match serde_json::from_slice::<ChatFragment>(line) {
            Ok(fragment) => {
                self.fragments += 1;
                if let Some(content) = fragment.message.and_then(|m| m.content) {
                    self.text.push_str(&content);
                }
            }
            Err(e) => {
                self.skipped += 1;
                warn!(
                    "Failed to parse line: {} ({})",
                    String::from_utf8_lossy(line),
                    e
                );
            }
        }
    }
}

/// Local Ollama model, consumed as a stream.
pub struct OllamaBackend {
    config: LlmConfig,
    client: Client,
}

impl OllamaBackend {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let client = http_client(&config)?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Check if the Ollama service is reachable.
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.config.base_url());
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    /// List available models.
    pub async fn list_models(&self) -> Result<Vec<String>, LlmError> {
        let url = format!("{}/api/tags", self.config.base_url());
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LlmError::Connection(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(LlmError::Api(format!("HTTP {}", resp.status())));
        }

        #[derive(Deserialize)]
        struct TagsResponse {
            models: Vec<ModelInfo>,
        }

        #[derive(Deserialize)]
        struct ModelInfo {
            name: String,
        }

        let tags: TagsResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Send `prompt` and reassemble the streamed reply text.
    async fn chat(&self, prompt: &str) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            stream: true,
        };

        let url = format!("{}/api/chat", self.config.base_url());
        let resp = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Connection(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("HTTP {}: {}", status, body)));
        }

        let mut accumulator = FragmentAccumulator::new();
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| LlmError::Connection(e.to_string()))?;
            accumulator.push(&chunk);
        }

        Ok(accumulator.finish())
    }
}

#[async_trait]
impl ClassificationBackend for OllamaBackend {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn classify(&self, content: &str, taxonomy: &Taxonomy) -> ClassificationResult {
        info!("Classifying {} chars with {}", content.len(), self.config.model);
        let prompt = build_prompt(content, taxonomy);
        let reply = self.chat(&prompt).await.and_then(|text| {
            ClassificationResult::from_reply(&text).map_err(|e| LlmError::Parse(e.to_string()))
        });
        classification_or_empty(self.name(), reply)
    }
}
