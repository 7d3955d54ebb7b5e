//! Classification client.
//!
//! Two backends sit behind [`ClassificationBackend`]: a streaming Ollama
//! chat backend for local models and a single-shot OpenAI-compatible
//! backend (OpenAI, Together.ai). Classification never fails outright;
//! transport, status and parse failures are logged and yield the empty
//! result.

mod config;
mod ollama;
mod openai;
pub mod prompt;

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{error, warn};

use crate::config::Taxonomy;
use crate::models::ClassificationResult;

pub use config::{LlmConfig, LlmProvider};
pub use ollama::{FragmentAccumulator, OllamaBackend};
pub use openai::OpenAiBackend;
pub use prompt::build_prompt;

/// A model that classifies aggregated document text against a taxonomy.
#[async_trait]
pub trait ClassificationBackend: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Classify `content`; failures are mapped to the empty result.
    async fn classify(&self, content: &str, taxonomy: &Taxonomy) -> ClassificationResult;
}

/// Build the backend selected by `config.provider`.
pub fn backend_from_config(config: &LlmConfig) -> Result<Arc<dyn ClassificationBackend>, LlmError> {
    Ok(match config.provider {
        LlmProvider::Ollama => Arc::new(OllamaBackend::new(config.clone())?),
        LlmProvider::OpenAI => Arc::new(OpenAiBackend::new(config.clone())?),
    })
}

/// HTTP client honoring the configured timeout, if any.
fn http_client(config: &LlmConfig) -> Result<Client, LlmError> {
    let mut builder = Client::builder();
    if let Some(timeout) = config.timeout() {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| LlmError::Connection(format!("Failed to create HTTP client: {}", e)))
}

/// Log a failed classification and fall back to the empty result.
fn classification_or_empty(
    backend: &str,
    reply: Result<ClassificationResult, LlmError>,
) -> ClassificationResult {
    match reply {
        Ok(result) => result,
        Err(e @ LlmError::Api(_)) => {
            error!("{} classification failed: {}", backend, e);
            ClassificationResult::empty()
        }
        Err(e) => {
            warn!("{} classification failed: {}", backend, e);
            ClassificationResult::empty()
        }
    }
}

/// Errors that can occur during LLM operations.
#[derive(Debug)]
pub enum LlmError {
    /// Failed to connect to LLM service
    Connection(String),
    /// API returned an error
    Api(String),
    /// Failed to parse response
    Parse(String),
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmError::Connection(msg) => write!(f, "Connection error: {}", msg),
            LlmError::Api(msg) => write!(f, "API error: {}", msg),
            LlmError::Parse(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for LlmError {}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Backend that records every content it is asked to classify.
    pub struct RecordingBackend {
        pub reply: ClassificationResult,
        pub contents: Mutex<Vec<String>>,
    }

    impl RecordingBackend {
        pub fn new(reply: ClassificationResult) -> Self {
            Self {
                reply,
                contents: Mutex::new(Vec::new()),
            }
        }

        pub fn contents(&self) -> Vec<String> {
            self.contents.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ClassificationBackend for RecordingBackend {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn classify(&self, content: &str, _taxonomy: &Taxonomy) -> ClassificationResult {
            self.contents.lock().unwrap().push(content.to_string());
            self.reply.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_selection_by_provider() {
        let ollama = backend_from_config(&LlmConfig::default()).unwrap();
        assert_eq!(ollama.name(), "ollama");

        let config = LlmConfig {
            provider: LlmProvider::OpenAI,
            ..LlmConfig::default()
        };
        let openai = backend_from_config(&config).unwrap();
        assert_eq!(openai.name(), "openai");
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            LlmError::Api("HTTP 500".to_string()).to_string(),
            "API error: HTTP 500"
        );
    }
}
