//! Classification model configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

const OLLAMA_ENDPOINT: &str = "http://localhost:11434";
const OLLAMA_MODEL: &str = "phi3";
const OPENAI_ENDPOINT: &str = "https://api.openai.com";
const OPENAI_MODEL: &str = "gpt-4o-mini";
const TOGETHER_ENDPOINT: &str = "https://api.together.xyz";
const TOGETHER_MODEL: &str = "meta-llama/Llama-Vision-Free";

/// LLM provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Ollama API (local, streaming, default)
    #[default]
    Ollama,
    /// OpenAI-compatible API (OpenAI, Together.ai, etc.)
    #[serde(alias = "together")]
    OpenAI,
}

impl LlmProvider {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Some(Self::Ollama),
            "openai" | "together" => Some(Self::OpenAI),
            _ => None,
        }
    }
}

/// Endpoint, model and API key variable for a provider name.
fn provider_defaults(name: &str) -> Option<(&'static str, &'static str, Option<&'static str>)> {
    match name {
        "together" => Some((TOGETHER_ENDPOINT, TOGETHER_MODEL, Some("TOGETHER_API_KEY"))),
        "openai" => Some((OPENAI_ENDPOINT, OPENAI_MODEL, Some("OPENAI_API_KEY"))),
        "ollama" => Some((OLLAMA_ENDPOINT, OLLAMA_MODEL, None)),
        _ => None,
    }
}

/// Provider names accepted in settings files.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ProviderName {
    #[default]
    Ollama,
    OpenAI,
    Together,
}

impl ProviderName {
    fn as_str(self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::OpenAI => "openai",
            Self::Together => "together",
        }
    }
}

/// Settings-file form of [`LlmConfig`]; absent endpoint and model take the
/// named provider's defaults.
#[derive(Deserialize)]
struct LlmConfigFile {
    #[serde(default)]
    provider: ProviderName,
    endpoint: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

impl From<LlmConfigFile> for LlmConfig {
    fn from(file: LlmConfigFile) -> Self {
        let name = file.provider.as_str();
        let (endpoint, model) = provider_defaults(name)
            .map(|(endpoint, model, _)| (endpoint, model))
            .unwrap_or((OLLAMA_ENDPOINT, OLLAMA_MODEL));
        Self {
            provider: LlmProvider::from_str(name).unwrap_or_default(),
            endpoint: file.endpoint.unwrap_or_else(|| endpoint.to_string()),
            api_key: file.api_key,
            model: file.model.unwrap_or_else(|| model.to_string()),
            timeout_secs: file.timeout_secs,
        }
    }
}

/// Configuration for the classification backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "LlmConfigFile")]
pub struct LlmConfig {
    /// LLM provider (ollama or openai)
    pub provider: LlmProvider,
    /// API endpoint (provider-specific defaults apply)
    pub endpoint: String,
    /// API key for OpenAI-compatible providers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Model used for classification
    pub model: String,
    /// HTTP timeout for one classification call; unset waits indefinitely
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

fn default_endpoint() -> String {
    OLLAMA_ENDPOINT.to_string()
}

fn default_model() -> String {
    OLLAMA_MODEL.to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            endpoint: default_endpoint(),
            api_key: None,
            model: default_model(),
            timeout_secs: None,
        }
    }
}

impl LlmConfig {
    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `LLM_PROVIDER`: "ollama" (default), "openai", or "together"
    /// - `LLM_ENDPOINT`: API endpoint (defaults based on provider)
    /// - `LLM_API_KEY`: API key for OpenAI-compatible providers
    /// - `LLM_MODEL`: Model name
    /// - `LLM_TIMEOUT_SECS`: Request timeout in seconds
    ///
    /// An explicit `LLM_PROVIDER` also switches the endpoint and model to that
    /// provider's defaults unless they are set explicitly, and picks up
    /// `TOGETHER_API_KEY` or `OPENAI_API_KEY` when no `LLM_API_KEY` is given.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable source.
    pub fn with_overrides_from(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        let explicit_provider = var("LLM_PROVIDER").map(|p| p.to_lowercase());
        if let Some(provider) = explicit_provider.as_deref().and_then(LlmProvider::from_str) {
            self.provider = provider;
        }

        let explicit_endpoint = var("LLM_ENDPOINT");
        let explicit_model = var("LLM_MODEL");

        if let Some(key) = var("LLM_API_KEY") {
            self.api_key = Some(key);
        }

        if let Some((endpoint, model, key_var)) =
            explicit_provider.as_deref().and_then(provider_defaults)
        {
            if explicit_endpoint.is_none() {
                self.endpoint = endpoint.to_string();
            }
            if explicit_model.is_none() {
                self.model = model.to_string();
            }
            if self.api_key.is_none() {
                self.api_key = key_var.and_then(|key| var(key));
            }
        }

        if let Some(endpoint) = explicit_endpoint {
            self.endpoint = endpoint;
        }
        if let Some(model) = explicit_model {
            self.model = model;
        }
        if let Some(val) = var("LLM_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse() {
                self.timeout_secs = Some(secs);
            }
        }
        self
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Endpoint without a trailing slash, ready for path joining.
    pub(crate) fn base_url(&self) -> &str {
        self.endpoint.trim_end_matches('/')
    }
}
