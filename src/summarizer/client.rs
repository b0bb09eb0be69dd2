//! Generation service client.
//!
//! The orchestrator talks to the text-generation service through the
//! [`TextGenerator`] trait; [`OllamaGenerator`] is the HTTP implementation
//! against an Ollama-compatible `/api/generate` endpoint.

use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Settings for the generation service.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub service_url: String,
    pub model_name: String,
    pub max_tokens: usize,
    pub timeout_seconds: u64,
    pub temperature: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            service_url: "http://localhost:11434".to_string(),
            model_name: "summllama".to_string(),
            max_tokens: 600,
            timeout_seconds: 60,
            temperature: 0.3,
        }
    }
}

/// Why a generation request produced no text.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("cannot connect to generation service at {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("generation service returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("malformed response body: {0}")]
    MalformedBody(#[source] serde_json::Error),

    #[error("response is missing the `{0}` field")]
    MissingField(&'static str),
}

/// Something that turns a prompt into generated text.
#[allow(async_fn_in_trait)]
pub trait TextGenerator {
    /// Generate text for `prompt`, producing at most `max_tokens` tokens.
    async fn generate(&self, prompt: &str, max_tokens: usize) -> Result<String, GenerationError>;

    /// Model identifier, for logging.
    fn model_name(&self) -> &str;
}

/// Ollama generate API request.
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    num_predict: usize,
    temperature: f32,
}

/// Generator backed by an Ollama server.
pub struct OllamaGenerator {
    config: GenerationConfig,
    http_client: reqwest::Client,
}

impl OllamaGenerator {
    /// Create a generator with a client bounded by the configured timeout.
    pub fn new(config: GenerationConfig) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.config.service_url.trim_end_matches('/'))
    }

    fn classify(&self, error: reqwest::Error) -> GenerationError {
        if error.is_timeout() {
            GenerationError::Timeout(self.config.timeout_seconds)
        } else if error.is_connect() {
            GenerationError::Connect(self.config.service_url.clone())
        } else {
            GenerationError::Request(error)
        }
    }
}

impl TextGenerator for OllamaGenerator {
    async fn generate(&self, prompt: &str, max_tokens: usize) -> Result<String, GenerationError> {
        let url = self.endpoint();

        let request = GenerateRequest {
            model: &self.config.model_name,
            prompt,
            stream: false,
            options: GenerateOptions {
                num_predict: max_tokens,
                temperature: self.config.temperature,
            },
        };

        debug!(
            model = %self.config.model_name,
            prompt_chars = prompt.len(),
            "Sending generate request to {}",
            url
        );

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status { status, body });
        }

        let body = response.text().await.map_err(|e| self.classify(e))?;
        parse_generate_response(&body)
    }

    fn model_name(&self) -> &str {
        &self.config.model_name
    }
}

/// Extract the generated text from a non-streaming generate response body.
pub fn parse_generate_response(body: &str) -> Result<String, GenerationError> {
    let json: Value = serde_json::from_str(body).map_err(GenerationError::MalformedBody)?;

    json.get("response")
        .and_then(Value::as_str)
        .map(|text| text.trim().to_string())
        .ok_or(GenerationError::MissingField("response"))
}
