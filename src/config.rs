//! Configuration file handling.
//!
//! This module handles loading `.reviewdigest.toml` and merging it with
//! command-line overrides.

use crate::summarizer::{GenerationConfig, PromptTemplates};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".reviewdigest.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Data directory layout.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Generation service settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Review source settings.
    #[serde(default)]
    pub source: SourceConfig,

    /// Prompt template overrides.
    #[serde(default)]
    pub prompt: PromptConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

/// Where each pipeline stage reads and writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Raw records as fetched from the review source.
    #[serde(default = "default_raw_dir")]
    pub raw_dir: PathBuf,

    /// Aggregates and legacy cleaned documents.
    #[serde(default = "default_preprocessed_dir")]
    pub preprocessed_dir: PathBuf,

    /// Summarized documents.
    #[serde(default = "default_summaries_dir")]
    pub summaries_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw_dir: default_raw_dir(),
            preprocessed_dir: default_preprocessed_dir(),
            summaries_dir: default_summaries_dir(),
        }
    }
}

fn default_raw_dir() -> PathBuf {
    PathBuf::from("data/raw")
}

fn default_preprocessed_dir() -> PathBuf {
    PathBuf::from("data/preprocessed")
}

fn default_summaries_dir() -> PathBuf {
    PathBuf::from("data/summaries")
}

/// LLM model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model name.
    #[serde(default = "default_model")]
    pub name: String,

    /// Ollama API URL.
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    /// Temperature for generation.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens in a generated summary.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            ollama_url: default_ollama_url(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_model() -> String {
    "summllama".to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> usize {
    600
}

fn default_timeout() -> u64 {
    60
}

/// Review source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// URL template; `{query}` is replaced by the `+`-joined instructor name.
    #[serde(default = "default_url_template")]
    pub url_template: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url_template: default_url_template(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_url_template() -> String {
    "https://example.com/api/reviews?prof={query}".to_string()
}

/// Prompt template overrides. Each must contain `{name}` and `{reviews}`
/// exactly once.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Template for aggregate documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate_template: Option<String>,

    /// Template for legacy review lists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legacy_template: Option<String>,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence, but only when explicitly provided.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref model) = args.model {
            self.model.name = model.clone();
        }
        if let Some(ref url) = args.service_url {
            self.model.ollama_url = url.clone();
        }
        if let Some(max_tokens) = args.max_tokens {
            self.model.max_tokens = max_tokens;
        }
        if let Some(timeout) = args.timeout {
            self.model.timeout_seconds = timeout;
        }
        if let Some(ref data_dir) = args.data_dir {
            self.paths = PathsConfig {
                raw_dir: data_dir.join("raw"),
                preprocessed_dir: data_dir.join("preprocessed"),
                summaries_dir: data_dir.join("summaries"),
            };
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Settings handed to the generation client.
    pub fn generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            service_url: self.model.ollama_url.clone(),
            model_name: self.model.name.clone(),
            max_tokens: self.model.max_tokens,
            timeout_seconds: self.model.timeout_seconds,
            temperature: self.model.temperature,
        }
    }

    /// Prompt templates with any configured overrides applied.
    pub fn prompt_templates(&self) -> Result<PromptTemplates> {
        let mut templates = PromptTemplates::default();

        if let Some(ref aggregate) = self.prompt.aggregate_template {
            templates.aggregate = aggregate.clone();
        }
        if let Some(ref legacy) = self.prompt.legacy_template {
            templates.legacy = legacy.clone();
        }

        templates.validate()?;
        Ok(templates)
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
