//! LLM summarization of preprocessed instructor documents.
//!
//! This module provides the generation service client, the prompt
//! templates, and the orchestrator that drives single and batch runs.

pub mod client;
pub mod orchestrator;
pub mod prompt;

pub use client::{GenerationConfig, OllamaGenerator};
pub use orchestrator::{BatchReport, FileOutcome, OrchestratorConfig, SummaryOrchestrator};
pub use prompt::PromptTemplates;
