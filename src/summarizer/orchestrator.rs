//! Summary orchestration.
//!
//! Each preprocessed document moves through
//! `Loaded -> Validated -> Prompted -> Summarized -> Persisted`, or straight
//! from `Validated` to `Persisted` when there is nothing to summarize.
//! A failure on one file is recorded in its [`FileReport`] and never stops
//! the rest of a batch.

use crate::models::display_name_from_stem;
use crate::storage::{file_stem, summary_file_name, OutputDir};
use crate::summarizer::client::TextGenerator;
use crate::summarizer::prompt::PromptTemplates;
use anyhow::{Context, Result};
use chrono::Local;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Placeholder stored when the generation service produced no summary.
pub const SUMMARY_FAILURE_SENTINEL: &str = "Error generating summary";

/// Field holding the merged corpus in the aggregate shape.
pub const AGGREGATE_FIELD: &str = "all_merged_reviews";

/// Field added to legacy documents to hold the summary.
pub const LEGACY_SUMMARY_FIELD: &str = "summary";

/// Field stamped on every persisted summary document.
pub const TIMESTAMP_FIELD: &str = "date_summarized";

/// Compact numeric timestamp format for [`TIMESTAMP_FIELD`].
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Processing stage reached by a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Loaded,
    Validated,
    Prompted,
    Summarized,
    Persisted,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Loaded => write!(f, "loaded"),
            Stage::Validated => write!(f, "validated"),
            Stage::Prompted => write!(f, "prompted"),
            Stage::Summarized => write!(f, "summarized"),
            Stage::Persisted => write!(f, "persisted"),
        }
    }
}

/// What a preprocessed document offers for summarization.
#[derive(Debug, Clone, PartialEq)]
pub enum SummaryInput {
    /// Aggregate shape. `corpus` is `None` when the field is blank or not text.
    Aggregate { name: String, corpus: Option<String> },
    /// Legacy `{professor, reviews}` shape.
    Legacy {
        professor: String,
        reviews: Vec<String>,
    },
    /// Neither shape; persisted unchanged apart from the timestamp.
    Unrecognized,
}

impl SummaryInput {
    /// Classify a document. `fallback_name` is used when the aggregate
    /// carries no usable `name`.
    pub fn classify(document: &Map<String, Value>, fallback_name: &str) -> Self {
        if let Some(corpus) = document.get(AGGREGATE_FIELD) {
            let name = document
                .get("name")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .unwrap_or(fallback_name)
                .to_string();

            let corpus = corpus
                .as_str()
                .filter(|text| !text.trim().is_empty())
                .map(String::from);

            return SummaryInput::Aggregate { name, corpus };
        }

        if document.contains_key("professor") || document.contains_key("reviews") {
            let professor = document
                .get("professor")
                .and_then(Value::as_str)
                .unwrap_or(fallback_name)
                .to_string();

            let reviews = document
                .get("reviews")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .filter(|review| !review.trim().is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default();

            return SummaryInput::Legacy { professor, reviews };
        }

        SummaryInput::Unrecognized
    }

    /// Build the prompt, or explain why there is nothing to summarize.
    pub fn prompt(&self, templates: &PromptTemplates) -> std::result::Result<String, &'static str> {
        match self {
            SummaryInput::Aggregate {
                name,
                corpus: Some(corpus),
            } => Ok(templates.aggregate_prompt(name, corpus)),
            SummaryInput::Aggregate { corpus: None, .. } => {
                Err("`all_merged_reviews` is empty or not a string")
            }
            SummaryInput::Legacy { reviews, .. } if reviews.is_empty() => {
                Err("no reviews to summarize")
            }
            SummaryInput::Legacy { professor, reviews } => {
                Ok(templates.legacy_prompt(professor, reviews))
            }
            SummaryInput::Unrecognized => Err("no summarizable field found"),
        }
    }

    /// Field that receives the generated summary.
    pub fn target_field(&self) -> Option<&'static str> {
        match self {
            SummaryInput::Aggregate { .. } => Some(AGGREGATE_FIELD),
            SummaryInput::Legacy { .. } => Some(LEGACY_SUMMARY_FIELD),
            SummaryInput::Unrecognized => None,
        }
    }
}

/// Result of processing one file.
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    /// The service produced a summary and the document was written.
    Summarized { output: PathBuf },
    /// The service failed; the sentinel was stored and the document written.
    ServiceFailed { output: PathBuf, error: String },
    /// Nothing to summarize; the document was written without a service call.
    PassedThrough { output: PathBuf, reason: String },
    /// The file could not be loaded, classified, or written.
    Failed { error: String },
}

impl FileOutcome {
    /// Path of the written document, if any.
    pub fn output(&self) -> Option<&Path> {
        match self {
            FileOutcome::Summarized { output }
            | FileOutcome::ServiceFailed { output, .. }
            | FileOutcome::PassedThrough { output, .. } => Some(output.as_path()),
            FileOutcome::Failed { .. } => None,
        }
    }
}

/// Outcome of one file together with the last stage it reached.
#[derive(Debug, Clone, PartialEq)]
pub struct FileReport {
    pub input: PathBuf,
    pub stage: Stage,
    pub outcome: FileOutcome,
}

/// Per-file results of a batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub files: Vec<FileReport>,
}

impl BatchReport {
    pub fn summarized(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Summarized { .. }))
    }

    pub fn service_failed(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::ServiceFailed { .. }))
    }

    pub fn passed_through(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::PassedThrough { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Failed { .. }))
    }

    /// Returns true if any file could not be written at all.
    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    fn count(&self, predicate: impl Fn(&FileOutcome) -> bool) -> usize {
        self.files.iter().filter(|f| predicate(&f.outcome)).count()
    }
}

/// Settings for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Directory receiving `<stem>_summary.json` documents.
    pub output_dir: PathBuf,
    /// Upper bound on generated tokens per summary.
    pub max_tokens: usize,
    pub templates: PromptTemplates,
    /// Show a progress bar during batch runs.
    pub show_progress: bool,
}

/// Drives summarization of preprocessed documents.
pub struct SummaryOrchestrator<G: TextGenerator> {
    generator: G,
    config: OrchestratorConfig,
}

impl<G: TextGenerator> SummaryOrchestrator<G> {
    pub fn new(generator: G, config: OrchestratorConfig) -> Self {
        info!(
            "Initializing summarizer with model {}, output to {}",
            generator.model_name(),
            config.output_dir.display()
        );
        Self { generator, config }
    }

    /// Summarize every file in `inputs`, in order. Never aborts early.
    pub async fn run_batch(&self, inputs: &[PathBuf]) -> BatchReport {
        let progress = if self.config.show_progress {
            let pb = ProgressBar::new(inputs.len() as u64);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            {
                pb.set_style(style.progress_chars("#>-"));
            }
            Some(pb)
        } else {
            None
        };

        let mut report = BatchReport::default();

        for input in inputs {
            if let Some(ref pb) = progress {
                pb.set_message(input_label(input));
            }

            report.files.push(self.process_file(input).await);

            if let Some(ref pb) = progress {
                pb.inc(1);
            }
        }

        if let Some(pb) = progress {
            pb.finish_with_message("done");
        }

        report
    }

    /// Summarize one file and persist the result.
    pub async fn process_file(&self, input: &Path) -> FileReport {
        let mut stage = Stage::Loaded;

        let outcome = match self.try_process(input, &mut stage).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Failed to process {}: {:#}", input.display(), e);
                FileOutcome::Failed {
                    error: format!("{:#}", e),
                }
            }
        };

        FileReport {
            input: input.to_path_buf(),
            stage,
            outcome,
        }
    }

    async fn try_process(&self, input: &Path, stage: &mut Stage) -> Result<FileOutcome> {
        let mut document = load_document(input)?;
        debug!(file = %input.display(), stage = %Stage::Loaded, "Document loaded");

        let fallback_name = display_name_from_stem(file_stem(input)?);
        let summary_input = SummaryInput::classify(&document, &fallback_name);
        *stage = Stage::Validated;

        let (summary, pending) = match summary_input.prompt(&self.config.templates) {
            Ok(prompt) => {
                *stage = Stage::Prompted;
                info!("Summarizing {}...", input_label(input));

                let generated = self
                    .generator
                    .generate(&prompt, self.config.max_tokens)
                    .await;
                *stage = Stage::Summarized;

                match generated {
                    Ok(text) => (Some(text), Pending::Generated(None)),
                    Err(e) => {
                        warn!("Summary generation failed for {}: {}", input_label(input), e);
                        (
                            Some(SUMMARY_FAILURE_SENTINEL.to_string()),
                            Pending::Generated(Some(e.to_string())),
                        )
                    }
                }
            }
            Err(reason) => {
                warn!(
                    "Skipping summarization of {}: {}; persisting it unchanged",
                    input_label(input),
                    reason
                );
                (None, Pending::PassThrough(reason.to_string()))
            }
        };

        if let (Some(summary), Some(field)) = (summary, summary_input.target_field()) {
            document.insert(field.to_string(), Value::String(summary));
        }
        document.insert(
            TIMESTAMP_FIELD.to_string(),
            Value::String(Local::now().format(TIMESTAMP_FORMAT).to_string()),
        );

        let output_dir = OutputDir::acquire(&self.config.output_dir)?;
        let output = output_dir.write_json(&summary_file_name(input)?, &document)?;
        *stage = Stage::Persisted;
        info!("Saved (or overwrote) {}", output.display());

        Ok(match pending {
            Pending::Generated(None) => FileOutcome::Summarized { output },
            Pending::Generated(Some(error)) => FileOutcome::ServiceFailed { output, error },
            Pending::PassThrough(reason) => FileOutcome::PassedThrough { output, reason },
        })
    }
}

/// How the summary step ended, before the write.
enum Pending {
    Generated(Option<String>),
    PassThrough(String),
}

/// Read a document and require a top-level JSON object.
fn load_document(input: &Path) -> Result<Map<String, Value>> {
    let content = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;

    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("Could not decode JSON from {}", input.display()))?;

    match value {
        Value::Object(map) => Ok(map),
        other => anyhow::bail!(
            "Expected a JSON object in {}, found {}",
            input.display(),
            json_kind(&other)
        ),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn input_label(input: &Path) -> String {
    input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| input.display().to_string())
}
