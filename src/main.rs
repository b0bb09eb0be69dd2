//! reviewdigest - per-instructor review digests
//!
//! A CLI tool that aggregates student reviews per course and asks an
//! Ollama model for a short natural-language profile of each instructor.
//!
//! Exit codes:
//!   0 - Success (per-file failures in a batch are reported, not fatal)
//!   1 - Runtime error, or the single requested instructor could not be processed
//!   2 - Batch finished with failed files and --strict was set

mod analysis;
mod cleaner;
mod cli;
mod config;
mod models;
mod pipeline;
mod scanner;
mod source;
mod storage;
mod summarizer;

use anyhow::{Context, Result};
use cli::{Args, Command, FetchArgs, Selection};
use config::{Config, CONFIG_FILE_NAME};
use models::instructor_slug;
use pipeline::PrepareMode;
use std::path::{Path, PathBuf};
use std::time::Instant;
use storage::{aggregate_file_name, raw_file_name, OutputDir};
use summarizer::{
    BatchReport, FileOutcome, OllamaGenerator, OrchestratorConfig, SummaryOrchestrator,
};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Where the effective configuration came from.
enum ConfigOrigin {
    File(PathBuf),
    Defaults,
    Unreadable(String),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle init-config early (no logging needed)
    if let Command::InitConfig = args.command {
        return handle_init_config();
    }

    let (mut config, origin) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(&args, &config);

    info!("reviewdigest v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    match origin {
        ConfigOrigin::File(path) => info!("Loaded config from {}", path.display()),
        ConfigOrigin::Defaults => debug!("No config file found, using defaults"),
        ConfigOrigin::Unreadable(reason) => warn!("Failed to load config: {}", reason),
    }

    match run(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle init-config: generate a default .reviewdigest.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize the model, data directories, and prompts.");
    Ok(())
}

/// Initialize logging based on verbosity settings. `RUST_LOG` wins if set.
fn init_logging(args: &Args, config: &Config) {
    let level = if config.general.verbose && !args.quiet {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<(Config, ConfigOrigin)> {
    // An explicit config path must load
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigOrigin::File(config_path.clone())));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, ConfigOrigin::File(PathBuf::from(CONFIG_FILE_NAME)))),
        Ok(None) => Ok((Config::default(), ConfigOrigin::Defaults)),
        Err(e) => Ok((Config::default(), ConfigOrigin::Unreadable(format!("{:#}", e)))),
    }
}

/// Dispatch the selected stage. Returns the process exit code.
async fn run(args: Args, config: Config) -> Result<i32> {
    let show_progress = !args.quiet;

    match args.command {
        Command::Fetch(ref fetch) => run_fetch(&config, fetch).await,
        Command::Prepare(ref prepare) => {
            run_prepare(&config, prepare.target.selection(), prepare_mode(prepare.legacy))
        }
        Command::Summarize(ref summarize) => {
            run_summarize(
                &config,
                summarize.target.selection(),
                summarize.strict,
                show_progress,
            )
            .await
        }
        Command::Run(ref run_args) => {
            run_pipeline(&config, run_args.legacy, run_args.strict, show_progress).await
        }
        Command::InitConfig => handle_init_config().map(|_| 0),
    }
}

/// Prepare everything, then summarize everything. A missing raw directory
/// skips the prepare stage so existing preprocessed documents still run.
async fn run_pipeline(
    config: &Config,
    legacy: bool,
    strict: bool,
    show_progress: bool,
) -> Result<i32> {
    let prepared = if config.paths.raw_dir.is_dir() {
        run_prepare(config, Selection::All, prepare_mode(legacy))?
    } else {
        warn!(
            "Raw directory not found: {}; skipping prepare",
            config.paths.raw_dir.display()
        );
        println!(
            "⚠️  Directory not found: {} (skipping prepare)",
            config.paths.raw_dir.display()
        );
        0
    };

    let summarized = run_summarize(config, Selection::All, strict, show_progress).await?;
    Ok(prepared.max(summarized))
}

fn prepare_mode(legacy: bool) -> PrepareMode {
    if legacy {
        PrepareMode::Legacy
    } else {
        PrepareMode::Aggregate
    }
}

/// Fetch raw records for the requested instructors.
async fn run_fetch(config: &Config, fetch: &FetchArgs) -> Result<i32> {
    let names = match fetch.names {
        Some(ref csv_path) => source::load_name_queue(csv_path)?,
        None => fetch.professors.clone(),
    };

    let review_source =
        source::HttpReviewSource::new(&config.source.url_template, config.source.timeout_seconds)?;
    let raw_dir = OutputDir::acquire(&config.paths.raw_dir)?;

    println!("📥 Fetching reviews for {} instructor(s)...", names.len());
    let report = source::fetch_all(&review_source, &names, &raw_dir).await;

    println!("\n📊 Fetch Summary:");
    println!("   Fetched: {}", report.fetched.len());
    for (name, reason) in &report.failed {
        println!("   ❌ {}: {}", name, reason);
    }

    if names.len() == 1 && !report.failed.is_empty() {
        return Ok(1);
    }
    Ok(0)
}

/// Build preprocessed documents from raw records.
fn run_prepare(config: &Config, selection: Selection, mode: PrepareMode) -> Result<i32> {
    let output = OutputDir::acquire(&config.paths.preprocessed_dir)?;

    match selection {
        Selection::Single(name) => {
            let raw_path = config.paths.raw_dir.join(raw_file_name(&name));
            if !raw_path.exists() {
                eprintln!(
                    "❌ No raw record for '{}' (expected at {})",
                    name,
                    raw_path.display()
                );
                return Ok(1);
            }

            let path = pipeline::prepare_file(&raw_path, &output, mode)?;
            println!("✅ Output saved to: {}", path.display());
            Ok(0)
        }
        Selection::All => {
            let raw_files = scanner::json_files_in(&config.paths.raw_dir)?;
            if raw_files.is_empty() {
                println!("No JSON files found in {}.", config.paths.raw_dir.display());
                return Ok(0);
            }

            println!("🔬 Preparing {} raw record(s)...", raw_files.len());
            let report = pipeline::prepare_all(&raw_files, &output, mode);

            println!("   Prepared: {}", report.written.len());
            for (path, reason) in &report.failed {
                println!("   ❌ {}: {}", path.display(), reason);
            }
            Ok(0)
        }
    }
}

/// Summarize one instructor or every preprocessed document.
async fn run_summarize(
    config: &Config,
    selection: Selection,
    strict: bool,
    show_progress: bool,
) -> Result<i32> {
    let start_time = Instant::now();
    let templates = config.prompt_templates()?;
    let generation = config.generation_config();

    println!("🤖 Initializing summarizer...");
    println!("   Model: {}", generation.model_name);
    println!("   Service: {}", generation.service_url);
    println!("   Max tokens: {}", generation.max_tokens);
    println!("   Timeout: {}s", generation.timeout_seconds);

    let orchestrator = SummaryOrchestrator::new(
        OllamaGenerator::new(generation.clone())?,
        OrchestratorConfig {
            output_dir: config.paths.summaries_dir.clone(),
            max_tokens: generation.max_tokens,
            templates,
            show_progress,
        },
    );

    match selection {
        Selection::Single(name) => {
            let input = config
                .paths
                .preprocessed_dir
                .join(aggregate_file_name(&instructor_slug(&name)));

            if !input.exists() {
                eprintln!(
                    "❌ Input file not found for professor '{}' (expected at {})",
                    name,
                    input.display()
                );
                eprintln!("   Check the name, or run `reviewdigest prepare` first.");
                return Ok(1);
            }

            println!("\n📝 Processing {}...", name);
            let report = orchestrator.process_file(&input).await;
            print_outcome(&report.outcome);

            // Only a file that was never written counts as failed.
            Ok(if report.outcome.output().is_some() { 0 } else { 1 })
        }
        Selection::All => {
            let input_dir = &config.paths.preprocessed_dir;
            if !input_dir.is_dir() {
                eprintln!("❌ Input directory not found: {}", input_dir.display());
                return Ok(1);
            }

            let inputs = scanner::json_files_in(input_dir)?;
            if inputs.is_empty() {
                println!("No JSON files found in {}.", input_dir.display());
                return Ok(0);
            }

            println!(
                "\n📝 Found {} file(s) in {}. Starting batch...\n",
                inputs.len(),
                input_dir.display()
            );
            let report = orchestrator.run_batch(&inputs).await;
            print_batch_summary(&report, start_time.elapsed().as_secs_f64());

            if strict && report.has_failures() {
                eprintln!(
                    "\n⛔ {} file(s) could not be processed. Failing (exit code 2).",
                    report.failed()
                );
                return Ok(2);
            }
            Ok(0)
        }
    }
}

fn print_outcome(outcome: &FileOutcome) {
    match outcome {
        FileOutcome::Summarized { output } => {
            println!("✅ Summary saved (or overwritten): {}", output.display())
        }
        FileOutcome::ServiceFailed { output, error } => println!(
            "⚠️  Generation failed ({}); sentinel saved to {}",
            error,
            output.display()
        ),
        FileOutcome::PassedThrough { output, reason } => {
            println!("➖ Nothing to summarize ({}); saved {}", reason, output.display())
        }
        FileOutcome::Failed { error } => println!("❌ {}", error),
    }
}

fn print_batch_summary(report: &BatchReport, duration: f64) {
    println!("\n📊 Summary:");
    println!("   Files: {}", report.files.len());
    println!("   - ✅ Summarized: {}", report.summarized());
    println!("   - ⚠️  Generation failed: {}", report.service_failed());
    println!("   - ➖ Passed through: {}", report.passed_through());
    println!("   - ❌ Failed: {}", report.failed());

    for file in &report.files {
        if let FileOutcome::Failed { ref error } = file.outcome {
            println!("     {} ({}): {}", file.input.display(), file.stage, error);
        }
    }

    println!("   Duration: {:.1}s", duration);
    println!("\n✅ Finished batch processing all files.");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    fn config_in(root: &Path) -> Config {
        let mut config = Config::default();
        config.paths.raw_dir = root.join("raw");
        config.paths.preprocessed_dir = root.join("preprocessed");
        config.paths.summaries_dir = root.join("summaries");
        config
    }

    #[tokio::test]
    async fn test_run_without_raw_dir_still_summarizes() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(temp_dir.path());

        // A blank corpus passes through without contacting the service.
        std::fs::create_dir_all(&config.paths.preprocessed_dir).unwrap();
        std::fs::write(
            config.paths.preprocessed_dir.join("Aric_Grossman_llm.json"),
            json!({"name": "Aric Grossman", "all_merged_reviews": ""}).to_string(),
        )
        .unwrap();

        let code = run_pipeline(&config, false, true, false).await.unwrap();

        assert_eq!(code, 0);
        let summary = config
            .paths
            .summaries_dir
            .join("Aric_Grossman_llm_summary.json");
        let document: Value =
            serde_json::from_str(&std::fs::read_to_string(summary).unwrap()).unwrap();
        assert!(document.get("date_summarized").is_some());
    }

    #[tokio::test]
    async fn test_run_prepares_then_summarizes() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(temp_dir.path());

        std::fs::create_dir_all(&config.paths.raw_dir).unwrap();
        std::fs::write(
            config.paths.raw_dir.join("Aric_Grossman.json"),
            json!({"name": "Aric Grossman", "courses": ["CS101"], "reviews": []}).to_string(),
        )
        .unwrap();

        let code = run_pipeline(&config, false, false, false).await.unwrap();

        assert_eq!(code, 0);
        assert!(config
            .paths
            .preprocessed_dir
            .join("Aric_Grossman_llm.json")
            .is_file());
        assert!(config
            .paths
            .summaries_dir
            .join("Aric_Grossman_llm_summary.json")
            .is_file());
    }
}
