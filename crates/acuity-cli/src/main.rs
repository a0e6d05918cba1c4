//! acuity: batch HCC extraction over a directory of clinical notes.
//!
//! Thin driver: loads configuration, builds the lookup and the chosen
//! extractor once, runs the batch, writes one JSON result per note plus a
//! summary CSV. All processing logic lives in the library crates.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use eyre::{Result, WrapErr};
use tracing::info;

use acuity_bedrock::{BedrockClient, BedrockClientConfig};
use acuity_extract::llm::{LlmConditionExtractor, LlmExtractorConfig};
use acuity_extract::rule_based::RuleBasedExtractor;
use acuity_extract::ConditionExtractor;
use acuity_hcc::{HccCodeLookup, HccEvaluator};
use acuity_pipeline::config::{parse_bool, PipelineConfig};
use acuity_pipeline::notes::iter_note_files;
use acuity_pipeline::output::{write_note_result, write_summary_csv};
use acuity_pipeline::runner::run_batch;
use acuity_pipeline::Pipeline;

#[derive(Debug, Parser)]
#[command(name = "acuity", about = "Run the HCC extraction pipeline.")]
struct Cli {
    /// Directory with progress notes.
    #[arg(long)]
    notes_dir: Option<PathBuf>,

    /// Path to the HCC reference CSV.
    #[arg(long)]
    hcc_csv: Option<PathBuf>,

    /// Output directory.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Disable model-backed extraction; use the rule-based extractor only.
    #[arg(long, default_value_t = false)]
    no_llm: bool,

    /// Limit the number of notes processed.
    #[arg(long)]
    limit: Option<usize>,

    /// Parallel workers (default from ACUITY_MAX_WORKERS, else 1).
    #[arg(long)]
    max_workers: Option<usize>,

    /// Bedrock inference profile ID (default from ACUITY_BEDROCK_MODEL_ID).
    #[arg(long)]
    model_id: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = PipelineConfig::from_env();

    let notes_dir = cli.notes_dir.unwrap_or(config.notes_dir);
    let hcc_csv = cli.hcc_csv.unwrap_or(config.hcc_csv_path);
    let output_dir = cli.output_dir.unwrap_or(config.output_dir);
    let max_workers = cli.max_workers.unwrap_or(config.max_workers).max(1);

    std::fs::create_dir_all(&output_dir)
        .wrap_err_with(|| format!("failed to create output directory {}", output_dir.display()))?;

    let lookup = Arc::new(HccCodeLookup::from_csv_path(&hcc_csv)?);
    let evaluator = HccEvaluator::new(
        Arc::clone(&lookup),
        config.enable_fuzzy_match,
        config.fuzzy_match_threshold,
    );

    let mut note_paths = iter_note_files(&notes_dir)?;
    if let Some(limit) = cli.limit {
        note_paths.truncate(limit);
    }
    info!(notes = note_paths.len(), "starting batch");

    if cli.no_llm {
        info!("using rule-based condition extraction");
        run(
            RuleBasedExtractor::new(),
            evaluator,
            note_paths,
            &output_dir,
            max_workers,
        )
        .await
    } else {
        info!("using model-backed condition extraction");
        let model_id = cli
            .model_id
            .or_else(|| std::env::var("ACUITY_BEDROCK_MODEL_ID").ok())
            .ok_or_else(|| {
                eyre::eyre!("set ACUITY_BEDROCK_MODEL_ID or pass --model-id (or use --no-llm)")
            })?;
        let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let client = BedrockClient::new(&sdk_config, BedrockClientConfig::new(model_id));
        let extractor = LlmConditionExtractor::new(
            client,
            Some(RuleBasedExtractor::new()),
            llm_extractor_config_from_env(),
        );
        run(extractor, evaluator, note_paths, &output_dir, max_workers).await
    }
}

async fn run<E>(
    extractor: E,
    evaluator: HccEvaluator,
    note_paths: Vec<PathBuf>,
    output_dir: &std::path::Path,
    max_workers: usize,
) -> Result<()>
where
    E: ConditionExtractor + 'static,
{
    let pipeline = Arc::new(Pipeline::new(extractor, evaluator));
    let results = run_batch(pipeline, note_paths, max_workers).await;

    for result in &results {
        let path = output_dir.join(format!("{}.json", result.note_id));
        write_note_result(&path, result)?;
    }
    write_summary_csv(&output_dir.join("summary.csv"), &results)?;

    info!(
        notes = results.len(),
        output_dir = %output_dir.display(),
        "processing complete"
    );
    Ok(())
}

fn llm_extractor_config_from_env() -> LlmExtractorConfig {
    let defaults = LlmExtractorConfig::default();
    LlmExtractorConfig {
        max_chars: env_parse("ACUITY_LLM_MAX_CHARS", defaults.max_chars),
        repair_enabled: std::env::var("ACUITY_LLM_ENABLE_REPAIR")
            .map(|value| parse_bool(&value))
            .unwrap_or(defaults.repair_enabled),
        repair_max_chars: env_parse("ACUITY_LLM_REPAIR_MAX_CHARS", defaults.repair_max_chars),
        debug_dir: std::env::var("ACUITY_LLM_DEBUG_DIR").ok().map(PathBuf::from),
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
