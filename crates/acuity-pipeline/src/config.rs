//! Environment-driven pipeline configuration.

use std::path::PathBuf;

/// Knobs the pipeline core consumes. Loaded from the environment with
/// defaults; the CLI may override individual fields from flags.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub notes_dir: PathBuf,
    pub hcc_csv_path: PathBuf,
    pub output_dir: PathBuf,
    pub max_workers: usize,
    pub enable_fuzzy_match: bool,
    pub fuzzy_match_threshold: f64,
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        Self {
            notes_dir: PathBuf::from(env_or("ACUITY_NOTES_DIR", "progress_notes")),
            hcc_csv_path: PathBuf::from(env_or("ACUITY_HCC_CSV", "HCC_relevant_codes.csv")),
            output_dir: PathBuf::from(env_or("ACUITY_OUTPUT_DIR", "output")),
            max_workers: env_or("ACUITY_MAX_WORKERS", "1").parse().unwrap_or(1),
            enable_fuzzy_match: parse_bool(&env_or("ACUITY_ENABLE_FUZZY_MATCH", "true")),
            fuzzy_match_threshold: env_or("ACUITY_FUZZY_MATCH_THRESHOLD", "0.92")
                .parse()
                .unwrap_or(0.92),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// 1/true/yes/y/on (any case) mean true.
pub fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}
