use serde::{Deserialize, Serialize};

/// One row of the HCC reference table. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HccMatch {
    /// Normalized code (uppercase alphanumeric, no dot), unique per table.
    pub code: String,
    pub description: String,
    pub tags: Option<String>,
}
