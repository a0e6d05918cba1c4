use serde::{Deserialize, Serialize};

use crate::models::hcc_match::HccMatch;

/// Extractor-reported certainty in an extracted condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// Lenient parse; anything outside the three known levels is dropped.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }

    /// Merge priority: high > medium > low.
    pub fn priority(self) -> u8 {
        match self {
            Self::High => 3,
            Self::Medium => 2,
            Self::Low => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// The matching strategy that produced a condition's HCC classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    Code,
    DescriptionExact,
    DescriptionPartial,
    DescriptionFuzzy,
    CodePrefixFuzzy,
}

impl MatchMethod {
    /// Merge priority: code > description_exact > description_partial >
    /// either fuzzy method.
    pub fn priority(self) -> u8 {
        match self {
            Self::Code => 3,
            Self::DescriptionExact => 2,
            Self::DescriptionPartial => 1,
            Self::DescriptionFuzzy | Self::CodePrefixFuzzy => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::DescriptionExact => "description_exact",
            Self::DescriptionPartial => "description_partial",
            Self::DescriptionFuzzy => "description_fuzzy",
            Self::CodePrefixFuzzy => "code_prefix_fuzzy",
        }
    }
}

/// One extracted (and possibly evaluated) diagnosis candidate.
///
/// Every optional field serializes as `null` when absent; consumers of the
/// note result rely on a fixed shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub condition: String,
    pub icd10_code: Option<String>,
    pub icd10_description: Option<String>,
    pub clinical_status: Option<String>,
    pub severity: Option<String>,
    pub confidence: Option<Confidence>,
    pub hcc_relevant: Option<bool>,
    pub hcc_match: Option<HccMatch>,
    pub match_method: Option<MatchMethod>,
}

impl Condition {
    /// A condition with only a display name set.
    pub fn named(condition: impl Into<String>) -> Self {
        Self {
            condition: condition.into(),
            ..Self::default()
        }
    }
}
