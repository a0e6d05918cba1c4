//! In-memory indices over the HCC reference table.
//!
//! Four indices are built once from the reference CSV: normalized code →
//! match, normalized description → match (first writer wins), 3-/4-character
//! code prefix → matches, and description keys bucketed by first character
//! to bound fuzzy-candidate sets.

use std::collections::HashMap;
use std::path::Path;

use tracing::info;

use acuity_core::models::HccMatch;
use acuity_core::text::{normalize_description, normalize_icd10_code};

use crate::error::HccError;
use crate::score::{description_match_score, similarity};

const CODE_COLUMN: &str = "ICD-10-CM Codes";
const DESCRIPTION_COLUMN: &str = "Description";
const TAGS_COLUMN: &str = "Tags";

pub struct HccCodeLookup {
    code_map: HashMap<String, HccMatch>,
    desc_map: HashMap<String, HccMatch>,
    /// Description keys in table order, for deterministic candidate scans.
    desc_keys: Vec<String>,
    desc_keys_by_initial: HashMap<char, Vec<String>>,
    code_prefix_map: HashMap<String, Vec<HccMatch>>,
}

impl HccCodeLookup {
    /// Build all indices from reference rows. Row order is preserved in the
    /// candidate scans, so construction is deterministic.
    pub fn from_rows(rows: Vec<HccMatch>) -> Self {
        let mut code_map = HashMap::new();
        let mut desc_map: HashMap<String, HccMatch> = HashMap::new();
        let mut desc_keys = Vec::new();
        let mut desc_keys_by_initial: HashMap<char, Vec<String>> = HashMap::new();
        let mut code_prefix_map: HashMap<String, Vec<HccMatch>> = HashMap::new();

        for row in rows {
            let desc_key = normalize_description(&row.description);
            if !desc_key.is_empty() && !desc_map.contains_key(&desc_key) {
                if let Some(initial) = desc_key.chars().next() {
                    desc_keys_by_initial
                        .entry(initial)
                        .or_default()
                        .push(desc_key.clone());
                }
                desc_keys.push(desc_key.clone());
                desc_map.insert(desc_key, row.clone());
            }

            for prefix_len in [3, 4] {
                if row.code.len() >= prefix_len {
                    code_prefix_map
                        .entry(row.code[..prefix_len].to_string())
                        .or_default()
                        .push(row.clone());
                }
            }

            code_map.insert(row.code.clone(), row);
        }

        Self {
            code_map,
            desc_map,
            desc_keys,
            desc_keys_by_initial,
            code_prefix_map,
        }
    }

    /// Load the reference table from a CSV file with `ICD-10-CM Codes`,
    /// `Description`, and optional `Tags` columns. Rows with an empty code
    /// are skipped.
    pub fn from_csv_path(path: &Path) -> Result<Self, HccError> {
        if !path.exists() {
            return Err(HccError::NotFound(path.to_path_buf()));
        }

        let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
        let headers = reader.headers()?.clone();
        let code_idx = header_index(&headers, CODE_COLUMN)
            .ok_or(HccError::MissingColumn(CODE_COLUMN))?;
        let desc_idx = header_index(&headers, DESCRIPTION_COLUMN)
            .ok_or(HccError::MissingColumn(DESCRIPTION_COLUMN))?;
        let tags_idx = header_index(&headers, TAGS_COLUMN);

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let code = normalize_icd10_code(record.get(code_idx).unwrap_or(""));
            if code.is_empty() {
                continue;
            }
            let description = record.get(desc_idx).unwrap_or("").trim().to_string();
            let tags = tags_idx
                .and_then(|idx| record.get(idx))
                .map(str::trim)
                .filter(|tags| !tags.is_empty())
                .map(str::to_string);
            rows.push(HccMatch {
                code,
                description,
                tags,
            });
        }

        info!(path = %path.display(), rows = rows.len(), "loaded HCC reference table");
        Ok(Self::from_rows(rows))
    }

    /// Exact lookup by normalized code.
    pub fn match_by_code(&self, code: Option<&str>) -> Option<&HccMatch> {
        let key = normalize_icd10_code(code?);
        if key.is_empty() {
            return None;
        }
        self.code_map.get(&key)
    }

    /// Exact lookup by normalized description.
    pub fn match_by_description(&self, description: Option<&str>) -> Option<&HccMatch> {
        let key = normalize_description(description?);
        if key.is_empty() {
            return None;
        }
        self.desc_map.get(&key)
    }

    /// Substring match in either direction, accepted only when the candidate
    /// set resolves to exactly one distinct code. The query must carry at
    /// least two tokens.
    pub fn match_by_description_partial(&self, description: Option<&str>) -> Option<&HccMatch> {
        let key = normalize_description(description?);
        if key.is_empty() || key.split_whitespace().count() < 2 {
            return None;
        }

        // Each implicated code counts once, however many description keys
        // point at it.
        let mut candidates: HashMap<&str, &HccMatch> = HashMap::new();
        for desc_key in &self.desc_keys {
            if key.contains(desc_key.as_str()) || desc_key.contains(&key) {
                let matched = &self.desc_map[desc_key];
                candidates.insert(matched.code.as_str(), matched);
            }
        }

        if candidates.len() == 1 {
            candidates.into_values().next()
        } else {
            None
        }
    }

    /// Closest description by string similarity, restricted to keys sharing
    /// the query's first character. The winner must clear `cutoff` and lead
    /// any runner-up by at least 0.05, else the match is rejected as
    /// ambiguous. Queries shorter than 6 characters or 2 tokens are skipped.
    pub fn match_by_description_fuzzy(
        &self,
        description: Option<&str>,
        cutoff: f64,
    ) -> Option<&HccMatch> {
        let key = normalize_description(description?);
        if key.len() < 6 || key.split_whitespace().count() < 2 {
            return None;
        }

        let candidates = key
            .chars()
            .next()
            .and_then(|initial| self.desc_keys_by_initial.get(&initial))
            .unwrap_or(&self.desc_keys);

        let mut top: Option<(f64, &str)> = None;
        let mut second: Option<(f64, &str)> = None;
        for candidate in candidates {
            let score = similarity(&key, candidate);
            if score < cutoff {
                continue;
            }
            match top {
                Some((best, _)) if score <= best => {
                    if second.is_none_or(|(s, _)| score > s) {
                        second = Some((score, candidate.as_str()));
                    }
                }
                _ => {
                    second = top;
                    top = Some((score, candidate.as_str()));
                }
            }
        }

        let (top_score, top_key) = top?;
        match second {
            None => self.desc_map.get(top_key),
            Some((second_score, _)) if top_score - second_score >= 0.05 => {
                self.desc_map.get(top_key)
            }
            Some(_) => None,
        }
    }

    /// Best composite-scored candidate among matches sharing the code's
    /// 4-character (tried first) or 3-character prefix.
    pub fn match_by_code_prefix_and_description(
        &self,
        code: Option<&str>,
        description: Option<&str>,
        min_overlap: f64,
        min_similarity: f64,
    ) -> Option<&HccMatch> {
        let code_key = normalize_icd10_code(code?);
        let desc_key = normalize_description(description?);
        if code_key.len() < 3 || desc_key.is_empty() {
            return None;
        }

        let mut prefixes = Vec::new();
        if code_key.len() >= 4 {
            prefixes.push(&code_key[..4]);
        }
        prefixes.push(&code_key[..3]);

        let mut best_match: Option<&HccMatch> = None;
        let mut best_score = 0.0f64;
        let mut seen_codes: std::collections::HashSet<&str> = std::collections::HashSet::new();

        for prefix in prefixes {
            let Some(matches) = self.code_prefix_map.get(prefix) else {
                continue;
            };
            for candidate in matches {
                if !seen_codes.insert(candidate.code.as_str()) {
                    continue;
                }
                let candidate_key = normalize_description(&candidate.description);
                let Some(score) =
                    description_match_score(&desc_key, &candidate_key, min_overlap, min_similarity)
                else {
                    continue;
                };
                if score > best_score {
                    best_score = score;
                    best_match = Some(candidate);
                }
            }
        }

        best_match
    }
}

fn header_index(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|header| header.trim() == name)
}
