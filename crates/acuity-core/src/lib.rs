//! acuity-core
//!
//! Pure domain types, ICD-10 text normalization, and the language-model
//! client capability trait. No AWS dependency; this is the shared vocabulary
//! of the acuity system.

pub mod llm;
pub mod models;
pub mod text;
