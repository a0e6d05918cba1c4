//! acuity-hcc
//!
//! The HCC reference table and the match cascade that classifies extracted
//! conditions against it. The lookup is built once per process and is
//! read-only afterwards, so it can be shared freely across concurrent
//! note-processing tasks.

pub mod error;
pub mod evaluate;
pub mod lookup;
pub mod score;

pub use error::HccError;
pub use evaluate::HccEvaluator;
pub use lookup::HccCodeLookup;
