pub mod condition;
pub mod hcc_match;
pub mod note_result;

pub use condition::{Condition, Confidence, MatchMethod};
pub use hcc_match::HccMatch;
pub use note_result::NoteResult;
