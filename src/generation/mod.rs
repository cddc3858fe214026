//! Prompt construction and context assembly for answer generation

mod prompt;

pub use prompt::{PromptBuilder, TRUNCATION_MARKER};
