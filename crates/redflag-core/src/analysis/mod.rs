//! The analysis pipeline's pure building blocks.
//!
//! - `classifier`: keyword/structure scoring into a `ContentCategory`
//! - `prompt`: system and user prompts per category
//! - `parser`: tolerant extraction of the model's JSON verdict
//! - `retry`: backoff wrapper distinguishing transient from permanent errors

pub mod classifier;
pub mod parser;
pub mod prompt;
pub mod retry;
