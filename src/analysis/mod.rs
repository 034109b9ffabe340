//! Analysis Layer
//!
//! Turns recognized words into validated item text.

pub mod text;

pub use text::{KeywordFilter, TextResolver};
