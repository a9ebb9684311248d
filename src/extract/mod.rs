//! Rich-text to plain-text extraction
//!
//! Ticket descriptions are structured document trees. This module converts
//! them into a linear text blob suitable for indexing:
//! - [`DocumentNode`]: tolerant model of the tree, built from ADF JSON
//! - [`extract`]: recursive flattener, one stack frame per nesting level
//! - [`blob_or_fallback`]: trims the result and substitutes a fallback when empty

mod flatten;
mod node;

pub use flatten::extract;
pub use node::{parse_content, DocumentNode};

use serde_json::Value;

/// Extracts the indexable text of an ADF value, falling back to `fallback`
///
/// The fallback (usually the ticket summary) is used when the description is
/// missing or flattens to whitespace only.
pub fn blob_or_fallback(description: &Value, fallback: &str) -> String {
    let text = extract(&parse_content(description));
    let trimmed = text.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}
