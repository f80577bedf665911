pub mod error;
pub mod models;
pub mod publish;
pub mod types;

pub use error::{Error, Result};
pub use models::LanguageModel;
pub use publish::{PublishOutcome, Publisher};
pub use types::{today, ItemType, ReportBundle, ReportOrigin, SourceItem, SummaryItem};

/// Cuts `text` to at most `max_chars` characters without splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
