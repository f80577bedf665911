//! Puts the fetched urls back onto model output.
//!
//! Models tend to return a representative url (a bare domain, a search page)
//! instead of the article link they were given. Summaries are matched back to
//! the source items by title and take the source url.

use tb_core::{SourceItem, SummaryItem};
use tracing::debug;

/// Summary titles at or below this many characters only match exactly.
pub const MIN_FUZZY_TITLE_CHARS: usize = 20;

fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}

/// Title to url lookup built from the fetched items.
#[derive(Debug, Clone, Default)]
pub struct UrlReconciler {
    // source order, first occurrence of a title only
    titles: Vec<(String, String)>,
}

impl UrlReconciler {
    pub fn new(originals: &[SourceItem]) -> Self {
        let mut titles: Vec<(String, String)> = Vec::with_capacity(originals.len());
        for item in originals {
            let key = normalize_title(&item.title);
            if key.is_empty() || titles.iter().any(|(known, _)| *known == key) {
                continue;
            }
            titles.push((key, item.url.clone()));
        }
        Self { titles }
    }

    /// Returns the source url for a summary title, if one matches reliably.
    pub fn lookup(&self, title: &str) -> Option<&str> {
        let key = normalize_title(title);
        if key.is_empty() {
            return None;
        }
        if let Some((_, url)) = self.titles.iter().find(|(known, _)| *known == key) {
            return Some(url);
        }
        if key.chars().count() <= MIN_FUZZY_TITLE_CHARS {
            return None;
        }
        self.titles
            .iter()
            .find(|(known, _)| key.contains(known.as_str()) || known.contains(key.as_str()))
            .map(|(_, url)| url.as_str())
    }

    /// Rewrites summary urls in place and returns how many changed.
    pub fn reconcile(&self, summaries: &mut [SummaryItem]) -> usize {
        let mut replaced = 0;
        for summary in summaries.iter_mut() {
            let Some(url) = self.lookup(&summary.title) else {
                continue;
            };
            if url.is_empty() || summary.url == url {
                continue;
            }
            debug!("🔗 '{}': {} -> {}", summary.title, summary.url, url);
            summary.url = url.to_string();
            replaced += 1;
        }
        replaced
    }
}

pub fn reconcile_urls(summaries: &mut [SummaryItem], originals: &[SourceItem]) -> usize {
    UrlReconciler::new(originals).reconcile(summaries)
}
