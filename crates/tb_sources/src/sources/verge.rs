use async_trait::async_trait;
use reqwest::Client;
use tb_core::{ItemType, Result, SourceItem};
use tracing::debug;

use super::utils;
use super::{Source, SourceMetadata};
use crate::urls::{is_homepage_url, validate_and_clean_url};

/// The Verge front-page Atom feed, filtered locally since it has no search endpoint.
#[derive(Debug, Clone)]
pub struct VergeSource {
    client: Client,
}

impl VergeSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    const FEED_URL: &'static str = "https://www.theverge.com/rss/index.xml";

    fn matches_query(text: &str, query: &str) -> bool {
        let text = text.to_lowercase();
        query
            .to_lowercase()
            .split_whitespace()
            .any(|word| text.contains(word))
    }

    pub fn parse_response(body: &[u8], query: &str, max_results: usize) -> Result<Vec<SourceItem>> {
        let feed = utils::parse_feed(body)?;
        Ok(feed
            .entries
            .iter()
            .filter_map(|entry| {
                let title = utils::entry_title(entry);
                let description = utils::entry_description(entry);
                if !Self::matches_query(&format!("{} {}", title, description), query) {
                    return None;
                }
                let url = validate_and_clean_url(&utils::entry_link(entry));
                if is_homepage_url(&url) {
                    debug!("Verge entry '{}' links to a front page: {}", title, url);
                }
                Some(SourceItem::new(title, description, url, ItemType::News))
            })
            .take(max_results)
            .collect())
    }
}

#[async_trait]
impl Source for VergeSource {
    fn metadata(&self) -> SourceMetadata {
        SourceMetadata {
            name: "The Verge",
            cli_name: "verge",
            emoji: "📡",
            item_type: ItemType::News,
        }
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SourceItem>> {
        let body = utils::get_bytes(&self.client, Self::FEED_URL, &[]).await?;
        Self::parse_response(&body, query, max_results)
    }
}
