use async_trait::async_trait;
use reqwest::Client;
use tb_core::{ItemType, Result, SourceItem};
use tracing::debug;

use super::utils;
use super::{Source, SourceMetadata};
use crate::urls::{homepage_reason, validate_and_clean_url};

/// Google News search RSS.
#[derive(Debug, Clone)]
pub struct GoogleNewsSource {
    client: Client,
    language: String,
    country: String,
}

impl GoogleNewsSource {
    pub fn new(client: Client) -> Self {
        Self::with_locale(client, "ko", "KR")
    }

    pub fn with_locale(client: Client, language: &str, country: &str) -> Self {
        Self {
            client,
            language: language.to_string(),
            country: country.to_string(),
        }
    }

    const RSS_URL: &'static str = "https://news.google.com/rss/search";

    pub fn parse_response(body: &[u8], max_results: usize) -> Result<Vec<SourceItem>> {
        let feed = utils::parse_feed(body)?;
        Ok(feed
            .entries
            .iter()
            .take(max_results)
            .map(|entry| {
                let url = validate_and_clean_url(&utils::entry_link(entry));
                // Links are news.google.com redirects that resolve in a browser; flag front pages only.
                if let Some(reason) = homepage_reason(&url) {
                    debug!("Google News link looks like a homepage ({}): {}", reason, url);
                }
                SourceItem::new(
                    utils::entry_title(entry),
                    utils::entry_description(entry),
                    url,
                    ItemType::News,
                )
            })
            .collect())
    }
}

#[async_trait]
impl Source for GoogleNewsSource {
    fn metadata(&self) -> SourceMetadata {
        SourceMetadata {
            name: "Google News",
            cli_name: "google-news",
            emoji: "📰",
            item_type: ItemType::News,
        }
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SourceItem>> {
        let params = [
            ("q", query.to_string()),
            ("hl", self.language.clone()),
            ("gl", self.country.clone()),
            ("ceid", format!("{}:{}", self.country, self.language)),
        ];
        let body = utils::get_bytes(&self.client, Self::RSS_URL, &params).await?;
        Self::parse_response(&body, max_results)
    }
}
