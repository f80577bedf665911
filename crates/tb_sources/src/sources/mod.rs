use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Selector};
use tb_core::{Error, ItemType, Result, SourceItem};

pub mod arxiv;
pub mod google_news;
pub mod ieee;
pub mod scholar;
pub mod verge;

pub use arxiv::ArxivSource;
pub use google_news::GoogleNewsSource;
pub use ieee::IeeeSource;
pub use scholar::ScholarSource;
pub use verge::VergeSource;

pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
pub const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceMetadata {
    pub name: &'static str,
    pub cli_name: &'static str,
    pub emoji: &'static str,
    pub item_type: ItemType,
}

#[async_trait]
pub trait Source: Send + Sync {
    /// Returns the display name, CLI name and item type of this adapter
    fn metadata(&self) -> SourceMetadata;

    /// Runs one search and returns at most `max_results` normalized items
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SourceItem>>;
}

/// Client shared by every adapter: fixed timeout and a browser-like User-Agent.
pub fn http_client() -> Result<Client> {
    Client::builder()
        .timeout(FETCH_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .map_err(Error::from)
}

/// Every adapter this crate ships, in the order `list` prints them.
pub fn default_sources(client: &Client) -> Vec<Box<dyn Source>> {
    vec![
        Box::new(ArxivSource::new(client.clone())),
        Box::new(ScholarSource::new(client.clone())),
        Box::new(IeeeSource::new(client.clone())),
        Box::new(GoogleNewsSource::new(client.clone())),
        Box::new(VergeSource::new(client.clone())),
    ]
}

/// Common utilities for adapters
pub(crate) mod utils {
    use super::*;

    pub fn selector(css: &str) -> Result<Selector> {
        Selector::parse(css).map_err(|e| Error::Parse(format!("Invalid selector {}: {}", css, e)))
    }

    pub fn element_text(el: &ElementRef<'_>) -> String {
        crate::urls::collapse_whitespace(&el.text().collect::<String>())
    }

    pub fn first_text(el: &ElementRef<'_>, selector: &Selector) -> Option<String> {
        el.select(selector)
            .next()
            .map(|e| element_text(&e))
            .filter(|t| !t.is_empty())
    }

    pub async fn get_text(client: &Client, url: &str, query: &[(&str, String)]) -> Result<String> {
        let response = client.get(url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Fetch(format!("{} returned HTTP {}", url, status)));
        }
        Ok(response.text().await?)
    }

    pub async fn get_bytes(client: &Client, url: &str, query: &[(&str, String)]) -> Result<Vec<u8>> {
        let response = client.get(url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Fetch(format!("{} returned HTTP {}", url, status)));
        }
        Ok(response.bytes().await?.to_vec())
    }

    /// Picks the article link of a feed entry: `alternate`/unlabelled first, then any link, then an http id.
    pub fn entry_link(entry: &feed_rs::model::Entry) -> String {
        for link in &entry.links {
            let href = link.href.trim();
            if href.is_empty() {
                continue;
            }
            let rel = link.rel.as_deref().unwrap_or("");
            if rel.is_empty() || rel.eq_ignore_ascii_case("alternate") {
                return href.to_string();
            }
        }
        if let Some(link) = entry.links.iter().find(|l| !l.href.trim().is_empty()) {
            return link.href.trim().to_string();
        }
        let id = entry.id.trim();
        if id.starts_with("http://") || id.starts_with("https://") {
            return id.to_string();
        }
        String::new()
    }

    pub fn entry_title(entry: &feed_rs::model::Entry) -> String {
        entry
            .title
            .as_ref()
            .map(|t| crate::urls::strip_html(&t.content))
            .unwrap_or_default()
    }

    /// Summary text, or the body of `<content>` when there is no summary.
    pub fn entry_description(entry: &feed_rs::model::Entry) -> String {
        if let Some(summary) = entry.summary.as_ref().filter(|s| !s.content.trim().is_empty()) {
            return crate::urls::strip_html(&summary.content);
        }
        entry
            .content
            .as_ref()
            .and_then(|c| c.body.as_deref())
            .map(crate::urls::strip_html)
            .unwrap_or_default()
    }

    pub fn parse_feed(body: &[u8]) -> Result<feed_rs::model::Feed> {
        feed_rs::parser::parse(body).map_err(|e| Error::Parse(format!("Failed to parse feed: {}", e)))
    }
}
