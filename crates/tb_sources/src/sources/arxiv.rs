use async_trait::async_trait;
use reqwest::Client;
use tb_core::{truncate_chars, ItemType, Result, SourceItem};

use super::utils;
use super::{Source, SourceMetadata};

/// arXiv export API (Atom).
#[derive(Debug, Clone)]
pub struct ArxivSource {
    client: Client,
}

impl ArxivSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    const API_URL: &'static str = "http://export.arxiv.org/api/query";
    const DESCRIPTION_CHARS: usize = 300;

    pub fn parse_response(body: &[u8], max_results: usize) -> Result<Vec<SourceItem>> {
        let feed = utils::parse_feed(body)?;
        Ok(feed
            .entries
            .iter()
            .take(max_results)
            .filter_map(|entry| {
                let title = utils::entry_title(entry);
                if title.is_empty() {
                    return None;
                }
                let description = utils::entry_description(entry);
                let url = match entry.id.trim() {
                    id if id.starts_with("http") => id.to_string(),
                    _ => utils::entry_link(entry),
                };
                Some(SourceItem::new(
                    title,
                    truncate_chars(&description, Self::DESCRIPTION_CHARS),
                    url,
                    ItemType::Paper,
                ))
            })
            .collect())
    }
}

#[async_trait]
impl Source for ArxivSource {
    fn metadata(&self) -> SourceMetadata {
        SourceMetadata {
            name: "arXiv",
            cli_name: "arxiv",
            emoji: "📄",
            item_type: ItemType::Paper,
        }
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SourceItem>> {
        let params = [
            ("search_query", format!("all:{}", query)),
            ("start", "0".to_string()),
            ("max_results", max_results.to_string()),
            ("sortBy", "relevance".to_string()),
            ("sortOrder", "descending".to_string()),
        ];
        let body = utils::get_bytes(&self.client, Self::API_URL, &params).await?;
        Self::parse_response(&body, max_results)
    }
}
