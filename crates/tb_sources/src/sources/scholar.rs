use async_trait::async_trait;
use reqwest::Client;
use scraper::Html;
use tb_core::{ItemType, Result, SourceItem};
use tracing::warn;

use super::utils::{self, first_text, selector};
use super::{Source, SourceMetadata};
use crate::urls::validate_and_clean_url;

/// Google Scholar result page.
#[derive(Debug, Clone)]
pub struct ScholarSource {
    client: Client,
    search_url: String,
}

impl ScholarSource {
    const SEARCH_URL: &'static str = "https://scholar.google.com/scholar";

    pub fn new(client: Client) -> Self {
        Self::with_search_url(client, Self::SEARCH_URL)
    }

    pub fn with_search_url(client: Client, search_url: impl Into<String>) -> Self {
        Self {
            client,
            search_url: search_url.into(),
        }
    }

    pub fn looks_like_captcha(html: &str) -> bool {
        let lower = html.to_lowercase();
        lower.contains("unusual traffic") || lower.contains("captcha")
    }

    pub fn parse_response(html: &str, max_results: usize) -> Result<Vec<SourceItem>> {
        if Self::looks_like_captcha(html) {
            warn!("⚠️ Google Scholar served a CAPTCHA page, results may be limited");
        }

        let document = Html::parse_document(html);
        let result_sel = selector("div.gs_ri")?;
        let title_sel = selector("h3.gs_rt")?;
        let link_sel = selector("h3.gs_rt a")?;
        let snippet_sel = selector("div.gs_rs")?;

        let mut items = Vec::new();
        for result in document.select(&result_sel) {
            if items.len() >= max_results {
                break;
            }
            let Some(title) = first_text(&result, &title_sel) else {
                continue;
            };
            let url = result
                .select(&link_sel)
                .next()
                .and_then(|a| a.value().attr("href"))
                .map(validate_and_clean_url)
                .unwrap_or_default();
            let description = first_text(&result, &snippet_sel).unwrap_or_else(|| title.clone());
            items.push(SourceItem::new(title, description, url, ItemType::Journal));
        }
        Ok(items)
    }
}

#[async_trait]
impl Source for ScholarSource {
    fn metadata(&self) -> SourceMetadata {
        SourceMetadata {
            name: "Google Scholar",
            cli_name: "scholar",
            emoji: "📚",
            item_type: ItemType::Journal,
        }
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SourceItem>> {
        let params = [("q", query.to_string()), ("hl", "en".to_string())];
        let html = utils::get_text(&self.client, &self.search_url, &params).await?;
        Self::parse_response(&html, max_results)
    }
}
