use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use tb_core::{ItemType, Result, SourceItem};
use tracing::{info, warn};

use super::utils::{self, first_text, selector};
use super::{ScholarSource, Source, SourceMetadata};
use crate::urls::{unwrap_google_redirect, validate_and_clean_url};

/// IEEE Xplore articles found through a `site:ieeexplore.ieee.org` web search,
/// topped up from Google Scholar when the search comes back short.
#[derive(Debug, Clone)]
pub struct IeeeSource {
    client: Client,
    search_url: String,
    scholar: ScholarSource,
}

impl IeeeSource {
    const SEARCH_URL: &'static str = "https://www.google.com/search";

    pub fn new(client: Client) -> Self {
        let scholar = ScholarSource::new(client.clone());
        Self::with_endpoints(client, Self::SEARCH_URL, scholar)
    }

    pub fn with_endpoints(client: Client, search_url: impl Into<String>, scholar: ScholarSource) -> Self {
        Self {
            client,
            search_url: search_url.into(),
            scholar,
        }
    }
    const IEEE_HOST: &'static str = "ieeexplore.ieee.org";

    // Google reshuffles its markup; try containers from oldest to newest layout.
    const RESULT_SELECTORS: [&'static str; 4] = [
        "div.g",
        "div[data-sokoban-container]",
        "div.MjjYud",
        "div.Gx5Zad",
    ];
    const TITLE_SELECTORS: [&'static str; 3] = ["h3", "h2", "h1"];
    const SNIPPET_SELECTORS: [&'static str; 4] = ["div.VwiC3b", "span.aCOpRe", "div.IsZvec", "div.s"];

    fn compile(list: &[&str]) -> Result<Vec<Selector>> {
        list.iter().map(|css| selector(css)).collect()
    }

    pub fn parse_response(html: &str, max_results: usize) -> Result<Vec<SourceItem>> {
        let document = Html::parse_document(html);
        let titles = Self::compile(&Self::TITLE_SELECTORS)?;
        let snippets = Self::compile(&Self::SNIPPET_SELECTORS)?;
        let link_sel = selector("a")?;

        let mut results = Vec::new();
        for css in Self::RESULT_SELECTORS {
            let container = selector(css)?;
            results = document.select(&container).collect::<Vec<_>>();
            if !results.is_empty() {
                info!("  ✓ selector '{}' matched {} results", css, results.len());
                break;
            }
        }
        if results.is_empty() {
            warn!("  ⚠️ no search results found on the page");
        }

        let mut items: Vec<SourceItem> = Vec::new();
        for result in results {
            if items.len() >= max_results {
                break;
            }
            let Some(title) = titles.iter().find_map(|sel| first_text(&result, sel)) else {
                continue;
            };
            let url = result
                .select(&link_sel)
                .next()
                .and_then(|a| a.value().attr("href"))
                .map(|href| validate_and_clean_url(&unwrap_google_redirect(href)))
                .unwrap_or_default();
            if !url.contains(Self::IEEE_HOST) || items.iter().any(|i| i.url == url) {
                continue;
            }
            let description = snippets
                .iter()
                .find_map(|sel| first_text(&result, sel))
                .unwrap_or_else(|| title.clone());
            items.push(SourceItem::new(title, description, url, ItemType::Journal));
        }
        Ok(items)
    }
}

#[async_trait]
impl Source for IeeeSource {
    fn metadata(&self) -> SourceMetadata {
        SourceMetadata {
            name: "IEEE Xplore",
            cli_name: "ieee",
            emoji: "📚",
            item_type: ItemType::Journal,
        }
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SourceItem>> {
        let params = [("q", format!("site:{} {}", Self::IEEE_HOST, query))];
        let html = match utils::get_text(&self.client, &self.search_url, &params).await {
            Ok(html) => html,
            Err(e) => {
                warn!("❌ IEEE search failed ({}), falling back to Google Scholar", e);
                return self.scholar.search(&format!("{} IEEE journal", query), max_results).await;
            }
        };

        let mut items = Self::parse_response(&html, max_results)?;
        if items.len() < max_results {
            let missing = max_results - items.len();
            info!("⚠️ IEEE search short ({} results), asking Google Scholar for {} more", items.len(), missing);
            // the IEEE results stand on their own when the top-up fails
            match self.scholar.search(&format!("{} IEEE", query), missing).await {
                Ok(extra) => items.extend(extra),
                Err(e) => warn!("⚠️ Google Scholar top-up failed ({}), keeping {} IEEE results", e, items.len()),
            }
        }
        Ok(items)
    }
}
