use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tb_core::{
    today, truncate_chars, Error, ItemType, LanguageModel, ReportBundle, ReportOrigin, Result, SourceItem,
    SummaryItem,
};
use tracing::{info, warn};

use crate::reconcile::reconcile_urls;
use crate::sanitize::parse_model_json;

const PROMPT_TITLE_CHARS: usize = 200;
const PROMPT_DESCRIPTION_CHARS: usize = 300;
const FALLBACK_SUMMARY_CHARS: usize = 300;
const NO_DESCRIPTION: &str = "No description available; check the source for details.";

#[derive(Deserialize)]
struct SummaryEnvelope {
    #[serde(default)]
    summaries: Vec<SummaryItem>,
}

fn prompt_field(text: &str, max_chars: usize) -> String {
    truncate_chars(text.replace('\n', " ").trim(), max_chars).to_string()
}

/// Parses the model's answer: the `{"summaries": [...]}` object or a bare array.
pub fn parse_summaries(raw: &str) -> Result<Vec<SummaryItem>> {
    let value = parse_model_json(raw)?;
    let summaries = match value {
        Value::Array(_) => serde_json::from_value::<Vec<SummaryItem>>(value)?,
        Value::Object(_) => serde_json::from_value::<SummaryEnvelope>(value)?.summaries,
        other => return Err(Error::Parse(format!("expected summaries, got {}", other))),
    };
    if summaries.is_empty() {
        return Err(Error::Parse("model returned no summaries".to_string()));
    }
    Ok(summaries)
}

pub struct Summarizer {
    model: Option<Arc<dyn LanguageModel>>,
    topic: String,
    language: String,
}

impl Summarizer {
    pub fn new(model: Option<Arc<dyn LanguageModel>>, topic: impl Into<String>) -> Self {
        Self {
            model,
            topic: topic.into(),
            language: "Korean".to_string(),
        }
    }

    /// Language the model writes summaries in.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn build_prompt(&self, items: &[SourceItem]) -> String {
        let mut listing = String::new();
        for (i, item) in items.iter().enumerate() {
            listing.push_str(&format!(
                "\n{}. [{}] {}\nDescription: {}\nLink: {}\n",
                i + 1,
                item.item_type,
                prompt_field(&item.title, PROMPT_TITLE_CHARS),
                prompt_field(&item.description, PROMPT_DESCRIPTION_CHARS),
                item.url.trim()
            ));
        }

        format!(
            r#"You are an engineer researching {topic} technology.

Analyze the following {topic} items (Journal, Paper, News) and summarize each one.

Items:
{listing}
Answer with JSON only, no other text, in exactly this shape:

{{
  "summaries": [
    {{
      "title": "the item title, unchanged",
      "summary": "the key content in 3-4 sentences ({language})",
      "message": "the key takeaway and practical implications for a {topic} engineer ({language})",
      "url": "the item link, unchanged",
      "type": "Journal, Paper or News"
    }}
  ],
  "generatedAt": "{date}"
}}

Focus on technical insight and practical applicability from an engineer's point of view."#,
            topic = self.topic,
            listing = listing,
            language = self.language,
            date = today()
        )
    }

    /// Deterministic non-AI summaries built from the fetched descriptions.
    pub fn fallback(&self, items: &[SourceItem]) -> ReportBundle {
        let summaries = items
            .iter()
            .map(|item| {
                let description = item.description.trim();
                let summary = if description.is_empty() {
                    NO_DESCRIPTION.to_string()
                } else {
                    truncate_chars(description, FALLBACK_SUMMARY_CHARS).to_string()
                };
                SummaryItem {
                    title: item.title.clone(),
                    summary,
                    message: fallback_message(item.item_type, &self.topic),
                    url: item.url.clone(),
                    item_type: item.item_type,
                }
            })
            .collect();
        ReportBundle::new(summaries, ReportOrigin::Fallback)
    }

    /// Summarizes `items`; falls back to [`Summarizer::fallback`] on any failure.
    pub async fn summarize(&self, items: &[SourceItem]) -> ReportBundle {
        let Some(model) = &self.model else {
            info!("📝 No model configured, building summaries without AI");
            return self.fallback(items);
        };

        info!("🧠 Summarizing {} items with {}", items.len(), model.name());
        match self.ask(model.as_ref(), items).await {
            Ok(mut summaries) => {
                let fixed = reconcile_urls(&mut summaries, items);
                info!("✅ {} summaries ({} urls restored from sources)", summaries.len(), fixed);
                ReportBundle::new(summaries, ReportOrigin::Model)
            }
            Err(e) => {
                warn!("❌ Summarization failed ({}), building summaries without AI", e);
                self.fallback(items)
            }
        }
    }

    async fn ask(&self, model: &dyn LanguageModel, items: &[SourceItem]) -> Result<Vec<SummaryItem>> {
        let raw = model.generate(&self.build_prompt(items)).await?;
        parse_summaries(&raw)
    }
}

fn fallback_message(item_type: ItemType, topic: &str) -> String {
    match item_type {
        ItemType::Journal => format!("A journal article covering recent {} research.", topic),
        ItemType::Paper => format!("A research paper on the latest {} techniques.", topic),
        ItemType::News => format!("Industry news tracking {} developments.", topic),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScriptedModel;

    fn sample_items() -> Vec<SourceItem> {
        vec![
            SourceItem::new(
                "SKT, AI 인프라 로드맵 발표",
                "SK텔레콤이 AI 인프라 로드맵을 발표했다.",
                "https://news.example.com/articles/123",
                ItemType::News,
            ),
            SourceItem::new(
                "Terahertz channel models for 6G",
                "We measure\nsub-THz channels.",
                "http://arxiv.org/abs/2401.00001v1",
                ItemType::Paper,
            ),
        ]
    }

    #[test]
    fn test_prompt_lists_items() {
        let prompt = Summarizer::new(None, "6G").build_prompt(&sample_items());
        assert!(prompt.contains("\n1. [News] SKT, AI 인프라 로드맵 발표\nDescription: SK텔레콤이"));
        assert!(prompt.contains("2. [Paper] Terahertz channel models for 6G\nDescription: We measure sub-THz channels."));
        assert!(prompt.contains("Link: http://arxiv.org/abs/2401.00001v1"));
        assert!(prompt.contains("(Korean)"));
    }

    #[test]
    fn test_prompt_truncates_long_fields() {
        let long = SourceItem::new("t".repeat(500), "d".repeat(900), "https://e.com/x", ItemType::News);
        let prompt = Summarizer::new(None, "6G").build_prompt(&[long]);
        assert!(prompt.contains(&format!("[News] {}\n", "t".repeat(200))));
        assert!(prompt.contains(&format!("Description: {}\n", "d".repeat(300))));
    }

    #[test]
    fn test_fallback_never_fails() {
        let mut items = sample_items();
        items.push(SourceItem::new("Empty", "   ", "https://e.com/empty", ItemType::Journal));
        items.push(SourceItem::new("Long", "x".repeat(1000), "https://e.com/long", ItemType::Journal));

        let bundle = Summarizer::new(None, "6G").fallback(&items);
        assert_eq!(bundle.origin, ReportOrigin::Fallback);
        assert_eq!(bundle.summaries.len(), 4);
        assert_eq!(bundle.summaries[0].summary, "SK텔레콤이 AI 인프라 로드맵을 발표했다.");
        assert_eq!(bundle.summaries[0].url, "https://news.example.com/articles/123");
        assert_eq!(bundle.summaries[2].summary, NO_DESCRIPTION);
        assert_eq!(bundle.summaries[3].summary.chars().count(), 300);
        assert!(bundle.summaries[3].message.contains("journal"));
        assert!(bundle.summaries[0].message.contains("6G"));
    }

    #[test]
    fn test_parse_summaries_shapes() {
        let object = r#"{"summaries": [{"title": "A", "summary": "s", "type": "paper"}], "generatedAt": "2025-01-01"}"#;
        let parsed = parse_summaries(object).unwrap();
        assert_eq!(parsed[0].item_type, ItemType::Paper);
        assert_eq!(parsed[0].message, "");

        let array = r#"[{"title": "B", "url": "https://e.com"}]"#;
        assert_eq!(parse_summaries(array).unwrap()[0].title, "B");

        assert!(parse_summaries(r#"{"summaries": []}"#).is_err());
        assert!(parse_summaries("42").is_err());
        assert!(parse_summaries("no json").is_err());
    }

    #[tokio::test]
    async fn test_summarize_with_model_reconciles_urls() {
        let answer = r#"```json
{
  "summaries": [
    {"title": "SKT, AI 인프라 로드맵 발표", "summary": "SKT\'s roadmap", "message": "m", "url": "https://www.sktelecom.com", "type": "News"},
    {"title": "Terahertz channel models for 6G", "summary": "s", "message": "m", "url": "https://arxiv.org", "type": "Paper"}
  ],
  "generatedAt": "2025-11-22"
}
```"#;
        let model = Arc::new(ScriptedModel::replying(&[answer]));
        let bundle = Summarizer::new(Some(model), "6G").summarize(&sample_items()).await;

        assert_eq!(bundle.origin, ReportOrigin::Model);
        assert_eq!(bundle.summaries[0].url, "https://news.example.com/articles/123");
        assert_eq!(bundle.summaries[0].summary, "SKT's roadmap");
        assert_eq!(bundle.summaries[1].url, "http://arxiv.org/abs/2401.00001v1");
    }

    #[tokio::test]
    async fn test_summarize_falls_back() {
        let model = Arc::new(ScriptedModel::replying(&["Sorry, I cannot help with that."]));
        let bundle = Summarizer::new(Some(model), "6G").summarize(&sample_items()).await;
        assert_eq!(bundle.origin, ReportOrigin::Fallback);
        assert_eq!(bundle.summaries.len(), 2);

        let model = Arc::new(ScriptedModel::failing("Gemini API error 400"));
        let bundle = Summarizer::new(Some(model), "6G").summarize(&sample_items()).await;
        assert_eq!(bundle.origin, ReportOrigin::Fallback);
    }
}
