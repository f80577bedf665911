use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tb_core::{truncate_chars, Error, ItemType, PublishOutcome, Publisher, ReportBundle, Result, SummaryItem};
use tracing::info;
use url::Url;

use crate::section_style;

pub const MESSAGE_BUDGET: usize = 3500;
pub const TRUNCATION_NOTE: &str = "\n\n_(truncated, full report in email)_";
const NEWS_SHOWN: usize = 3;
const RULE: &str = "━━━━━━━━━━━━━━━━━━━━";

#[derive(Clone)]
pub struct ChatConfig {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub topic: String,
    pub api_base: String,
    pub timeout: Duration,
    pub budget: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            chat_id: None,
            topic: "6G".to_string(),
            api_base: "https://api.telegram.org".to_string(),
            timeout: Duration::from_secs(10),
            budget: MESSAGE_BUDGET,
        }
    }
}

impl fmt::Debug for ChatConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatConfig")
            .field("bot_token", &self.bot_token.as_deref().map(|_| "<redacted>"))
            .field("chat_id", &self.chat_id)
            .field("api_base", &self.api_base)
            .field("budget", &self.budget)
            .finish()
    }
}

/// Escapes the characters legacy Telegram Markdown treats as markup.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '[' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn clip(text: &str, max_chars: usize) -> String {
    escape_markdown(truncate_chars(text.replace('\n', " ").trim(), max_chars))
}

fn render_detailed(item_type: ItemType, items: &[&SummaryItem], link_text: &str) -> String {
    let style = section_style(item_type);
    let mut out = format!("{} *{}*\n\n", style.icon, style.heading.to_uppercase());
    for (i, item) in items.iter().enumerate() {
        out.push_str(&format!("*{}. {}*\n\n", i + 1, clip(&item.title, 80)));
        out.push_str(&format!("📝 {}...\n\n", clip(&item.summary, 120)));
        out.push_str(&format!("💡 _{}_\n\n", clip(&item.message, 100)));
        if !item.url.is_empty() {
            out.push_str(&format!("🔗 [{}]({})\n\n", link_text, item.url));
        }
        out.push_str("─────────────\n\n");
    }
    out
}

/// Full chat message, before the length budget is applied.
pub fn render_message(bundle: &ReportBundle, topic: &str) -> String {
    let mut out = format!(
        "🔬 *{} Technology Intelligence Report*\n📅 _{}_\n\n",
        escape_markdown(topic),
        bundle.generated_at
    );
    out.push_str("📊 *Quick Summary*\n");
    out.push_str(&format!("├─ 📚 Journals: {}\n", bundle.count(ItemType::Journal)));
    out.push_str(&format!("├─ 📄 Papers: {}\n", bundle.count(ItemType::Paper)));
    out.push_str(&format!("└─ 📰 News: {}\n\n", bundle.count(ItemType::News)));
    out.push_str(RULE);
    out.push_str("\n\n");

    for (item_type, items) in bundle.grouped() {
        match item_type {
            ItemType::Journal => out.push_str(&render_detailed(item_type, &items, "Read Full Article")),
            ItemType::Paper => out.push_str(&render_detailed(item_type, &items, "Read Paper")),
            ItemType::News => {
                out.push_str("📰 *INDUSTRY NEWS*\n\n");
                for (i, item) in items.iter().take(NEWS_SHOWN).enumerate() {
                    out.push_str(&format!("*{}. {}*\n", i + 1, clip(&item.title, 70)));
                    if !item.url.is_empty() {
                        out.push_str(&format!("🔗 [Read More]({})\n", item.url));
                    }
                    out.push('\n');
                }
                if items.len() > NEWS_SHOWN {
                    out.push_str(&format!("_... and {} more news items_\n\n", items.len() - NEWS_SHOWN));
                }
            }
        }
    }

    out.push_str(RULE);
    out.push_str(&format!(
        "\n\n🤖 _Automated report for {} engineers_\n📧 _Full details in your email_",
        escape_markdown(topic)
    ));
    out
}

/// Cuts `message` so that it plus [`TRUNCATION_NOTE`] fits in `budget` characters.
///
/// The cut lands on a paragraph break when one exists in the second half of the
/// kept text, so Markdown entities are not split. A budget too small for the note
/// gets a plain cut.
pub fn fit_to_budget(message: &str, budget: usize) -> String {
    if message.chars().count() <= budget {
        return message.to_string();
    }
    let note_chars = TRUNCATION_NOTE.chars().count();
    if budget <= note_chars {
        return truncate_chars(message, budget).to_string();
    }
    let keep = budget - note_chars;
    let head = truncate_chars(message, keep);
    let head = match head.rfind("\n\n") {
        Some(idx) if head[..idx].chars().count() >= keep / 2 => &head[..idx],
        _ => head,
    };
    let mut out = head.trim_end().to_string();
    out.push_str(TRUNCATION_NOTE);
    out
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
    disable_web_page_preview: bool,
}

/// Posts a condensed report through the Telegram bot API.
#[derive(Debug, Clone)]
pub struct ChatPublisher {
    client: Client,
    config: ChatConfig,
}

impl ChatPublisher {
    pub fn new(config: ChatConfig) -> Result<Self> {
        match Url::parse(&config.api_base) {
            Ok(base) if matches!(base.scheme(), "http" | "https") => {}
            _ => return Err(Error::InvalidUrl(config.api_base.clone())),
        }
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn render(&self, bundle: &ReportBundle) -> String {
        fit_to_budget(&render_message(bundle, &self.config.topic), self.config.budget)
    }
}

#[async_trait]
impl Publisher for ChatPublisher {
    fn name(&self) -> &str {
        "chat"
    }

    async fn publish(&self, bundle: &ReportBundle) -> Result<PublishOutcome> {
        let token = self.config.bot_token.as_deref().map(str::trim).unwrap_or_default();
        let chat_id = self.config.chat_id.as_deref().map(str::trim).unwrap_or_default();
        if token.is_empty() || chat_id.is_empty() {
            return Ok(PublishOutcome::Skipped("TELEGRAM_BOT_TOKEN or TELEGRAM_CHAT_ID not set".to_string()));
        }

        let text = self.render(bundle);
        let payload = SendMessage {
            chat_id,
            text: &text,
            parse_mode: "Markdown",
            disable_web_page_preview: true,
        };

        info!("📱 Sending {} character chat message", text.chars().count());
        let response = self
            .client
            .post(format!("{}/bot{}/sendMessage", self.config.api_base.trim_end_matches('/'), token))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Publish(format!(
                "chat API error {}: {}",
                status,
                truncate_chars(body.trim(), 300)
            )));
        }
        Ok(PublishOutcome::Delivered(format!("{} characters to chat {}", text.chars().count(), chat_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{bundle, summary};
    use axum::http::{StatusCode, Uri};
    use axum::{Json, Router};
    use serde_json::Value;
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};
    use tb_core::ReportOrigin;

    fn big_bundle() -> ReportBundle {
        let summaries = (0..30)
            .map(|i| {
                let item_type = ItemType::ALL[i % 3];
                SummaryItem {
                    summary: "채널 측정 결과를 요약한다. ".repeat(20),
                    message: "The insight text is long enough to be clipped. ".repeat(5),
                    ..summary(&format!("Item number {} with a long descriptive title", i), item_type)
                }
            })
            .collect();
        ReportBundle::new(summaries, ReportOrigin::Model)
    }

    #[test]
    fn test_escape_markdown() {
        assert_eq!(escape_markdown("snake_case *bold* [x] `c`"), "snake\\_case \\*bold\\* \\[x] \\`c\\`");
    }

    #[test]
    fn test_render_message_layout() {
        let message = render_message(&bundle(), "6G");
        assert!(message.starts_with("🔬 *6G Technology Intelligence Report*\n📅 _2025-11-22_\n\n"));
        assert!(message.contains("├─ 📚 Journals: 1\n├─ 📄 Papers: 1\n└─ 📰 News: 2\n"));
        assert!(message.contains("📚 *ACADEMIC JOURNALS*"));
        assert!(message.contains("🔗 [Read Paper](https://example.com/sub-thz-channel-sounding)"));
        assert!(message.contains("*2. Spectrum auction update*\n🔗 [Read More]"));
        assert!(!message.contains("more news items"));
    }

    #[test]
    fn test_news_capped_at_three() {
        let message = render_message(&big_bundle(), "6G");
        assert!(message.contains("*3. Item number 8 with a long descriptive title*"));
        assert!(!message.contains("Item number 11 with"));
        assert!(message.contains("_... and 7 more news items_"));
    }

    #[test]
    fn test_fields_clipped() {
        let message = render_message(&big_bundle(), "6G");
        let summary_line = message.lines().find(|l| l.starts_with("📝 ")).unwrap();
        // icon, space, 120 characters, ellipsis
        assert_eq!(summary_line.chars().count(), 2 + 120 + 3);
    }

    #[test]
    fn test_fit_to_budget() {
        let message = render_message(&big_bundle(), "6G");
        assert!(message.chars().count() > MESSAGE_BUDGET);

        let fitted = fit_to_budget(&message, MESSAGE_BUDGET);
        assert!(fitted.chars().count() <= MESSAGE_BUDGET);
        assert!(fitted.ends_with(TRUNCATION_NOTE));
        assert!(message.starts_with(fitted.trim_end_matches(TRUNCATION_NOTE)));

        let short = render_message(&bundle(), "6G");
        assert_eq!(fit_to_budget(&short, MESSAGE_BUDGET), short);
    }

    #[test]
    fn test_fit_to_budget_without_paragraphs() {
        let message = "x".repeat(5000);
        let fitted = fit_to_budget(&message, 100);
        assert_eq!(fitted.chars().count(), 100);
        assert!(fitted.ends_with(TRUNCATION_NOTE));
    }

    #[test]
    fn test_fit_to_budget_smaller_than_note() {
        let message = "x".repeat(200);
        for budget in [0, 10, TRUNCATION_NOTE.chars().count()] {
            let fitted = fit_to_budget(&message, budget);
            assert_eq!(fitted.chars().count(), budget);
            assert!(!fitted.contains("truncated"));
        }
    }

    #[test]
    fn test_payload_shape() {
        let payload = SendMessage {
            chat_id: "42",
            text: "hi",
            parse_mode: "Markdown",
            disable_web_page_preview: true,
        };
        let value = serde_json::to_value(payload).unwrap();
        assert_eq!(value["parse_mode"], "Markdown");
        assert_eq!(value["disable_web_page_preview"], true);
    }

    #[tokio::test]
    async fn test_publish_skips_without_credentials() {
        let publisher = ChatPublisher::new(ChatConfig::default()).unwrap();
        let outcome = publisher.publish(&bundle()).await.unwrap();
        assert!(matches!(outcome, PublishOutcome::Skipped(_)));

        let only_token = ChatConfig {
            bot_token: Some("123:abc".to_string()),
            ..ChatConfig::default()
        };
        let outcome = ChatPublisher::new(only_token).unwrap().publish(&bundle()).await.unwrap();
        assert!(matches!(outcome, PublishOutcome::Skipped(_)));
    }

    #[test]
    fn test_new_rejects_bad_api_base() {
        let config = ChatConfig {
            api_base: "api.telegram.org".to_string(),
            ..ChatConfig::default()
        };
        assert!(matches!(ChatPublisher::new(config), Err(Error::InvalidUrl(_))));
    }

    /// Local bot API answering `status` and keeping every request body it receives.
    async fn serve(status: u16, body: &'static str) -> (ChatConfig, Arc<Mutex<Vec<(String, Value)>>>) {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = requests.clone();
        let app = Router::new().fallback(move |uri: Uri, Json(payload): Json<Value>| async move {
            seen.lock().unwrap().push((uri.path().to_string(), payload));
            (StatusCode::from_u16(status).unwrap(), body)
        });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let config = ChatConfig {
            bot_token: Some("123:abc".to_string()),
            chat_id: Some("42".to_string()),
            api_base: format!("http://{}/", addr),
            ..ChatConfig::default()
        };
        (config, requests)
    }

    #[tokio::test]
    async fn test_publish_posts_message() {
        let (config, requests) = serve(200, r#"{"ok":true}"#).await;
        let publisher = ChatPublisher::new(config).unwrap();
        let outcome = publisher.publish(&bundle()).await.unwrap();
        assert!(matches!(outcome, PublishOutcome::Delivered(_)));

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let (path, payload) = &requests[0];
        assert_eq!(path, "/bot123:abc/sendMessage");
        assert_eq!(payload["chat_id"], "42");
        assert_eq!(payload["parse_mode"], "Markdown");
        assert!(payload["text"].as_str().unwrap().starts_with("🔬 *6G Technology Intelligence Report*"));
    }

    #[tokio::test]
    async fn test_publish_reports_api_error() {
        let (config, requests) = serve(400, r#"{"ok":false,"description":"Bad Request: can't parse entities"}"#).await;
        let err = ChatPublisher::new(config).unwrap().publish(&bundle()).await.unwrap_err();
        assert!(matches!(err, Error::Publish(_)));
        assert!(err.to_string().contains("400"));
        assert!(err.to_string().contains("can't parse entities"));
        assert_eq!(requests.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = ChatConfig {
            bot_token: Some("123:secret".to_string()),
            ..ChatConfig::default()
        };
        assert!(!format!("{:?}", config).contains("secret"));
    }
}
