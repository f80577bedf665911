use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tb_core::{Error, ItemType, PublishOutcome, Publisher, ReportBundle, Result, SummaryItem};
use tracing::info;

use crate::section_style;

const STARTTLS_PORT: u16 = 587;

#[derive(Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub recipient: Option<String>,
    pub topic: String,
    pub timeout: Duration,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 465,
            username: None,
            password: None,
            recipient: None,
            topic: "6G".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("username", &self.username)
            .field("password", &self.password.as_deref().map(|_| "<redacted>"))
            .field("recipient", &self.recipient)
            .finish()
    }
}

impl EmailConfig {
    /// `(user, password, recipient)` when all three are set.
    fn credentials(&self) -> Option<(&str, &str, &str)> {
        Some((
            non_blank(&self.username)?,
            non_blank(&self.password)?,
            non_blank(&self.recipient)?,
        ))
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

pub fn subject(topic: &str, date: &str) -> String {
    format!("{} Technology Intelligence Report - {}", topic, date)
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn render_card(item: &SummaryItem) -> String {
    let style = section_style(item.item_type);
    let url = escape_html(&item.url);
    format!(
        r#"<table width="100%" cellpadding="0" cellspacing="0" style="background: #ffffff; border-radius: 12px; margin-bottom: 20px; border: 2px solid #e5e7eb; border-left: 5px solid {primary};">
<tr><td style="padding: 24px;">
<div style="display: inline-block; padding: 6px 14px; border-radius: 20px; font-size: 12px; font-weight: 600; margin-bottom: 12px; background: {background}; color: {primary};">{icon} {label}</div>
<h2 style="margin: 0 0 16px 0; font-size: 20px; color: #1f2937; line-height: 1.4;"><a href="{url}" target="_blank" style="color: #1f2937; text-decoration: none;">{title}</a></h2>
<div style="color: #4b5563; font-size: 15px; line-height: 1.7; padding: 16px; background: #f9fafb; border-radius: 8px; border-left: 3px solid {primary};">{summary}</div>
<div style="background: {background}; border-radius: 8px; padding: 16px; margin-top: 16px; border-left: 3px solid {primary};">
<div style="font-weight: 700; color: {primary}; font-size: 14px; margin-bottom: 8px;">💡 Engineer's Insight</div>
<div style="color: #374151; font-size: 14px; line-height: 1.6;">{message}</div>
</div>
<div style="margin-top: 16px;"><a href="{url}" target="_blank" style="display: inline-block; padding: 10px 20px; background: {primary}; color: #ffffff; text-decoration: none; border-radius: 8px; font-size: 14px; font-weight: 600;">Read Full Article →</a></div>
</td></tr>
</table>
"#,
        primary = style.primary,
        background = style.background,
        icon = style.icon,
        label = style.label,
        url = url,
        title = escape_html(&item.title),
        summary = escape_html(&item.summary),
        message = escape_html(&item.message),
    )
}

pub fn render_html(bundle: &ReportBundle, topic: &str) -> String {
    let topic = escape_html(topic);
    let mut html = format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="UTF-8"><meta name="viewport" content="width=device-width, initial-scale=1.0"></head>
<body style="margin: 0; padding: 20px; font-family: -apple-system, 'Segoe UI', Roboto, Arial, sans-serif; background: #eef2ff;">
<table width="100%" cellpadding="0" cellspacing="0" style="max-width: 800px; margin: 0 auto; background: #ffffff; border-radius: 16px;">
<tr><td style="background: #1e3a8a; color: #ffffff; padding: 40px 30px; text-align: center;">
<h1 style="margin: 0 0 8px 0; font-size: 32px;">🔬 {topic} Technology Intelligence</h1>
<p style="margin: 0; font-size: 16px;">Research Report for Engineers</p>
<div style="margin-top: 16px; font-size: 14px;">📅 {date}</div>
</td></tr>
<tr><td style="padding: 30px; border-bottom: 1px solid #e5e7eb;">
<table width="100%" cellpadding="0" cellspacing="0"><tr>
"#,
        topic = topic,
        date = escape_html(&bundle.generated_at),
    );

    for item_type in ItemType::ALL {
        let style = section_style(item_type);
        html.push_str(&format!(
            r#"<td style="text-align: center; padding: 0 20px;"><div style="font-size: 36px; font-weight: 700; color: #4f46e5;">{}</div><div style="font-size: 13px; color: #6b7280; margin-top: 4px;">{} {}</div></td>
"#,
            bundle.count(item_type),
            style.icon,
            style.heading
        ));
    }
    html.push_str("</tr></table>\n</td></tr>\n<tr><td style=\"padding: 30px; background: #f9fafb;\">\n");

    for (item_type, items) in bundle.grouped() {
        let style = section_style(item_type);
        html.push_str(&format!(
            r#"<div style="margin: 40px 0 24px 0; padding-bottom: 12px; border-bottom: 3px solid #e5e7eb;"><span style="font-size: 28px;">{}</span> <span style="font-size: 22px; font-weight: 700; color: #1f2937;">{}</span> <span style="background: #f3f4f6; color: #6b7280; padding: 4px 12px; border-radius: 12px; font-size: 13px;">{} items</span></div>
"#,
            style.icon,
            style.heading,
            items.len()
        ));
        for item in items {
            html.push_str(&render_card(item));
        }
    }

    html.push_str(&format!(
        r#"</td></tr>
<tr><td style="background: #f9fafb; padding: 30px; text-align: center; border-top: 1px solid #e5e7eb;">
<p style="color: #6b7280; font-size: 13px; margin: 0;">🔬 {} Intelligence System</p>
</td></tr>
</table>
</body>
</html>
"#,
        topic
    ));
    html
}

/// Plain-text part of the email.
pub fn render_text(bundle: &ReportBundle, topic: &str) -> String {
    let mut text = format!("{} Technology Intelligence Report\n{}\n", topic, bundle.generated_at);
    for (item_type, items) in bundle.grouped() {
        text.push_str(&format!("\n== {} ({}) ==\n", section_style(item_type).heading, items.len()));
        for (i, item) in items.iter().enumerate() {
            text.push_str(&format!(
                "\n{}. {}\n{}\nInsight: {}\n{}\n",
                i + 1,
                item.title,
                item.summary,
                item.message,
                item.url
            ));
        }
    }
    text
}

/// Sends the report as an HTML + text email over SMTP.
#[derive(Debug, Clone)]
pub struct EmailPublisher {
    config: EmailConfig,
}

impl EmailPublisher {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn build_message(&self, bundle: &ReportBundle, from: &str, to: &str) -> Result<Message> {
        let from: Mailbox = from
            .parse()
            .map_err(|e| Error::Publish(format!("invalid sender address '{}': {}", from, e)))?;
        let to: Mailbox = to
            .parse()
            .map_err(|e| Error::Publish(format!("invalid recipient address '{}': {}", to, e)))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(subject(&self.config.topic, &bundle.generated_at))
            .multipart(MultiPart::alternative_plain_html(
                render_text(bundle, &self.config.topic),
                render_html(bundle, &self.config.topic),
            ))
            .map_err(|e| Error::Publish(format!("email build failed: {}", e)))
    }

    fn transport(&self, user: &str, password: &str) -> Result<SmtpTransport> {
        let host = self.config.smtp_host.as_str();
        let builder = if self.config.smtp_port == STARTTLS_PORT {
            SmtpTransport::starttls_relay(host)
        } else {
            SmtpTransport::relay(host)
        }
        .map_err(|e| Error::Publish(format!("smtp relay init failed for '{}': {}", host, e)))?;

        Ok(builder
            .port(self.config.smtp_port)
            .credentials(Credentials::new(user.to_string(), password.to_string()))
            .timeout(Some(self.config.timeout))
            .build())
    }
}

#[async_trait]
impl Publisher for EmailPublisher {
    fn name(&self) -> &str {
        "email"
    }

    async fn publish(&self, bundle: &ReportBundle) -> Result<PublishOutcome> {
        let Some((user, password, recipient)) = self.config.credentials() else {
            return Ok(PublishOutcome::Skipped(
                "GMAIL_USER, GMAIL_APP_PASSWORD or RECIPIENT_EMAIL not set".to_string(),
            ));
        };

        let message = self.build_message(bundle, user, recipient)?;
        let transport = self.transport(user, password)?;

        info!("📧 Sending report to {}", recipient);
        tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|e| Error::Publish(format!("smtp task failed: {}", e)))?
            .map_err(|e| Error::Publish(format!("smtp send failed: {}", e)))?;

        Ok(PublishOutcome::Delivered(recipient.to_string()))
    }
}
