use std::fmt;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tb_core::{truncate_chars, Error, LanguageModel, Result};
use tracing::{debug, warn};
use url::Url;

use crate::Config;

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
    output: Option<String>,
    text: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
    text: Option<String>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Text of the first candidate, trying the known response layouts in turn.
    fn text(self) -> Option<String> {
        let candidate = self.candidates.into_iter().next()?;
        let from_content = candidate.content.and_then(|content| {
            content
                .parts
                .into_iter()
                .next()
                .and_then(|part| part.text)
                .or(content.text)
        });
        from_content
            .or(candidate.output)
            .or(candidate.text)
            .filter(|text| !text.trim().is_empty())
    }
}

pub struct GeminiModel {
    client: Client,
    config: Config,
    api_key: String,
}

impl GeminiModel {
    pub fn new(config: Config) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| Error::Inference("Gemini API key is required".to_string()))?;
        match Url::parse(&config.base_url) {
            Ok(base) if matches!(base.scheme(), "http" | "https") => {}
            _ => return Err(Error::InvalidUrl(config.base_url.clone())),
        }
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config, api_key })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model_name
        )
    }

    fn request<'a>(&self, prompt: &'a str) -> GenerateRequest<'a> {
        GenerateRequest {
            contents: vec![Content { parts: vec![Part { text: prompt }] }],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                top_k: self.config.top_k,
                top_p: self.config.top_p,
                max_output_tokens: self.config.max_output_tokens,
            },
        }
    }

    fn is_retryable(status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl fmt::Debug for GeminiModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiModel")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("model_name", &self.config.model_name)
            .field("base_url", &self.config.base_url)
            .finish()
    }
}

#[async_trait]
impl LanguageModel for GeminiModel {
    fn name(&self) -> &str {
        "Gemini"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = self.request(prompt);
        let mut retried = false;

        loop {
            let response = self
                .client
                .post(self.endpoint())
                .query(&[("key", self.api_key.as_str())])
                .json(&request)
                .send()
                .await?;

            let status = response.status();
            if status.is_success() {
                let body: GenerateResponse = response.json().await?;
                let text = body
                    .text()
                    .ok_or_else(|| Error::Inference("Gemini returned no candidate text".to_string()))?;
                debug!("Gemini returned {} characters", text.chars().count());
                return Ok(text);
            }

            if Self::is_retryable(status) && !retried {
                warn!("⚠️ Gemini answered {}, retrying in {:?}", status, self.config.retry_delay);
                retried = true;
                tokio::time::sleep(self.config.retry_delay).await;
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            return Err(Error::Inference(format!(
                "Gemini API error {}: {}",
                status,
                truncate_chars(body.trim(), 300)
            )));
        }
    }
}
