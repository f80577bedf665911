use std::fmt;
use std::time::Duration;

pub mod models;
pub mod reconcile;
pub mod sanitize;
pub mod select;
pub mod summarize;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Settings for the generation endpoint. Without an API key every stage runs
/// its non-AI path.
#[derive(Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub model_name: String,
    pub base_url: String,
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
    pub timeout: Duration,
    pub retry_delay: Duration,
}

impl Config {
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model_name: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: 0.3,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 8192,
            timeout: Duration::from_secs(60),
            retry_delay: Duration::from_secs(2),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_deref().map(|_| "<redacted>"))
            .field("model_name", &self.model_name)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

pub mod prelude {
    pub use super::models::{create_model, GeminiModel, ScriptedModel};
    pub use super::reconcile::reconcile_urls;
    pub use super::sanitize::{parse_model_json, SanitizeError};
    pub use super::select::{ItemSelector, Selection};
    pub use super::summarize::Summarizer;
    pub use super::Config;
    pub use tb_core::{Error, LanguageModel, ReportBundle, Result, SourceItem, SummaryItem};
}

pub use models::create_model;
