use std::sync::Arc;

use tb_core::{LanguageModel, Result};
use tracing::info;

use crate::Config;

pub mod gemini;
pub mod scripted;

pub use gemini::GeminiModel;
pub use scripted::{ScriptedModel, ScriptedReply};

/// Returns the configured model, or `None` when no API key is set.
pub fn create_model(config: &Config) -> Result<Option<Arc<dyn LanguageModel>>> {
    match config.api_key.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => {
            let model = GeminiModel::new(config.clone())?;
            info!("🧠 Using {} ({})", model.name(), config.model_name);
            Ok(Some(Arc::new(model)))
        }
        _ => {
            info!("🧠 No API key configured, summaries will use the non-AI fallback");
            Ok(None)
        }
    }
}
