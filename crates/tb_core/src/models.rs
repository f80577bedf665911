use std::fmt;

use async_trait::async_trait;

use crate::Result;

#[async_trait]
pub trait LanguageModel: Send + Sync + fmt::Debug {
    /// Returns the display name of the model backend
    fn name(&self) -> &str;

    /// Sends a single prompt and returns the raw text the model produced
    async fn generate(&self, prompt: &str) -> Result<String>;
}
