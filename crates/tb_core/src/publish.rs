use std::fmt;

use async_trait::async_trait;

use crate::types::ReportBundle;
use crate::Result;

/// What a delivery channel did with a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Delivered(String),
    Skipped(String),
}

impl fmt::Display for PublishOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishOutcome::Delivered(detail) => write!(f, "delivered ({})", detail),
            PublishOutcome::Skipped(reason) => write!(f, "skipped ({})", reason),
        }
    }
}

#[async_trait]
pub trait Publisher: Send + Sync {
    /// Returns the channel name used in logs
    fn name(&self) -> &str;

    /// Delivers the report; missing credentials are a `Skipped` outcome, not an error
    async fn publish(&self, bundle: &ReportBundle) -> Result<PublishOutcome>;
}
