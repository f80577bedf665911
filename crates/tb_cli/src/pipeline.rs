use std::sync::Arc;

use tb_core::{LanguageModel, PublishOutcome, Publisher, ReportBundle};
use tb_inference::select::ItemSelector;
use tb_inference::summarize::Summarizer;
use tb_sources::{FetchManager, FetchPlan};
use tracing::{error, info, warn};

/// What happened on one delivery channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub channel: String,
    pub outcome: Result<PublishOutcome, String>,
}

#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    pub fetched: usize,
    /// `None` when nothing was fetched and the run stopped early.
    pub bundle: Option<ReportBundle>,
    pub deliveries: Vec<Delivery>,
}

/// fetch → select → summarize → publish, each stage degrading on its own.
pub struct Pipeline {
    manager: FetchManager,
    plan: FetchPlan,
    selector: ItemSelector,
    summarizer: Summarizer,
    select_top: Option<usize>,
    publishers: Vec<Box<dyn Publisher>>,
}

impl Pipeline {
    pub fn new(manager: FetchManager, plan: FetchPlan, model: Option<Arc<dyn LanguageModel>>, topic: &str) -> Self {
        Self {
            manager,
            plan,
            selector: ItemSelector::new(model.clone(), topic),
            summarizer: Summarizer::new(model, topic),
            select_top: None,
            publishers: Vec::new(),
        }
    }

    pub fn with_selection(mut self, select_top: Option<usize>) -> Self {
        self.select_top = select_top;
        self
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.summarizer = self.summarizer.with_language(language);
        self
    }

    pub fn add_publisher(&mut self, publisher: Box<dyn Publisher>) {
        self.publishers.push(publisher);
    }

    pub async fn run(&self) -> RunOutcome {
        info!("🦗 Collecting items");
        let fetched = self.manager.fetch_all(&self.plan).await;
        let mut outcome = RunOutcome {
            fetched: fetched.items.len(),
            ..RunOutcome::default()
        };
        if fetched.items.is_empty() {
            warn!("⚠️ Nothing collected, skipping summaries and delivery");
            return outcome;
        }

        let items = match self.select_top {
            Some(n) => self.selector.select(fetched.items, n).await.items,
            None => fetched.items,
        };

        let bundle = self.summarizer.summarize(&items).await;

        for publisher in &self.publishers {
            let result = publisher.publish(&bundle).await;
            match &result {
                Ok(PublishOutcome::Delivered(detail)) => info!("✅ {}: delivered ({})", publisher.name(), detail),
                Ok(PublishOutcome::Skipped(reason)) => warn!("⚠️ {}: skipped ({})", publisher.name(), reason),
                Err(e) => error!("❌ {}: {}", publisher.name(), e),
            }
            outcome.deliveries.push(Delivery {
                channel: publisher.name().to_string(),
                outcome: result.map_err(|e| e.to_string()),
            });
        }

        outcome.bundle = Some(bundle);
        outcome
    }
}
