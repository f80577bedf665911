use std::collections::{HashMap, HashSet};
use std::fmt;

use tb_core::{ItemType, SourceItem};
use tracing::info;

use crate::logging::Logger;
use crate::sources::Source;

type BoxedSource = Box<dyn Source>;

/// One adapter call inside a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchStep {
    pub source: String,
    pub query: String,
    pub max_results: usize,
    /// Overrides the adapter's item type (Scholar results filed as journals).
    pub retype: Option<ItemType>,
}

impl FetchStep {
    pub fn new(source: &str, query: impl Into<String>, max_results: usize) -> Self {
        Self {
            source: source.to_string(),
            query: query.into(),
            max_results,
            retype: None,
        }
    }

    pub fn retyped(mut self, item_type: ItemType) -> Self {
        self.retype = Some(item_type);
        self
    }
}

/// Steps that fill one section of the report, capped at `cap` items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchGroup {
    pub name: String,
    pub cap: usize,
    pub steps: Vec<FetchStep>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPlan {
    pub groups: Vec<FetchGroup>,
}

impl FetchPlan {
    /// Five papers, five journals and five news items about `topic`.
    pub fn for_topic(topic: &str, with_verge: bool) -> Self {
        let mut news_steps = vec![FetchStep::new("google-news", format!("{} technology", topic), 5)];
        if with_verge {
            news_steps.push(FetchStep::new("verge", format!("{} wireless", topic), 5));
        }
        let news_cap = news_steps.iter().map(|s| s.max_results).sum();

        Self {
            groups: vec![
                FetchGroup {
                    name: "Research Papers".to_string(),
                    cap: 5,
                    steps: vec![
                        FetchStep::new("arxiv", format!("{} wireless", topic), 3),
                        FetchStep::new("scholar", format!("{} technology", topic), 2).retyped(ItemType::Paper),
                    ],
                },
                FetchGroup {
                    name: "Academic Journals".to_string(),
                    cap: 5,
                    steps: vec![
                        FetchStep::new("ieee", format!("{} wireless communications", topic), 3),
                        FetchStep::new("scholar", format!("{} network architecture journal", topic), 5)
                            .retyped(ItemType::Journal),
                    ],
                },
                FetchGroup {
                    name: "Industry News".to_string(),
                    cap: news_cap,
                    steps: news_steps,
                },
            ],
        }
    }
}

/// Outcome of one adapter call; failures carry the reason instead of an error value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchReport {
    pub source: String,
    pub requested: usize,
    pub outcome: Result<usize, String>,
}

impl fmt::Display for FetchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            Ok(count) => write!(f, "{}: {}/{} items", self.source, count, self.requested),
            Err(reason) => write!(f, "{}: failed ({})", self.source, reason),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FetchResult {
    pub items: Vec<SourceItem>,
    pub reports: Vec<FetchReport>,
}

impl FetchResult {
    pub fn tally(&self) -> HashMap<ItemType, usize> {
        let mut counts = HashMap::new();
        for item in &self.items {
            *counts.entry(item.item_type).or_insert(0) += 1;
        }
        counts
    }
}

pub struct FetchManager {
    sources: Vec<BoxedSource>,
}

impl FetchManager {
    pub fn new(sources: Vec<BoxedSource>) -> Self {
        Self { sources }
    }

    pub fn sources(&self) -> &[BoxedSource] {
        &self.sources
    }

    pub fn get_source(&self, cli_name: &str) -> Option<&dyn Source> {
        self.sources
            .iter()
            .find(|s| s.metadata().cli_name.eq_ignore_ascii_case(cli_name))
            .map(|s| s.as_ref())
    }

    /// Runs one adapter call. Never fails: an error becomes an empty result plus a report.
    pub async fn run_step(&self, step: &FetchStep, max_results: usize) -> (Vec<SourceItem>, FetchReport) {
        let logger = Logger::new().with_prefix(step.source.clone());
        let mut report = FetchReport {
            source: step.source.clone(),
            requested: max_results,
            outcome: Ok(0),
        };

        let Some(source) = self.get_source(&step.source) else {
            logger.error("no adapter registered under this name");
            report.outcome = Err("no adapter registered".to_string());
            return (Vec::new(), report);
        };

        let meta = source.metadata();
        logger.info(&format!("{} searching {} for '{}' ({} max)", meta.emoji, meta.name, step.query, max_results));
        match source.search(&step.query, max_results).await {
            Ok(mut items) => {
                items.truncate(max_results);
                if let Some(item_type) = step.retype {
                    logger.debug(&format!("retyping {} items as {}", items.len(), item_type.as_str()));
                    items.iter_mut().for_each(|i| i.item_type = item_type);
                }
                if items.is_empty() {
                    logger.warn("⚠️ no items returned");
                } else {
                    logger.info(&format!("✅ {} items", items.len()));
                }
                report.outcome = Ok(items.len());
                (items, report)
            }
            Err(e) => {
                logger.error(&format!("❌ search failed: {}", e));
                report.outcome = Err(e.to_string());
                (Vec::new(), report)
            }
        }
    }

    /// Executes the plan group by group, in order.
    pub async fn fetch_all(&self, plan: &FetchPlan) -> FetchResult {
        let mut result = FetchResult::default();

        for group in &plan.groups {
            info!("🦗 Collecting {}", group.name);
            let mut collected: Vec<SourceItem> = Vec::new();
            let mut seen_urls = HashSet::new();

            for step in &group.steps {
                let remaining = group.cap.saturating_sub(collected.len());
                let wanted = step.max_results.min(remaining);
                if wanted == 0 {
                    break;
                }
                let (items, report) = self.run_step(step, wanted).await;
                result.reports.push(report);
                for item in items {
                    if !item.url.is_empty() && !seen_urls.insert(item.url.clone()) {
                        continue;
                    }
                    collected.push(item);
                }
            }

            collected.truncate(group.cap);
            info!("  {} {}", collected.len(), group.name);
            result.items.extend(collected);
        }

        let tally = result.tally();
        info!(
            "✅ Collected {} items (journals: {}, papers: {}, news: {})",
            result.items.len(),
            tally.get(&ItemType::Journal).unwrap_or(&0),
            tally.get(&ItemType::Paper).unwrap_or(&0),
            tally.get(&ItemType::News).unwrap_or(&0),
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::SourceMetadata;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use tb_core::{Error, Result};

    /// Canned adapter that records the limits it was asked for.
    struct FakeSource {
        cli_name: &'static str,
        item_type: ItemType,
        available: usize,
        fail: bool,
        calls: Arc<Mutex<Vec<(String, usize)>>>,
    }

    impl FakeSource {
        fn boxed(cli_name: &'static str, item_type: ItemType, available: usize) -> (Box<dyn Source>, Arc<Mutex<Vec<(String, usize)>>>) {
            let calls = Arc::new(Mutex::new(Vec::new()));
            let source = FakeSource { cli_name, item_type, available, fail: false, calls: calls.clone() };
            (Box::new(source), calls)
        }
    }

    #[async_trait]
    impl Source for FakeSource {
        fn metadata(&self) -> SourceMetadata {
            SourceMetadata { name: self.cli_name, cli_name: self.cli_name, emoji: "🧪", item_type: self.item_type }
        }

        async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SourceItem>> {
            self.calls.lock().unwrap().push((query.to_string(), max_results));
            if self.fail {
                return Err(Error::Fetch("connection reset".to_string()));
            }
            Ok((0..self.available.min(max_results))
                .map(|i| {
                    SourceItem::new(
                        format!("{} {} result {}", self.cli_name, query, i),
                        "desc",
                        format!("https://{}.example.com/{}/{}", self.cli_name, query.replace(' ', "-"), i),
                        self.item_type,
                    )
                })
                .collect())
        }
    }

    #[test]
    fn test_plan_for_topic() {
        let plan = FetchPlan::for_topic("6G", false);
        assert_eq!(plan.groups.len(), 3);
        assert_eq!(plan.groups[0].steps[0], FetchStep::new("arxiv", "6G wireless", 3));
        assert_eq!(plan.groups[1].steps[1].retype, Some(ItemType::Journal));
        assert_eq!(plan.groups[2].cap, 5);

        let plan = FetchPlan::for_topic("6G", true);
        assert_eq!(plan.groups[2].steps.len(), 2);
        assert_eq!(plan.groups[2].cap, 10);
    }

    #[tokio::test]
    async fn test_fetch_all_fills_groups() {
        let (arxiv, _) = FakeSource::boxed("arxiv", ItemType::Paper, 3);
        let (scholar, scholar_calls) = FakeSource::boxed("scholar", ItemType::Journal, 10);
        let (ieee, _) = FakeSource::boxed("ieee", ItemType::Journal, 1);
        let (news, _) = FakeSource::boxed("google-news", ItemType::News, 5);
        let manager = FetchManager::new(vec![arxiv, scholar, ieee, news]);

        let result = manager.fetch_all(&FetchPlan::for_topic("6G", false)).await;
        let tally = result.tally();
        assert_eq!(result.items.len(), 15);
        assert_eq!(tally[&ItemType::Paper], 5);
        assert_eq!(tally[&ItemType::Journal], 5);
        assert_eq!(tally[&ItemType::News], 5);

        // papers: 2 from scholar; journals: ieee gave 1, scholar asked for the other 4
        let calls = scholar_calls.lock().unwrap();
        assert_eq!(calls[0], ("6G technology".to_string(), 2));
        assert_eq!(calls[1], ("6G network architecture journal".to_string(), 4));
        assert!(result.reports.iter().all(|r| r.outcome.is_ok()));
    }

    #[tokio::test]
    async fn test_failures_become_reports() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let failing = FakeSource { cli_name: "arxiv", item_type: ItemType::Paper, available: 3, fail: true, calls };
        let manager = FetchManager::new(vec![Box::new(failing)]);

        let plan = FetchPlan::for_topic("6G", false);
        let result = manager.fetch_all(&plan).await;
        assert!(result.items.is_empty());
        assert_eq!(result.reports[0].outcome, Err("Fetch error: connection reset".to_string()));
        // every other adapter is missing
        assert!(result.reports[1..].iter().all(|r| r.outcome == Err("no adapter registered".to_string())));
        assert!(result.reports[0].to_string().contains("failed"));
    }

    #[tokio::test]
    async fn test_skips_step_when_group_full() {
        let (ieee, _) = FakeSource::boxed("ieee", ItemType::Journal, 5);
        let (scholar, scholar_calls) = FakeSource::boxed("scholar", ItemType::Journal, 5);
        let manager = FetchManager::new(vec![ieee, scholar]);
        let plan = FetchPlan {
            groups: vec![FetchGroup {
                name: "Journals".to_string(),
                cap: 3,
                steps: vec![FetchStep::new("ieee", "6G", 3), FetchStep::new("scholar", "6G", 5)],
            }],
        };
        let result = manager.fetch_all(&plan).await;
        assert_eq!(result.items.len(), 3);
        assert!(scholar_calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_get_source_case_insensitive() {
        let (arxiv, _) = FakeSource::boxed("arxiv", ItemType::Paper, 1);
        let manager = FetchManager::new(vec![arxiv]);
        assert!(manager.get_source("ArXiv").is_some());
        assert!(manager.get_source("ieee").is_none());
    }
}
