use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;
use tb_core::{truncate_chars, LanguageModel, Result, SourceItem};
use tracing::{info, warn};

use crate::sanitize::parse_model_json;

#[derive(Debug, Clone)]
pub struct Selection {
    pub items: Vec<SourceItem>,
    /// False when the first `n` items were taken without asking the model.
    pub ranked: bool,
}

/// Asks the model for the most valuable items and keeps only those.
#[derive(Debug, Clone)]
pub struct ItemSelector {
    model: Option<Arc<dyn LanguageModel>>,
    topic: String,
}

impl ItemSelector {
    pub fn new(model: Option<Arc<dyn LanguageModel>>, topic: impl Into<String>) -> Self {
        Self {
            model,
            topic: topic.into(),
        }
    }

    pub fn build_prompt(&self, items: &[SourceItem], n: usize) -> String {
        let mut listing = String::new();
        for (i, item) in items.iter().enumerate() {
            let title = truncate_chars(item.title.trim(), 200).replace('\n', " ");
            let description = truncate_chars(item.description.trim(), 200).replace('\n', " ");
            listing.push_str(&format!("{}. [{}] {} - {}\n", i + 1, item.item_type, title, description));
        }
        format!(
            "You are an engineer tracking {topic} technology.\n\n\
             Candidate items:\n{listing}\n\
             Pick the {n} items most valuable to a {topic} engineer. \
             Return ONLY a JSON array of their numbers, most valuable first, e.g. [3, 1, 5]. \
             Do not add any other text.",
            topic = self.topic,
            listing = listing,
            n = n
        )
    }

    /// Keeps at most `n` items; any failure falls back to the first `n`.
    pub async fn select(&self, items: Vec<SourceItem>, n: usize) -> Selection {
        if items.len() <= n {
            return Selection { items, ranked: false };
        }
        let Some(model) = &self.model else {
            info!("🎯 No model configured, keeping the first {} of {} items", n, items.len());
            return first_n(items, n);
        };

        info!("🎯 Asking {} to pick {} of {} items", model.name(), n, items.len());
        match self.ask(model.as_ref(), &items, n).await {
            Ok(picked) if !picked.is_empty() => {
                info!("✅ Model picked {} valid items", picked.len());
                Selection {
                    items: apply_selection(items, &picked, n),
                    ranked: true,
                }
            }
            Ok(_) => {
                warn!("⚠️ Model picked no valid items, keeping the first {}", n);
                first_n(items, n)
            }
            Err(e) => {
                warn!("⚠️ Selection failed ({}), keeping the first {}", e, n);
                first_n(items, n)
            }
        }
    }

    async fn ask(&self, model: &dyn LanguageModel, items: &[SourceItem], n: usize) -> Result<Vec<usize>> {
        let raw = model.generate(&self.build_prompt(items, n)).await?;
        let value = parse_model_json(&raw)?;
        Ok(pick_indices(&value, items.len(), n))
    }
}

fn first_n(mut items: Vec<SourceItem>, n: usize) -> Selection {
    items.truncate(n);
    Selection { items, ranked: false }
}

fn as_index(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Zero-based positions from a `[..]`, `{"selected": [..]}` or `{"indices": [..]}` answer.
///
/// The model numbers items from 1; out-of-range and repeated numbers are dropped.
pub fn pick_indices(value: &Value, len: usize, n: usize) -> Vec<usize> {
    let list = match value {
        Value::Array(list) => Some(list),
        Value::Object(map) => map
            .get("selected")
            .or_else(|| map.get("indices"))
            .and_then(Value::as_array),
        _ => None,
    };

    let mut seen = HashSet::new();
    list.into_iter()
        .flatten()
        .filter_map(as_index)
        .filter(|&i| i >= 1 && i <= len)
        .map(|i| i - 1)
        .filter(|i| seen.insert(*i))
        .take(n)
        .collect()
}

/// Picked items in model order, topped up with the earliest unpicked items.
pub fn apply_selection(items: Vec<SourceItem>, picked: &[usize], n: usize) -> Vec<SourceItem> {
    let mut slots: Vec<Option<SourceItem>> = items.into_iter().map(Some).collect();
    let mut selected: Vec<SourceItem> = picked.iter().filter_map(|&i| slots.get_mut(i)?.take()).collect();
    selected.extend(slots.into_iter().flatten().take(n.saturating_sub(selected.len())));
    selected.truncate(n);
    selected
}
