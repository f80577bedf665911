use std::fmt;

use chrono::Local;
use serde::{Deserialize, Deserializer, Serialize};

/// Kind of publication a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
pub enum ItemType {
    Journal,
    Paper,
    #[default]
    News,
}

impl ItemType {
    /// Display order used by every rendered report.
    pub const ALL: [ItemType; 3] = [ItemType::Journal, ItemType::Paper, ItemType::News];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Journal => "Journal",
            ItemType::Paper => "Paper",
            ItemType::News => "News",
        }
    }

    /// Case-insensitive parse; anything unrecognised is treated as news.
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "journal" | "journals" => ItemType::Journal,
            "paper" | "papers" => ItemType::Paper,
            _ => ItemType::News,
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Models echo the type back in all sorts of shapes, so never fail on it.
impl<'de> Deserialize<'de> for ItemType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(value.as_str().map(ItemType::parse_lenient).unwrap_or_default())
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}

/// A normalized search result from one of the fetch adapters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceItem {
    pub title: String,
    pub description: String,
    pub url: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
}

impl SourceItem {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        url: impl Into<String>,
        item_type: ItemType,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            url: url.into(),
            item_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SummaryItem {
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub summary: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub message: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub url: String,
    #[serde(rename = "type", default)]
    pub item_type: ItemType,
}

/// Whether a bundle's summaries came from the model or from the template fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ReportOrigin {
    Model,
    #[default]
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportBundle {
    pub summaries: Vec<SummaryItem>,
    #[serde(rename = "generatedAt")]
    pub generated_at: String,
    #[serde(default)]
    pub origin: ReportOrigin,
}

impl ReportBundle {
    pub fn new(summaries: Vec<SummaryItem>, origin: ReportOrigin) -> Self {
        Self {
            summaries,
            generated_at: today(),
            origin,
        }
    }

    /// Non-empty groups in `ItemType::ALL` order, input order kept inside a group.
    pub fn grouped(&self) -> Vec<(ItemType, Vec<&SummaryItem>)> {
        ItemType::ALL
            .iter()
            .map(|t| (*t, self.summaries.iter().filter(|s| s.item_type == *t).collect::<Vec<_>>()))
            .filter(|(_, items)| !items.is_empty())
            .collect()
    }

    pub fn count(&self, item_type: ItemType) -> usize {
        self.summaries.iter().filter(|s| s.item_type == item_type).count()
    }
}

/// Report date in `YYYY-MM-DD`, local time.
pub fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}
