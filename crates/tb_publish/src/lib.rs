use tb_core::ItemType;

pub mod chat;
pub mod email;
pub mod file;

pub use chat::{ChatConfig, ChatPublisher};
pub use email::{EmailConfig, EmailPublisher};
pub use file::{render_markdown, FileConfig, FilePublisher};

/// How one report section is presented on every channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionStyle {
    pub icon: &'static str,
    /// Badge text for a single item
    pub label: &'static str,
    pub heading: &'static str,
    pub primary: &'static str,
    pub background: &'static str,
}

pub fn section_style(item_type: ItemType) -> SectionStyle {
    match item_type {
        ItemType::Journal => SectionStyle {
            icon: "📚",
            label: "Academic Journal",
            heading: "Academic Journals",
            primary: "#3b82f6",
            background: "#eff6ff",
        },
        ItemType::Paper => SectionStyle {
            icon: "📄",
            label: "Research Paper",
            heading: "Research Papers",
            primary: "#10b981",
            background: "#f0fdf4",
        },
        ItemType::News => SectionStyle {
            icon: "📰",
            label: "Industry News",
            heading: "Industry News",
            primary: "#f59e0b",
            background: "#fffbeb",
        },
    }
}

pub mod prelude {
    pub use super::{ChatPublisher, EmailPublisher, FilePublisher};
    pub use super::{ChatConfig, EmailConfig, FileConfig};
    pub use tb_core::{PublishOutcome, Publisher, ReportBundle};
}
