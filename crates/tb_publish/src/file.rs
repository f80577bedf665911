use std::path::PathBuf;

use async_trait::async_trait;
use tb_core::{PublishOutcome, Publisher, ReportBundle, ReportOrigin, Result};
use tracing::info;

use crate::section_style;

#[derive(Debug, Clone)]
pub struct FileConfig {
    pub output_dir: PathBuf,
    pub topic: String,
}

impl FileConfig {
    pub fn new(output_dir: impl Into<PathBuf>, topic: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            topic: topic.into(),
        }
    }

    /// Lowercase topic with every run of other characters collapsed to `_`.
    pub fn slug(&self) -> String {
        let mut slug = String::new();
        for c in self.topic.trim().chars() {
            if c.is_alphanumeric() {
                slug.extend(c.to_lowercase());
            } else if !slug.ends_with('_') {
                slug.push('_');
            }
        }
        let slug = slug.trim_matches('_');
        if slug.is_empty() {
            "tech".to_string()
        } else {
            slug.to_string()
        }
    }

    pub fn report_path(&self, generated_at: &str) -> PathBuf {
        self.output_dir.join(format!("{}_report_{}.md", self.slug(), generated_at))
    }
}

pub fn render_markdown(bundle: &ReportBundle, topic: &str) -> String {
    let origin = match bundle.origin {
        ReportOrigin::Model => "AI summaries",
        ReportOrigin::Fallback => "source descriptions (no AI)",
    };
    let mut out = format!(
        "# {} Technology Intelligence Report\n\n**Generated**: {}\n**Summaries**: {}\n\n---\n\n",
        topic, bundle.generated_at, origin
    );

    for (item_type, items) in bundle.grouped() {
        let style = section_style(item_type);
        out.push_str(&format!("## {} {}\n\n", style.icon, style.heading));
        for (i, item) in items.iter().enumerate() {
            out.push_str(&format!("### {}. {}\n\n", i + 1, item.title));
            out.push_str(&format!("**Summary**:\n{}\n\n", item.summary));
            out.push_str(&format!("**Takeaway**:\n{}\n\n", item.message));
            out.push_str(&format!("**Source**: {}\n\n", item.url));
            out.push_str("---\n\n");
        }
    }
    out
}

/// Writes the report as Markdown under the output directory.
#[derive(Debug, Clone)]
pub struct FilePublisher {
    config: FileConfig,
}

impl FilePublisher {
    pub fn new(config: FileConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Publisher for FilePublisher {
    fn name(&self) -> &str {
        "file"
    }

    async fn publish(&self, bundle: &ReportBundle) -> Result<PublishOutcome> {
        let path = self.config.report_path(&bundle.generated_at);
        tokio::fs::create_dir_all(&self.config.output_dir).await?;
        tokio::fs::write(&path, render_markdown(bundle, &self.config.topic)).await?;
        info!("💾 Report saved to {}", path.display());
        Ok(PublishOutcome::Delivered(path.display().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::bundle;

    #[test]
    fn test_slug_and_path() {
        assert_eq!(FileConfig::new("output", "6G").slug(), "6g");
        assert_eq!(FileConfig::new("output", " Wi-Fi 7 / UWB ").slug(), "wi_fi_7_uwb");
        assert_eq!(FileConfig::new("output", "???").slug(), "tech");
        assert_eq!(
            FileConfig::new("output", "6G").report_path("2025-11-22"),
            PathBuf::from("output/6g_report_2025-11-22.md")
        );
    }

    #[test]
    fn test_render_groups_in_display_order() {
        let markdown = render_markdown(&bundle(), "6G");
        assert!(markdown.starts_with("# 6G Technology Intelligence Report\n\n**Generated**: 2025-11-22\n"));
        assert!(markdown.contains("**Summaries**: AI summaries"));

        let journals = markdown.find("## 📚 Academic Journals").unwrap();
        let papers = markdown.find("## 📄 Research Papers").unwrap();
        let news = markdown.find("## 📰 Industry News").unwrap();
        assert!(journals < papers && papers < news);

        assert!(markdown.contains("### 1. Open RAN field trial"));
        assert!(markdown.contains("### 2. Spectrum auction update"));
        assert!(markdown.contains("**Source**: https://example.com/cell-free-massive-mimo"));
    }

    #[test]
    fn test_render_skips_empty_sections() {
        let mut report = bundle();
        report.summaries.retain(|s| s.item_type == tb_core::ItemType::News);
        let markdown = render_markdown(&report, "6G");
        assert!(!markdown.contains("Academic Journals"));
        assert!(!markdown.contains("Research Papers"));
    }

    #[tokio::test]
    async fn test_publish_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().join("nested").join("output");
        let publisher = FilePublisher::new(FileConfig::new(&output_dir, "6G"));

        let outcome = publisher.publish(&bundle()).await.unwrap();
        let path = output_dir.join("6g_report_2025-11-22.md");
        assert_eq!(outcome, PublishOutcome::Delivered(path.display().to_string()));

        let written = std::fs::read_to_string(path).unwrap();
        assert!(written.contains("Cell-free massive MIMO"));
    }

    #[tokio::test]
    async fn test_publish_unwritable_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();

        let publisher = FilePublisher::new(FileConfig::new(blocker.join("output"), "6G"));
        assert!(publisher.publish(&bundle()).await.is_err());
    }
}
