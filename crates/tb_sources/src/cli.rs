use clap::{Args, Subcommand};
use tb_core::{Error, Result};

use crate::manager::{FetchManager, FetchStep};

#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    #[command(subcommand)]
    pub command: SourceCommands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SourceCommands {
    /// List available fetch adapters
    List,
    /// Run a single adapter and print what it returns
    Fetch {
        /// Adapter name as shown by `list` (e.g. arxiv, google-news)
        source: String,
        /// Search query
        query: String,
        /// Maximum number of results
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
}

pub async fn handle_command(args: SourceArgs, manager: &FetchManager) -> Result<()> {
    match args.command {
        SourceCommands::List => {
            println!("Available sources:");
            for line in list_lines(manager) {
                println!("  {}", line);
            }
        }
        SourceCommands::Fetch { source, query, limit } => {
            if manager.get_source(&source).is_none() {
                return Err(Error::Config(format!("Unknown source: {} (try `list`)", source)));
            }
            let (items, report) = manager.run_step(&FetchStep::new(&source, query, limit), limit).await;
            if let Err(reason) = report.outcome {
                return Err(Error::Fetch(reason));
            }
            println!("Found {} items", items.len());
            for item in items {
                println!("[{}] {} - {}", item.item_type, item.title, item.url);
            }
        }
    }
    Ok(())
}

fn list_lines(manager: &FetchManager) -> Vec<String> {
    manager
        .sources()
        .iter()
        .map(|s| {
            let meta = s.metadata();
            format!("{} {:<12} {} ({})", meta.emoji, meta.cli_name, meta.name, meta.item_type)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{default_sources, http_client};

    #[test]
    fn test_list_lines() {
        let client = http_client().unwrap();
        let manager = FetchManager::new(default_sources(&client));
        let lines = list_lines(&manager);
        assert_eq!(lines.len(), 5);
        assert!(lines[0].contains("arxiv"));
        assert!(lines[0].ends_with("(Paper)"));
    }

    #[tokio::test]
    async fn test_fetch_unknown_source() {
        let manager = FetchManager::new(Vec::new());
        let args = SourceArgs {
            command: SourceCommands::Fetch { source: "nope".to_string(), query: "6G".to_string(), limit: 1 },
        };
        let err = handle_command(args, &manager).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
