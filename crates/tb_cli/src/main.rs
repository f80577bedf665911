use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand};
use tb_core::Result;
use tb_inference::DEFAULT_MODEL;
use tb_publish::render_markdown;
use tb_sources::logging::init_logging;
use tb_sources::{default_sources, handle_command, http_client, FetchManager, SourceArgs, SourceCommands};
use tracing::{error, info, Level};

mod config;
mod pipeline;

use config::AppConfig;
use pipeline::{Pipeline, RunOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HumanDuration(Duration);

impl FromStr for HumanDuration {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut total_seconds = 0u64;
        let mut current_number = String::new();
        let mut has_unit = false;

        for c in s.chars() {
            if c.is_ascii_digit() {
                current_number.push(c);
            } else if let Ok(num) = current_number.parse::<u64>() {
                match c {
                    's' => total_seconds += num,
                    'm' => total_seconds += num * 60,
                    'h' => total_seconds += num * 3600,
                    'd' => total_seconds += num * 86400,
                    _ => return Err(format!("Invalid duration unit: {}", c)),
                }
                current_number.clear();
                has_unit = true;
            } else if !c.is_whitespace() {
                return Err(format!("Invalid character in duration: {}", c));
            }
        }

        // a trailing bare number counts as seconds
        if !current_number.is_empty() {
            total_seconds += current_number
                .parse::<u64>()
                .map_err(|_| "Invalid number in duration".to_string())?;
            has_unit = true;
        }

        if !has_unit {
            return Err("Duration must include a number".to_string());
        }
        if total_seconds == 0 {
            return Err("Duration must be longer than zero".to_string());
        }

        Ok(HumanDuration(Duration::from_secs(total_seconds)))
    }
}

impl fmt::Display for HumanDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.0.as_secs();
        let (d, h, m, s) = (secs / 86400, secs % 86400 / 3600, secs % 3600 / 60, secs % 60);
        let mut out = String::new();
        for (value, unit) in [(d, 'd'), (h, 'h'), (m, 'm'), (s, 's')] {
            if value > 0 {
                out.push_str(&format!("{}{}", value, unit));
            }
        }
        write!(f, "{}", out)
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Technology intelligence briefings from papers, journals and news", long_about = None)]
pub struct Cli {
    /// Technology topic every query is built from
    #[arg(long, global = true, default_value = "6G", env = "TB_TOPIC")]
    topic: String,
    /// Directory the Markdown reports are written to
    #[arg(long, global = true, default_value = "output")]
    output_dir: PathBuf,
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    #[command(flatten)]
    credentials: Credentials,
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn log_level(&self) -> Level {
        match (self.quiet, self.verbose) {
            (true, _) => Level::WARN,
            (false, 0) => Level::INFO,
            (false, 1) => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct Credentials {
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    gemini_api_key: Option<String>,
    #[arg(long, env = "GEMINI_MODEL", default_value = DEFAULT_MODEL)]
    gemini_model: String,
    #[arg(long, env = "GMAIL_USER")]
    gmail_user: Option<String>,
    #[arg(long, env = "GMAIL_APP_PASSWORD", hide_env_values = true)]
    gmail_app_password: Option<String>,
    #[arg(long, env = "RECIPIENT_EMAIL")]
    recipient_email: Option<String>,
    #[arg(long, env = "SMTP_HOST", default_value = "smtp.gmail.com")]
    smtp_host: String,
    #[arg(long, env = "SMTP_PORT", default_value_t = 465)]
    smtp_port: u16,
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    telegram_bot_token: Option<String>,
    #[arg(long, env = "TELEGRAM_CHAT_ID")]
    telegram_chat_id: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// Fetch, summarize and deliver a report
    Run(RunArgs),
    /// List fetch adapters
    List,
    /// Run one fetch adapter and print its items
    Fetch {
        /// Adapter name as shown by `list`
        adapter: String,
        /// Search query (defaults to "<topic> technology")
        query: Option<String>,
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Run in periodic mode with the specified interval (e.g. 1h, 30m, 1d, 1h15m30s)
    #[arg(long)]
    interval: Option<HumanDuration>,
    /// Let the model pick the N most valuable items before summarizing
    #[arg(long)]
    select_top: Option<usize>,
    /// Print the Markdown report instead of delivering it
    #[arg(long)]
    dry_run: bool,
    /// Also search The Verge feed for news
    #[arg(long)]
    with_verge: bool,
    /// Language the summaries are written in
    #[arg(long, default_value = "Korean")]
    language: String,
}

async fn run_once(pipeline: &Pipeline, config: &AppConfig) -> RunOutcome {
    info!("🔬 {} technology intelligence run", config.topic);
    let outcome = pipeline.run().await;
    match &outcome.bundle {
        Some(bundle) if config.dry_run => println!("{}", render_markdown(bundle, &config.topic)),
        Some(bundle) => info!(
            "✨ Run finished: {} items fetched, {} summaries, {} channels",
            outcome.fetched,
            bundle.summaries.len(),
            outcome.deliveries.len()
        ),
        None => info!("✨ Run finished without a report"),
    }
    outcome
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // .env is optional; real environment variables win
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.log_level());

    let client = http_client()?;
    let manager = FetchManager::new(default_sources(&client));
    let names: Vec<&str> = manager.sources().iter().map(|s| s.metadata().name).collect();
    info!("🦗 Sources initialized: {}", names.join(", "));

    match cli.command.clone() {
        Commands::List => {
            handle_command(SourceArgs { command: SourceCommands::List }, &manager).await?;
        }
        Commands::Fetch { adapter, query, limit } => {
            let query = query.unwrap_or_else(|| format!("{} technology", cli.topic));
            let args = SourceArgs {
                command: SourceCommands::Fetch { source: adapter, query, limit },
            };
            handle_command(args, &manager).await?;
        }
        Commands::Run(run) => {
            let config = AppConfig::new(&cli.topic, cli.output_dir.clone(), &cli.credentials, &run);
            let pipeline = config.build_pipeline(manager)?;

            if let Some(interval) = run.interval {
                info!("⏰ Running in periodic mode every {}", interval);
                loop {
                    let outcome = run_once(&pipeline, &config).await;
                    for delivery in outcome.deliveries.iter().filter(|d| d.outcome.is_err()) {
                        error!("Delivery via {} failed this cycle", delivery.channel);
                    }
                    info!("⏳ Waiting {} before the next run", interval);
                    tokio::time::sleep(interval.0).await;
                }
            } else {
                run_once(&pipeline, &config).await;
            }
        }
    }

    Ok(())
}
