use anyhow::Context;
use chrono::Local;
use clap::{ArgAction, Args, Parser, Subcommand};
use comedy_scraper::app::ports::{BrowserLauncher, DiagnosticHook, NoDiagnostics};
use comedy_scraper::config::Config;
use comedy_scraper::infra::browser::{HeadlessChromeLauncher, ScreenshotDiagnostics};
use comedy_scraper::infra::files::run_stamp;
use comedy_scraper::infra::llm_client::ChatCompletionsExtractor;
use comedy_scraper::logging::init_logging;
use comedy_scraper::metrics::init_metrics;
use comedy_scraper::phases::{
    run_details_phase, run_links_phase, run_merge, DetailsRequest, MergeRequest,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "comedy_scraper")]
#[command(about = "Collects comedy event links and extracts event details")]
#[command(version)]
struct Cli {
    /// TOML configuration file (defaults to ./config.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Phase 1: crawl search result pages and save event links
    Links(LinksArgs),
    /// Phase 2: visit saved links and extract complete event records
    Details(DetailsArgs),
    /// Combine detail CSV files into one
    Merge(MergeArgs),
}

#[derive(Args)]
struct LinksArgs {
    /// First search result page
    #[arg(long)]
    start: Option<u32>,
    /// Last search result page (inclusive)
    #[arg(long)]
    end: Option<u32>,
    #[arg(long)]
    base_url: Option<String>,
    #[arg(long, action = ArgAction::Set)]
    headless: Option<bool>,
    /// Attempts per page
    #[arg(long)]
    retry: Option<u32>,
    /// Base wait in seconds after each page load
    #[arg(long)]
    delay: Option<f64>,
    #[arg(long)]
    no_screenshots: bool,
}

impl LinksArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(start) = self.start {
            config.links.start_page = start;
        }
        if let Some(end) = self.end {
            config.links.end_page = end;
        }
        if let Some(base_url) = &self.base_url {
            config.site.base_url = base_url.clone();
        }
        if let Some(headless) = self.headless {
            config.browser.headless = headless;
        }
        if let Some(retry) = self.retry {
            config.links.retries = retry;
        }
        if let Some(delay) = self.delay {
            config.links.page_delay_secs = delay;
        }
    }
}

#[derive(Args)]
struct DetailsArgs {
    /// Link CSV to read (defaults to the newest one)
    #[arg(long)]
    input: Option<PathBuf>,
    /// Detail CSV to append to
    #[arg(long)]
    output: Option<PathBuf>,
    #[arg(long, default_value_t = 0)]
    start_index: usize,
    /// 0 processes every remaining link
    #[arg(long, default_value_t = 0)]
    max_links: usize,
    #[arg(long)]
    batch_size: Option<usize>,
    /// Sets both --min-delay and --max-delay
    #[arg(long)]
    delay: Option<f64>,
    #[arg(long)]
    min_delay: Option<f64>,
    #[arg(long)]
    max_delay: Option<f64>,
    /// Minimum pause between batches in seconds
    #[arg(long)]
    min_break: Option<f64>,
    #[arg(long)]
    max_break: Option<f64>,
    /// Take a long break after this many links (0 disables it)
    #[arg(long)]
    links_per_session: Option<usize>,
    /// Minutes between progress report refreshes
    #[arg(long)]
    report_interval: Option<f64>,
    /// Also skip events whose title was already collected
    #[arg(long)]
    dedup_titles: bool,
    #[arg(long, action = ArgAction::Set)]
    headless: Option<bool>,
    /// Continue from the saved run state
    #[arg(long)]
    resume: bool,
    #[arg(long)]
    state_file: Option<PathBuf>,
}

impl DetailsArgs {
    fn apply(&self, config: &mut Config) {
        let details = &mut config.details;
        if let Some(batch_size) = self.batch_size {
            details.batch_size = batch_size;
        }
        if let Some(delay) = self.delay {
            details.min_delay_secs = delay;
            details.max_delay_secs = delay;
        }
        if let Some(min) = self.min_delay {
            details.min_delay_secs = min;
        }
        if let Some(max) = self.max_delay {
            details.max_delay_secs = max;
        }
        if let Some(min) = self.min_break {
            details.min_batch_break_secs = min;
        }
        if let Some(max) = self.max_break {
            details.max_batch_break_secs = max;
        }
        if let Some(links) = self.links_per_session {
            details.links_per_session = links;
        }
        if let Some(minutes) = self.report_interval {
            details.report_interval_mins = minutes;
        }
        if self.dedup_titles {
            details.dedup_titles = true;
        }
        if let Some(headless) = self.headless {
            config.browser.headless = headless;
        }
    }

    fn request(&self) -> DetailsRequest {
        DetailsRequest {
            input: self.input.clone(),
            output: self.output.clone(),
            start_index: self.start_index,
            max_links: self.max_links,
            resume: self.resume,
            state_file: self.state_file.clone(),
        }
    }
}

#[derive(Args)]
struct MergeArgs {
    /// Detail CSV files to merge
    inputs: Vec<PathBuf>,
    /// Merge every detail file from this day (YYYY-MM-DD) instead
    #[arg(long, conflicts_with = "inputs")]
    date: Option<String>,
    #[arg(long)]
    output: Option<PathBuf>,
    /// Drop rows whose value in this column was already seen
    #[arg(long)]
    dedup_key: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("❌ {:#}", e);
            eprintln!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    let stamp = run_stamp();

    match cli.command {
        Commands::Links(args) => {
            args.apply(&mut config);
            config.validate()?;
            let _guard = init_logging(&config.paths.logs_dir, "links", &stamp);
            init_metrics();
            println!("🔗 Collecting event links...");

            let launcher: Arc<dyn BrowserLauncher> =
                Arc::new(HeadlessChromeLauncher::new(config.browser.clone()));
            let diagnostics: Box<dyn DiagnosticHook> = if args.no_screenshots {
                Box::new(NoDiagnostics)
            } else {
                Box::new(ScreenshotDiagnostics::new(config.paths.screenshots_dir.clone(), stamp.clone()))
            };
            let mut rng = StdRng::from_entropy();

            let outcome = run_links_phase(&config, launcher, diagnostics, &stamp, &mut rng).await?;
            println!("\n📊 Link collection results:");
            println!("   Pages visited: {}", outcome.harvest.pages_visited);
            println!("   Pages skipped: {}", outcome.harvest.pages_skipped);
            println!("   Unique links: {}", outcome.harvest.links.len());
            if outcome.harvest.stopped_early {
                println!("   Stopped early: no more results");
            }
            println!("   Output file: {}", outcome.output_path.display());
        }
        Commands::Details(args) => {
            args.apply(&mut config);
            config.validate()?;
            let _guard = init_logging(&config.paths.logs_dir, "details", &stamp);
            init_metrics();
            println!("🎭 Extracting event details...");

            if config.llm.api_key().is_none() {
                warn!(
                    "⚠️ {} is not set; every extraction call will fail until it is",
                    config.llm.api_key_env
                );
            }

            let launcher: Arc<dyn BrowserLauncher> =
                Arc::new(HeadlessChromeLauncher::new(config.browser.clone()));
            let extractor = Arc::new(ChatCompletionsExtractor::new(&config.llm)?);
            let mut rng = StdRng::from_entropy();

            let outcome = run_details_phase(
                &config,
                &args.request(),
                launcher,
                extractor.clone(),
                &stamp,
                Local::now(),
                &mut rng,
            )
            .await?;
            extractor.log_usage();

            let summary = &outcome.summary;
            println!("\n📊 Detail extraction results:");
            println!("   Links this run: {}", summary.total_links);
            println!("   Processed: {}", summary.processed);
            println!("   Extracted: {}", summary.extracted);
            println!("   Failed: {}", summary.failed);
            println!("   Duplicates skipped: {}", summary.duplicates);
            println!("   Failed batches: {}", summary.failed_batches);
            println!("   Output file: {}", outcome.output_path.display());
            if !outcome.state.is_finished() {
                println!("   Left for --resume: {}", outcome.state.remaining());
            }
            if let Some(report) = &outcome.report_path {
                println!("   Report: {}", report.display());
            }
            info!("Run state kept at {}", outcome.state_path.display());
        }
        Commands::Merge(args) => {
            let _guard = init_logging(&config.paths.logs_dir, "merge", &stamp);
            let request = MergeRequest {
                inputs: args.inputs,
                date: args.date,
                output: args.output,
                dedup_key: args.dedup_key,
            };
            let outcome = run_merge(&config, &request)?;
            println!("🧩 Merged {} files into {}", outcome.inputs.len(), outcome.output_path.display());
            println!("   Rows written: {}", outcome.summary.rows_written);
            println!("   Duplicates dropped: {}", outcome.summary.duplicates_dropped);
        }
    }
    Ok(())
}
