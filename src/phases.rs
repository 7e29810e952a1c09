//! Whole-phase entry points. Browser and extractor adapters are injected so
//! the binary and the integration tests share the same wiring.

use crate::app::batch_orchestrator::{BatchOrchestrator, BatchSettings, RunSummary};
use crate::app::collect_links_use_case::{CollectLinksUseCase, LinkCrawlSettings, LinkHarvest};
use crate::app::extract_details_use_case::ExtractDetailsUseCase;
use crate::app::ports::{BrowserLauncher, DiagnosticHook, ExtractionPort};
use crate::config::Config;
use crate::constants::{CSV_SUFFIX, DETAILS_FILE_PREFIX, LINKS_FILE_PREFIX, LINK_COLUMN, RUN_STATE_FILE};
use crate::error::{Result, ScraperError};
use crate::infra::checkpoint::CsvCheckpoint;
use crate::infra::csv_store::{merge_csv_files, read_links, read_rows, write_links, MergeSummary};
use crate::infra::files::{append_timestamp, find_files_by_date, find_newest_file};
use crate::infra::report::ProgressReporter;
use crate::infra::run_state::RunState;
use crate::parser::LinkSelectors;
use crate::pipeline::select_window;
use crate::validation::SeenEvents;
use chrono::{DateTime, Local, Utc};
use rand::rngs::StdRng;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug)]
pub struct LinksOutcome {
    pub output_path: PathBuf,
    pub harvest: LinkHarvest,
}

/// Crawls the configured page range and writes the link CSV.
pub async fn run_links_phase(
    config: &Config,
    launcher: Arc<dyn BrowserLauncher>,
    diagnostics: Box<dyn DiagnosticHook>,
    run_stamp: &str,
    rng: &mut StdRng,
) -> Result<LinksOutcome> {
    let selectors = LinkSelectors::new(&config.site)?;
    let settings = LinkCrawlSettings::from_config(config);
    let (start, end) = (settings.start_page, settings.end_page);
    let use_case = CollectLinksUseCase::new(launcher, diagnostics, selectors, settings);

    let harvest = use_case.run(rng).await?;
    if harvest.links.is_empty() {
        return Err(ScraperError::NoLinks(format!(
            "pages {start}-{end} of {} yielded no event links",
            config.site.base_url
        )));
    }

    let output_path = config
        .paths
        .links_dir
        .join(format!("{LINKS_FILE_PREFIX}_{run_stamp}{CSV_SUFFIX}"));
    write_links(&output_path, &harvest.links)?;
    info!("💾 Saved {} links to {}", harvest.links.len(), output_path.display());

    Ok(LinksOutcome { output_path, harvest })
}

#[derive(Debug, Clone, Default)]
pub struct DetailsRequest {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub start_index: usize,
    /// Zero means every remaining link.
    pub max_links: usize,
    pub resume: bool,
    pub state_file: Option<PathBuf>,
}

impl DetailsRequest {
    pub fn state_path(&self, config: &Config) -> PathBuf {
        self.state_file
            .clone()
            .unwrap_or_else(|| config.paths.details_dir.join(RUN_STATE_FILE))
    }
}

#[derive(Debug)]
pub struct DetailsOutcome {
    pub summary: RunSummary,
    /// Run state as of the last checkpoint.
    pub state: RunState,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub state_path: PathBuf,
    pub report_path: Option<PathBuf>,
}

/// Runs the detail phase over a window of the link CSV.
///
/// Setup problems (no input, empty input, unreadable run state) are errors;
/// everything that goes wrong per link or per batch ends up in the summary.
pub async fn run_details_phase(
    config: &Config,
    request: &DetailsRequest,
    launcher: Arc<dyn BrowserLauncher>,
    extractor: Arc<dyn ExtractionPort>,
    run_stamp: &str,
    run_started: DateTime<Local>,
    rng: &mut StdRng,
) -> Result<DetailsOutcome> {
    let state_path = request.state_path(config);
    let prior = if request.resume {
        let state = RunState::load(&state_path).map_err(|e| {
            ScraperError::InputNotFound(format!("run state {}: {}", state_path.display(), e))
        })?;
        info!(
            "🔄 Resuming at link {} of {} from {}",
            state.next_index,
            state.end_index,
            state_path.display()
        );
        Some(state)
    } else {
        None
    };

    let input_path = resolve_input(config, request, prior.as_ref())?;
    let links = read_links(&input_path);
    if links.is_empty() {
        return Err(ScraperError::NoLinks(format!("{} has no event links", input_path.display())));
    }
    info!("📥 Loaded {} links from {}", links.len(), input_path.display());

    let output_path = request
        .output
        .clone()
        .or_else(|| prior.as_ref().map(|s| s.output_path.clone()))
        .unwrap_or_else(|| {
            config
                .paths
                .details_dir
                .join(format!("{DETAILS_FILE_PREFIX}_{run_stamp}{CSV_SUFFIX}"))
        });

    let mut seen = SeenEvents::new(config.details.dedup_titles);
    if output_path.exists() {
        for row in read_rows(&output_path) {
            let field = |key: &str| row.get(key).map(String::as_str).unwrap_or_default();
            seen.insert(field(LINK_COLUMN), field("title"));
        }
        info!("🧷 {} links already present in {}", seen.len(), output_path.display());
    }

    let mut state = match prior {
        Some(mut state) => {
            state.input_path = input_path.clone();
            state.output_path = output_path.clone();
            state.clamp_to(links.len());
            state
        }
        None => {
            let window = select_window(links.len(), request.start_index, request.max_links);
            RunState::new(input_path.clone(), output_path.clone(), window.start, window.end, links.len())
        }
    };
    state.updated_at = Utc::now();
    state.save(&state_path)?;
    let pending = state.pending_indices();
    if !state.failed_indices.is_empty() {
        info!("🔁 Retrying {} links from failed batches first", state.failed_indices.len());
    }

    let orchestrator = BatchOrchestrator::new(
        launcher,
        ExtractDetailsUseCase::new(extractor, config.details.max_content_chars),
        BatchSettings::from_config(&config.details),
    );
    let reporter = ProgressReporter::new(
        config.paths.reports_dir.clone(),
        run_stamp,
        run_started,
        config.details.report_interval(),
    );
    let mut checkpoint = CsvCheckpoint::new(state, state_path.clone()).with_reporter(reporter);
    let summary = orchestrator
        .run(&links, &pending, &mut seen, &mut checkpoint, rng)
        .await;

    let (state, reporter) = checkpoint.into_parts();
    let report_path = reporter.and_then(|mut reporter| match reporter.write(&state) {
        Ok(path) => Some(path),
        Err(e) => {
            warn!("⚠️ Could not write progress report: {}", e);
            None
        }
    });

    Ok(DetailsOutcome { summary, state, input_path, output_path, state_path, report_path })
}

fn resolve_input(
    config: &Config,
    request: &DetailsRequest,
    prior: Option<&RunState>,
) -> Result<PathBuf> {
    let candidate = request
        .input
        .clone()
        .or_else(|| prior.map(|s| s.input_path.clone()))
        .or_else(|| find_newest_file(&config.paths.links_dir, LINKS_FILE_PREFIX, CSV_SUFFIX));

    match candidate {
        Some(path) if path.is_file() => Ok(path),
        Some(path) => Err(ScraperError::InputNotFound(path.display().to_string())),
        None => Err(ScraperError::InputNotFound(format!(
            "no {LINKS_FILE_PREFIX}*{CSV_SUFFIX} in {}",
            config.paths.links_dir.display()
        ))),
    }
}

#[derive(Debug, Clone, Default)]
pub struct MergeRequest {
    pub inputs: Vec<PathBuf>,
    /// `YYYY-MM-DD`; selects detail files from that day when no inputs are given.
    pub date: Option<String>,
    pub output: Option<PathBuf>,
    pub dedup_key: Option<String>,
}

#[derive(Debug)]
pub struct MergeOutcome {
    pub output_path: PathBuf,
    pub inputs: Vec<PathBuf>,
    pub summary: MergeSummary,
}

pub fn run_merge(config: &Config, request: &MergeRequest) -> Result<MergeOutcome> {
    let details_dir = &config.paths.details_dir;
    let output_path = request.output.clone().unwrap_or_else(|| {
        let name = match &request.date {
            Some(date) => format!("merged_events_{date}{CSV_SUFFIX}"),
            None => format!("merged_events{CSV_SUFFIX}"),
        };
        details_dir.join(append_timestamp(&name))
    });

    let inputs: Vec<PathBuf> = if !request.inputs.is_empty() {
        request.inputs.clone()
    } else if let Some(date) = &request.date {
        find_files_by_date(details_dir, date, CSV_SUFFIX)
            .into_iter()
            .filter(|p| is_detail_file(p) && p != &output_path)
            .collect()
    } else {
        Vec::new()
    };

    if inputs.is_empty() {
        return Err(ScraperError::InputNotFound(match &request.date {
            Some(date) => format!("no detail files from {date} in {}", details_dir.display()),
            None => "no merge inputs given".to_string(),
        }));
    }

    let summary = merge_csv_files(&inputs, &output_path, request.dedup_key.as_deref())?;
    Ok(MergeOutcome { output_path, inputs, summary })
}

fn is_detail_file(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().starts_with(DETAILS_FILE_PREFIX))
        .unwrap_or(false)
}
