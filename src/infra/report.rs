use crate::error::Result;
use crate::infra::run_state::RunState;
use chrono::{DateTime, Local};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

const RULE: &str = "==================================================";

/// Snapshot of detail-phase progress for the plain-text report.
#[derive(Debug, Clone)]
pub struct ProgressReport {
    pub run_started: DateTime<Local>,
    pub runtime: Option<Duration>,
    pub total_links: usize,
    pub completed_links: usize,
    pub output_file: PathBuf,
}

impl ProgressReport {
    /// Progress over the whole window of `state`, across resumed runs.
    pub fn from_state(
        state: &RunState,
        run_started: DateTime<Local>,
        runtime: Option<Duration>,
    ) -> Self {
        let total_links = state.window_len();
        Self {
            run_started,
            runtime,
            total_links,
            completed_links: total_links.saturating_sub(state.remaining()),
            output_file: state.output_path.clone(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.total_links.saturating_sub(self.completed_links)
    }

    pub fn is_complete(&self) -> bool {
        self.remaining() == 0
    }

    pub fn completion_percentage(&self) -> f64 {
        if self.total_links == 0 {
            return 0.0;
        }
        self.completed_links as f64 / self.total_links as f64 * 100.0
    }

    pub fn render(&self, report_time: &DateTime<Local>) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{RULE}");
        let _ = writeln!(out, "COMEDY EVENT SCRAPER PROGRESS REPORT");
        let _ = writeln!(out, "{RULE}\n");
        let _ = writeln!(out, "Report time: {}", report_time.format("%Y-%m-%d %H:%M:%S"));
        let _ = writeln!(out, "Run started: {}", self.run_started.format("%Y-%m-%d %H:%M:%S"));
        if let Some(runtime) = self.runtime {
            let secs = runtime.as_secs();
            let _ = writeln!(
                out,
                "Total runtime: {}h {}m {}s",
                secs / 3600,
                (secs % 3600) / 60,
                secs % 60
            );
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "Total links: {}", self.total_links);
        let _ = writeln!(
            out,
            "Completed: {} ({:.2}%)",
            self.completed_links,
            self.completion_percentage()
        );
        let _ = writeln!(out, "Remaining: {}", self.remaining());
        let _ = writeln!(out, "Output file: {}\n", self.output_file.display());
        if self.is_complete() {
            let _ = writeln!(out, "STATUS: COMPLETED");
            let _ = writeln!(out, "All links have been processed");
        } else {
            let _ = writeln!(out, "STATUS: PAUSED/INTERRUPTED");
            let _ = writeln!(out, "To resume, run with --resume");
        }
        let _ = writeln!(out, "\n{RULE}");
        out
    }
}

/// Writes `report` under `reports_dir` and returns the report path.
pub fn write_progress_report(
    reports_dir: &Path,
    run_stamp: &str,
    report: &ProgressReport,
) -> Result<PathBuf> {
    fs::create_dir_all(reports_dir)?;
    let status = if report.is_complete() { "complete" } else { "partial" };
    let path = reports_dir.join(format!("scraper_report_{run_stamp}_{status}.txt"));
    fs::write(&path, report.render(&Local::now()))?;
    info!("📝 Progress report saved to {}", path.display());
    Ok(path)
}

/// Keeps one report file per run up to date while the run progresses.
pub struct ProgressReporter {
    reports_dir: PathBuf,
    run_stamp: String,
    run_started: DateTime<Local>,
    started: Instant,
    interval: Duration,
    last_written: Option<Instant>,
    last_path: Option<PathBuf>,
}

impl ProgressReporter {
    pub fn new(
        reports_dir: PathBuf,
        run_stamp: impl Into<String>,
        run_started: DateTime<Local>,
        interval: Duration,
    ) -> Self {
        Self {
            reports_dir,
            run_stamp: run_stamp.into(),
            run_started,
            started: Instant::now(),
            interval,
            last_written: None,
            last_path: None,
        }
    }

    /// Writes a report if none exists yet or `interval` has passed since the
    /// last one.
    pub fn refresh(&mut self, state: &RunState) -> Result<Option<PathBuf>> {
        let due = self
            .last_written
            .map_or(true, |at| at.elapsed() >= self.interval);
        if !due {
            return Ok(None);
        }
        self.write(state).map(Some)
    }

    /// Writes a report now. A report left over under the other status is
    /// removed, so the run keeps a single file.
    pub fn write(&mut self, state: &RunState) -> Result<PathBuf> {
        let runtime = Some(self.started.elapsed());
        let report = ProgressReport::from_state(state, self.run_started, runtime);
        let path = write_progress_report(&self.reports_dir, &self.run_stamp, &report)?;
        if let Some(previous) = self.last_path.take() {
            if previous != path {
                if let Err(e) = fs::remove_file(&previous) {
                    debug!("Could not remove stale report {}: {}", previous.display(), e);
                }
            }
        }
        self.last_written = Some(Instant::now());
        self.last_path = Some(path.clone());
        Ok(path)
    }
}
