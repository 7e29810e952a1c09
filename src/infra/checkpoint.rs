use crate::app::ports::{BatchProgress, CheckpointPort};
use crate::error::Result;
use crate::infra::csv_store::append_records;
use crate::infra::report::ProgressReporter;
use crate::infra::run_state::RunState;
use crate::types::EventRecord;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{info, warn};

/// Appends each batch to the detail CSV, then records progress in the
/// run-state sidecar and, when a reporter is attached, the progress report.
pub struct CsvCheckpoint {
    output_path: PathBuf,
    state_path: PathBuf,
    state: RunState,
    reporter: Option<ProgressReporter>,
}

impl CsvCheckpoint {
    pub fn new(state: RunState, state_path: PathBuf) -> Self {
        Self { output_path: state.output_path.clone(), state_path, state, reporter: None }
    }

    pub fn with_reporter(mut self, reporter: ProgressReporter) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn into_parts(self) -> (RunState, Option<ProgressReporter>) {
        (self.state, self.reporter)
    }
}

#[async_trait]
impl CheckpointPort for CsvCheckpoint {
    async fn checkpoint(&mut self, records: &[EventRecord], batch: &BatchProgress) -> Result<()> {
        if !records.is_empty() {
            append_records(&self.output_path, records)?;
            info!("💾 Saved {} records to {}", records.len(), self.output_path.display());
        }
        self.state.record_batch(&batch.indices, batch.failed);
        self.state.save(&self.state_path)?;

        if let Some(reporter) = &mut self.reporter {
            if let Err(e) = reporter.refresh(&self.state) {
                warn!("⚠️ Could not refresh progress report: {}", e);
            }
        }
        Ok(())
    }
}
