use crate::error::Result;
use crate::types::EventRecord;
use async_trait::async_trait;
use std::time::Duration;

/// Element to wait for after navigation, with an upper bound.
#[derive(Clone, Debug)]
pub struct ElementWait {
    pub selector: String,
    pub timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct RenderedPage {
    pub url: String,
    pub html: String,
    /// False when the awaited element did not show up before the timeout.
    pub wait_satisfied: bool,
}

// Browser-side ports
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn open_session(&self) -> Result<Box<dyn BrowserSession>>;
}

/// One live browser context. Callers must `close` it when done.
#[async_trait]
pub trait BrowserSession: Send {
    async fn render(&mut self, url: &str, wait: Option<&ElementWait>) -> Result<RenderedPage>;
    async fn scroll(&mut self) -> Result<()>;
    async fn screenshot(&mut self) -> Result<Vec<u8>>;
    async fn close(&mut self) -> Result<()>;
}

// Extraction-side ports
#[async_trait]
pub trait ExtractionPort: Send + Sync {
    /// Returns raw model output, expected to be JSON. An `Err` means the call
    /// itself did not succeed.
    async fn extract(&self, url: &str, page_content: &str) -> Result<String>;
}

/// Link indices one batch covered and whether the batch ran at all.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchProgress {
    pub indices: Vec<usize>,
    pub failed: bool,
}

// Output-side ports
#[async_trait]
pub trait CheckpointPort: Send {
    /// Persists one batch worth of records and where the run got to.
    async fn checkpoint(&mut self, records: &[EventRecord], batch: &BatchProgress) -> Result<()>;
}

/// Optional per-attempt artifact capture, e.g. screenshots.
#[async_trait]
pub trait DiagnosticHook: Send + Sync {
    async fn capture(&self, session: &mut dyn BrowserSession, label: &str);
}

pub struct NoDiagnostics;

#[async_trait]
impl DiagnosticHook for NoDiagnostics {
    async fn capture(&self, _session: &mut dyn BrowserSession, _label: &str) {}
}
