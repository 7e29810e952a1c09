#![allow(dead_code)]

use async_trait::async_trait;
use comedy_scraper::app::ports::{
    BrowserLauncher, BrowserSession, DiagnosticHook, ElementWait, ExtractionPort, RenderedPage,
};
use comedy_scraper::config::Config;
use comedy_scraper::error::{Result, ScraperError};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// What the fake browser answers for one render call.
#[derive(Clone, Debug)]
pub enum Response {
    Page { html: String, wait_satisfied: bool },
    Error(String),
}

impl Response {
    pub fn page(html: impl Into<String>) -> Self {
        Response::Page { html: html.into(), wait_satisfied: true }
    }

    pub fn slow_page(html: impl Into<String>) -> Self {
        Response::Page { html: html.into(), wait_satisfied: false }
    }

    pub fn error(message: &str) -> Self {
        Response::Error(message.to_string())
    }
}

#[derive(Default)]
pub struct BrowserLog {
    /// Per URL, answered in order; the last one repeats.
    responses: HashMap<String, Vec<Response>>,
    calls: HashMap<String, usize>,
    failing_opens: HashSet<usize>,
    pub rendered: Vec<String>,
    pub sessions_opened: usize,
    pub sessions_closed: usize,
}

#[derive(Clone, Default)]
pub struct FakeBrowser {
    log: Arc<Mutex<BrowserLog>>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, responses: Vec<Response>) -> &Self {
        self.log.lock().unwrap().responses.insert(url.to_string(), responses);
        self
    }

    /// The `n`th session open (1-based) fails.
    pub fn fail_open(&self, n: usize) -> &Self {
        self.log.lock().unwrap().failing_opens.insert(n);
        self
    }

    pub fn rendered(&self) -> Vec<String> {
        self.log.lock().unwrap().rendered.clone()
    }

    pub fn sessions(&self) -> (usize, usize) {
        let log = self.log.lock().unwrap();
        (log.sessions_opened, log.sessions_closed)
    }

    pub fn launcher(&self) -> Arc<dyn BrowserLauncher> {
        Arc::new(self.clone())
    }
}

#[async_trait]
impl BrowserLauncher for FakeBrowser {
    async fn open_session(&self) -> Result<Box<dyn BrowserSession>> {
        let mut log = self.log.lock().unwrap();
        log.sessions_opened += 1;
        if log.failing_opens.contains(&log.sessions_opened) {
            return Err(ScraperError::Browser("chrome failed to start".into()));
        }
        Ok(Box::new(FakeSession { log: Arc::clone(&self.log) }))
    }
}

struct FakeSession {
    log: Arc<Mutex<BrowserLog>>,
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn render(&mut self, url: &str, _wait: Option<&ElementWait>) -> Result<RenderedPage> {
        let mut log = self.log.lock().unwrap();
        log.rendered.push(url.to_string());
        let call = *log.calls.entry(url.to_string()).and_modify(|c| *c += 1).or_insert(0);
        let response = match log.responses.get(url) {
            Some(responses) if !responses.is_empty() => {
                responses[call.min(responses.len() - 1)].clone()
            }
            _ => return Err(ScraperError::Browser(format!("no route to {url}"))),
        };
        match response {
            Response::Page { html, wait_satisfied } => {
                Ok(RenderedPage { url: url.to_string(), html, wait_satisfied })
            }
            Response::Error(message) => Err(ScraperError::Browser(message)),
        }
    }

    async fn scroll(&mut self) -> Result<()> {
        Ok(())
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }

    async fn close(&mut self) -> Result<()> {
        self.log.lock().unwrap().sessions_closed += 1;
        Ok(())
    }
}

/// Canned extraction output per URL; unknown URLs fail the call.
#[derive(Default)]
pub struct FakeExtractor {
    outputs: HashMap<String, String>,
    pub seen_content: Mutex<Vec<String>>,
}

impl FakeExtractor {
    pub fn with(mut self, url: &str, output: impl Into<String>) -> Self {
        self.outputs.insert(url.to_string(), output.into());
        self
    }
}

#[async_trait]
impl ExtractionPort for FakeExtractor {
    async fn extract(&self, url: &str, page_content: &str) -> Result<String> {
        self.seen_content.lock().unwrap().push(page_content.to_string());
        self.outputs
            .get(url)
            .cloned()
            .ok_or_else(|| ScraperError::Api { status: 400, message: format!("no answer for {url}") })
    }
}

#[derive(Clone, Default)]
pub struct RecordingDiagnostics {
    pub labels: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl DiagnosticHook for RecordingDiagnostics {
    async fn capture(&self, _session: &mut dyn BrowserSession, label: &str) {
        self.labels.lock().unwrap().push(label.to_string());
    }
}

/// Defaults with every pause zeroed and all paths under `root`.
pub fn quiet_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.links.page_delay_secs = 0.0;
    config.links.page_delay_jitter_secs = 0.0;
    config.links.polite_delay_secs = 0.0;
    config.links.retry_backoff_secs = 0.0;
    config.details.min_delay_secs = 0.0;
    config.details.max_delay_secs = 0.0;
    config.details.min_batch_break_secs = 0.0;
    config.details.max_batch_break_secs = 0.0;
    config.details.min_session_break_mins = 0.0;
    config.details.max_session_break_mins = 0.0;
    config.details.report_interval_mins = 0.0;
    config.paths.links_dir = root.join("links");
    config.paths.details_dir = root.join("details");
    config.paths.logs_dir = root.join("logs");
    config.paths.screenshots_dir = root.join("screenshots");
    config.paths.reports_dir = root.join("reports");
    config
}

pub fn event_json(title: &str) -> Value {
    json!({
        "title": title,
        "venue": "Comedy Bar",
        "summary": "An evening of stand-up",
        "address": "945 Bloor St W",
        "email": "Not provided",
        "city": "Toronto",
        "province": "Ontario",
        "producers": "Comedy Bar",
        "event_link": "https://model.made/this/up",
        "date": "2025-11-01 9:30 PM"
    })
}

pub fn event_page(title: &str) -> String {
    format!("<html><head><title>{title}</title></head><body><h1>{title}</h1></body></html>")
}
