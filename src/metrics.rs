use std::net::SocketAddr;
use tracing::{info, warn};

pub const PAGES_VISITED: &str = "comedy_pages_visited_total";
pub const PAGES_SKIPPED: &str = "comedy_pages_skipped_total";
pub const LINKS_COLLECTED: &str = "comedy_links_collected_total";
pub const RECORDS_EXTRACTED: &str = "comedy_records_extracted_total";
pub const EXTRACTION_FAILURES: &str = "comedy_extraction_failures_total";
pub const DUPLICATES_SKIPPED: &str = "comedy_duplicates_skipped_total";
pub const BATCHES_FAILED: &str = "comedy_batches_failed_total";
pub const LLM_REQUEST_SECONDS: &str = "comedy_llm_request_duration_seconds";

/// Installs the Prometheus exporter when `COMEDY_METRICS_PORT` is set.
/// Without it the `metrics` macros are no-ops.
pub fn init_metrics() {
    let port: u16 = match std::env::var("COMEDY_METRICS_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
    {
        Some(port) => port,
        None => return,
    };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new().with_http_listener(addr);
    match builder.install() {
        Ok(()) => info!("Prometheus exporter listening on http://{}/metrics", addr),
        Err(e) => warn!("Prometheus exporter install failed: {}", e),
    }
}
