use crate::app::ports::{BrowserSession, ExtractionPort};
use crate::parser::{page_text, parse_extraction};
use crate::types::{EventRecord, ExtractionFailure};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Turns one event page into a validated record.
pub struct ExtractDetailsUseCase {
    extractor: Arc<dyn ExtractionPort>,
    max_content_chars: usize,
}

impl ExtractDetailsUseCase {
    pub fn new(extractor: Arc<dyn ExtractionPort>, max_content_chars: usize) -> Self {
        Self { extractor, max_content_chars }
    }

    pub async fn extract(
        &self,
        session: &mut dyn BrowserSession,
        url: &str,
    ) -> Result<EventRecord, ExtractionFailure> {
        let result = self.try_extract(session, url).await;
        match &result {
            Ok(record) => info!("🎭 Extracted '{}' at {}", record.title, record.venue),
            Err(ExtractionFailure::Incomplete(missing)) => warn!(
                "⚠️ Incomplete event {}: {}",
                url,
                crate::validation::format_missing(missing)
            ),
            Err(failure) => warn!("⚠️ No record for {}: {}", url, failure),
        }
        result
    }

    async fn try_extract(
        &self,
        session: &mut dyn BrowserSession,
        url: &str,
    ) -> Result<EventRecord, ExtractionFailure> {
        let rendered = session
            .render(url, None)
            .await
            .map_err(|e| ExtractionFailure::Fetch(e.to_string()))?;

        let content = page_text(&rendered.html, self.max_content_chars);
        debug!("Page text for {} is {} chars", url, content.chars().count());

        let raw = self
            .extractor
            .extract(url, &content)
            .await
            .map_err(|e| ExtractionFailure::Extraction(e.to_string()))?;

        parse_extraction(&raw, url)
    }
}
