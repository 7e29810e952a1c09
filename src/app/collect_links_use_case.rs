use crate::app::ports::{BrowserLauncher, BrowserSession, DiagnosticHook, ElementWait};
use crate::config::Config;
use crate::error::Result;
use crate::metrics::{LINKS_COLLECTED, PAGES_SKIPPED, PAGES_VISITED};
use crate::parser::{extract_links, has_no_results, page_url, LinkSelectors, LinkStrategy};
use crate::pipeline::{dedup_links, DelayRange, RetryPolicy};
use rand::rngs::StdRng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, info_span, warn, Instrument};

/// Knobs for one crawl over the search result pages.
#[derive(Debug, Clone)]
pub struct LinkCrawlSettings {
    pub base_url: String,
    pub start_page: u32,
    pub end_page: u32,
    pub retry: RetryPolicy,
    /// Pause after each render, before links are read.
    pub page_delay: DelayRange,
    /// Pause after each successful page.
    pub polite_delay: DelayRange,
    pub selector_timeout: Duration,
}

impl LinkCrawlSettings {
    pub fn from_config(config: &Config) -> Self {
        let links = &config.links;
        Self {
            base_url: config.site.base_url.clone(),
            start_page: links.start_page,
            end_page: links.end_page,
            retry: RetryPolicy::new(links.retries).with_backoff(
                Duration::from_secs_f64(links.retry_backoff_secs.max(0.0)),
                2.0,
                Duration::from_secs(60),
            ),
            page_delay: DelayRange::from_secs(
                links.page_delay_secs,
                links.page_delay_secs + links.page_delay_jitter_secs.max(0.0),
            ),
            polite_delay: DelayRange::from_secs(links.polite_delay_secs, links.polite_delay_secs),
            selector_timeout: config.browser.selector_timeout(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkHarvest {
    pub links: Vec<String>,
    pub pages_visited: u32,
    pub pages_skipped: u32,
    /// A "no results" page ended the crawl before `end_page`.
    pub stopped_early: bool,
}

enum PageVisit {
    Links(Vec<String>),
    NoResults,
}

/// Walks search result pages in one browser session and gathers event links.
pub struct CollectLinksUseCase {
    launcher: Arc<dyn BrowserLauncher>,
    diagnostics: Box<dyn DiagnosticHook>,
    selectors: LinkSelectors,
    settings: LinkCrawlSettings,
}

impl CollectLinksUseCase {
    pub fn new(
        launcher: Arc<dyn BrowserLauncher>,
        diagnostics: Box<dyn DiagnosticHook>,
        selectors: LinkSelectors,
        settings: LinkCrawlSettings,
    ) -> Self {
        Self { launcher, diagnostics, selectors, settings }
    }

    /// Fails only when no browser session can be opened; page failures are
    /// skipped.
    pub async fn run(&self, rng: &mut StdRng) -> Result<LinkHarvest> {
        let mut session = self.launcher.open_session().await?;
        let harvest = self.crawl(session.as_mut(), rng).await;
        if let Err(e) = session.close().await {
            warn!("⚠️ Closing browser session failed: {}", e);
        }
        Ok(harvest)
    }

    async fn crawl(&self, session: &mut dyn BrowserSession, rng: &mut StdRng) -> LinkHarvest {
        let mut harvest = LinkHarvest::default();
        let mut collected = Vec::new();

        for page in self.settings.start_page..=self.settings.end_page {
            let url = page_url(&self.settings.base_url, page);
            let visit = self
                .visit_page(&mut *session, page, &url, rng)
                .instrument(info_span!("page", page))
                .await;

            match visit {
                Some(PageVisit::Links(links)) => {
                    harvest.pages_visited += 1;
                    metrics::counter!(PAGES_VISITED).increment(1);
                    collected.extend(links);
                    self.settings.polite_delay.pause(rng).await;
                }
                Some(PageVisit::NoResults) => {
                    harvest.pages_visited += 1;
                    metrics::counter!(PAGES_VISITED).increment(1);
                    harvest.stopped_early = true;
                    info!("🛑 No results on page {}, stopping the crawl", page);
                    break;
                }
                None => {
                    harvest.pages_skipped += 1;
                    metrics::counter!(PAGES_SKIPPED).increment(1);
                }
            }
        }

        harvest.links = dedup_links(collected);
        metrics::counter!(LINKS_COLLECTED).increment(harvest.links.len() as u64);
        info!(
            "✅ Collected {} unique links from {} pages ({} skipped)",
            harvest.links.len(),
            harvest.pages_visited,
            harvest.pages_skipped
        );
        harvest
    }

    async fn visit_page(
        &self,
        session: &mut dyn BrowserSession,
        page: u32,
        url: &str,
        rng: &mut StdRng,
    ) -> Option<PageVisit> {
        let wait = ElementWait {
            selector: self.selectors.primary_selector().to_string(),
            timeout: self.settings.selector_timeout,
        };
        let attempts = self.settings.retry.attempts();

        for attempt in 1..=attempts {
            info!("📄 Loading page {} (attempt {}/{}): {}", page, attempt, attempts, url);
            match session.render(url, Some(&wait)).await {
                Ok(rendered) => {
                    self.settings.page_delay.pause(rng).await;
                    self.diagnostics.capture(&mut *session, &format!("page_{page}")).await;

                    if has_no_results(&rendered.html) {
                        return Some(PageVisit::NoResults);
                    }
                    let found = extract_links(&rendered.html, &self.selectors, rendered.wait_satisfied);
                    if found.strategy == LinkStrategy::Fallback {
                        info!("🔎 Primary selector missed on page {}, used fallback", page);
                    }
                    info!("🔗 Found {} links on page {}", found.links.len(), page);
                    return Some(PageVisit::Links(found.links));
                }
                Err(e) => {
                    warn!("⚠️ Page {} attempt {}/{} failed: {}", page, attempt, attempts, e);
                    self.diagnostics
                        .capture(&mut *session, &format!("error_page_{page}_attempt_{attempt}"))
                        .await;
                    if attempt < attempts {
                        tokio::time::sleep(self.settings.retry.backoff_for(attempt)).await;
                    }
                }
            }
        }

        warn!("⏭️ Skipping page {} after {} attempts", page, attempts);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_follow_config() {
        let mut config = Config::default();
        config.links.retries = 3;
        config.links.page_delay_secs = 5.0;

        let settings = LinkCrawlSettings::from_config(&config);
        assert_eq!(settings.retry.attempts(), 3);
        assert_eq!(settings.page_delay, DelayRange::from_secs(5.0, 8.0));
        assert_eq!(settings.start_page, 1);
    }
}
