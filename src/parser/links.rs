use crate::config::SiteConfig;
use crate::constants::NO_RESULTS_MARKERS;
use crate::error::{Result, ScraperError};
use once_cell::sync::Lazy;
use reqwest::Url;
use scraper::{Html, Selector};

static ANCHOR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("static anchor selector"));

/// Which selector produced a page's links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStrategy {
    Primary,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct PageLinks {
    pub links: Vec<String>,
    pub strategy: LinkStrategy,
}

/// Compiled link-finding rules for one site.
#[derive(Debug, Clone)]
pub struct LinkSelectors {
    primary: Selector,
    primary_source: String,
    event_path_pattern: String,
    origin: Url,
}

impl LinkSelectors {
    pub fn new(site: &SiteConfig) -> Result<Self> {
        let primary = Selector::parse(&site.link_selector).map_err(|e| {
            ScraperError::Config(format!("invalid link selector '{}': {:?}", site.link_selector, e))
        })?;
        let origin = Url::parse(&site.origin).map_err(|e| {
            ScraperError::Config(format!("invalid site origin '{}': {}", site.origin, e))
        })?;
        Ok(Self {
            primary,
            primary_source: site.link_selector.clone(),
            event_path_pattern: site.event_path_pattern.clone(),
            origin,
        })
    }

    pub fn primary_selector(&self) -> &str {
        &self.primary_source
    }

    /// Absolute form of `href`, or `None` for empty, fragment-only and
    /// `javascript:`/`mailto:` links.
    pub fn resolve(&self, href: &str) -> Option<String> {
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') {
            return None;
        }
        let lowered = href.to_ascii_lowercase();
        if lowered.starts_with("javascript:") || lowered.starts_with("mailto:") {
            return None;
        }
        if lowered.starts_with("http://") || lowered.starts_with("https://") {
            return Some(href.to_string());
        }
        self.origin.join(href).ok().map(String::from)
    }
}

/// Links to event pages found in `html`.
///
/// When the primary selector showed up in time its anchors are used;
/// otherwise (or when it yields nothing) every anchor whose resolved URL
/// contains the event path pattern is taken instead.
pub fn extract_links(html: &str, selectors: &LinkSelectors, primary_matched: bool) -> PageLinks {
    let document = Html::parse_document(html);

    if primary_matched {
        let links: Vec<String> = document
            .select(&selectors.primary)
            .filter_map(|a| a.value().attr("href"))
            .filter_map(|href| selectors.resolve(href))
            .collect();
        if !links.is_empty() {
            return PageLinks { links, strategy: LinkStrategy::Primary };
        }
    }

    let links = document
        .select(&ANCHOR_SELECTOR)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| selectors.resolve(href))
        .filter(|url| url.contains(&selectors.event_path_pattern))
        .collect();
    PageLinks { links, strategy: LinkStrategy::Fallback }
}

pub fn has_no_results(html: &str) -> bool {
    NO_RESULTS_MARKERS.iter().any(|marker| html.contains(marker))
}

/// Search-results URL for page `page` of `base_url`.
pub fn page_url(base_url: &str, page: u32) -> String {
    let separator = if base_url.contains('?') { '&' } else { '?' };
    format!("{base_url}{separator}page={page}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selectors() -> LinkSelectors {
        LinkSelectors::new(&SiteConfig::default()).unwrap()
    }

    #[test]
    fn primary_selector_links_are_resolved() {
        let html = r#"
            <html><body>
              <a class="eds-event-card-content__action-link" href="/e/late-show-tickets-1">Late</a>
              <a class="eds-event-card-content__action-link" href="https://www.eventbrite.ca/e/open-mic-2">Mic</a>
              <a href="https://www.eventbrite.ca/e/not-a-card-3">Other</a>
            </body></html>
        "#;

        let found = extract_links(html, &selectors(), true);
        assert_eq!(found.strategy, LinkStrategy::Primary);
        assert_eq!(
            found.links,
            vec![
                "https://www.eventbrite.ca/e/late-show-tickets-1",
                "https://www.eventbrite.ca/e/open-mic-2",
            ]
        );
    }

    #[test]
    fn fallback_keeps_only_event_paths() {
        let html = r##"
            <html><body>
              <a href="https://www.eventbrite.ca/e/improv-night-9">Improv</a>
              <a href="/e/sketch-show-10">Sketch</a>
              <a href="/d/canada--ontario/comedy/">Search</a>
              <a href="#top">Top</a>
              <a href="javascript:void(0)">Noop</a>
            </body></html>
        "##;

        let found = extract_links(html, &selectors(), false);
        assert_eq!(found.strategy, LinkStrategy::Fallback);
        assert_eq!(
            found.links,
            vec![
                "https://www.eventbrite.ca/e/improv-night-9",
                "https://www.eventbrite.ca/e/sketch-show-10",
            ]
        );
    }

    #[test]
    fn empty_primary_match_falls_back() {
        let html = r#"<a href="/e/only-fallback-1">x</a>"#;
        let found = extract_links(html, &selectors(), true);
        assert_eq!(found.strategy, LinkStrategy::Fallback);
        assert_eq!(found.links, vec!["https://www.eventbrite.ca/e/only-fallback-1"]);
    }

    #[test]
    fn detects_no_results_pages() {
        assert!(has_no_results("<h2>Sorry, no events matched your search</h2>"));
        assert!(!has_no_results("<h2>42 events</h2>"));
    }

    #[test]
    fn page_urls_append_page_parameter() {
        assert_eq!(page_url("https://x.test/comedy/", 2), "https://x.test/comedy/?page=2");
        assert_eq!(page_url("https://x.test/s?q=comedy", 3), "https://x.test/s?q=comedy&page=3");
    }

    #[test]
    fn invalid_selector_is_a_config_error() {
        let site = SiteConfig { link_selector: "a[[".into(), ..SiteConfig::default() };
        assert!(matches!(LinkSelectors::new(&site), Err(ScraperError::Config(_))));
    }
}
