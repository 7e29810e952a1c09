use crate::app::ports::{BrowserLauncher, BrowserSession, DiagnosticHook, ElementWait, RenderedPage};
use crate::config::BrowserConfig;
use crate::constants::{BROWSER_ARGS, USER_AGENTS};
use crate::error::{Result, ScraperError};
use async_trait::async_trait;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::{Browser, LaunchOptions, Tab};
use rand::seq::SliceRandom;
use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const SCROLL_JS: &str =
    "window.scrollBy(0, Math.floor(window.innerHeight * (0.4 + Math.random() * 0.8)));";

// Long LLM calls between page loads must not let Chrome reap itself
const IDLE_BROWSER_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Runs a blocking `headless_chrome` call off the async executor.
async fn blocking<T, F>(op: F) -> Result<T>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| ScraperError::Browser(format!("browser task failed: {e}")))?
        .map_err(|e| ScraperError::Browser(format!("{e:#}")))
}

/// Launches a fresh Chrome process per session.
pub struct HeadlessChromeLauncher {
    config: BrowserConfig,
}

impl HeadlessChromeLauncher {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl BrowserLauncher for HeadlessChromeLauncher {
    async fn open_session(&self) -> Result<Box<dyn BrowserSession>> {
        let user_agent = USER_AGENTS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(USER_AGENTS[0])
            .to_string();
        let headless = self.config.headless;
        let window = (self.config.window_width, self.config.window_height);
        let page_timeout = self.config.page_timeout();

        let (browser, tab) = blocking(move || {
            let options = LaunchOptions {
                headless,
                sandbox: false,
                window_size: Some(window),
                idle_browser_timeout: IDLE_BROWSER_TIMEOUT,
                args: BROWSER_ARGS.iter().map(OsStr::new).collect(),
                ..Default::default()
            };
            let browser = Browser::new(options)?;
            let tab = browser.new_tab()?;
            tab.set_default_timeout(page_timeout);
            tab.set_user_agent(&user_agent, Some("en-US,en;q=0.9"), None)?;
            // Registered before any navigation so page scripts never see the automation flags
            tab.enable_stealth_mode()?;
            Ok((browser, tab))
        })
        .await?;

        info!("🌐 Browser session opened (headless: {})", headless);
        Ok(Box::new(HeadlessChromeSession { browser: Some(browser), tab }))
    }
}

pub struct HeadlessChromeSession {
    browser: Option<Browser>,
    tab: Arc<Tab>,
}

#[async_trait]
impl BrowserSession for HeadlessChromeSession {
    async fn render(&mut self, url: &str, wait: Option<&ElementWait>) -> Result<RenderedPage> {
        if self.browser.is_none() {
            return Err(ScraperError::Browser("session already closed".to_string()));
        }
        let tab = Arc::clone(&self.tab);
        let target = url.to_string();
        let wait = wait.cloned();

        blocking(move || {
            tab.navigate_to(&target)?;
            tab.wait_until_navigated()?;

            let wait_satisfied = match &wait {
                Some(w) => tab
                    .wait_for_element_with_custom_timeout(&w.selector, w.timeout)
                    .is_ok(),
                None => true,
            };
            let html = tab.get_content()?;
            Ok(RenderedPage { url: target, html, wait_satisfied })
        })
        .await
    }

    async fn scroll(&mut self) -> Result<()> {
        let tab = Arc::clone(&self.tab);
        blocking(move || {
            tab.evaluate(SCROLL_JS, false)?;
            Ok(())
        })
        .await
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>> {
        let tab = Arc::clone(&self.tab);
        blocking(move || {
            tab.capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
        })
        .await
    }

    async fn close(&mut self) -> Result<()> {
        let Some(browser) = self.browser.take() else {
            return Ok(());
        };
        let tab = Arc::clone(&self.tab);
        blocking(move || {
            let closed = tab.close(true);
            // Dropping the last handle terminates the Chrome process
            drop(browser);
            closed.map(|_| ())
        })
        .await?;
        debug!("Browser session closed");
        Ok(())
    }
}

/// Writes a PNG per capture to `<dir>/<run_stamp>_<label>.png`.
pub struct ScreenshotDiagnostics {
    dir: PathBuf,
    run_stamp: String,
}

impl ScreenshotDiagnostics {
    pub fn new(dir: PathBuf, run_stamp: impl Into<String>) -> Self {
        Self { dir, run_stamp: run_stamp.into() }
    }

    pub fn path_for(&self, label: &str) -> PathBuf {
        self.dir.join(format!("{}_{}.png", self.run_stamp, label))
    }
}

#[async_trait]
impl DiagnosticHook for ScreenshotDiagnostics {
    async fn capture(&self, session: &mut dyn BrowserSession, label: &str) {
        let bytes = match session.screenshot().await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("⚠️ Screenshot '{}' failed: {}", label, e);
                return;
            }
        };
        let path = self.path_for(label);
        let written = async {
            tokio::fs::create_dir_all(&self.dir).await?;
            tokio::fs::write(&path, bytes).await
        }
        .await;
        match written {
            Ok(()) => debug!("📸 Screenshot saved to {}", path.display()),
            Err(e) => warn!("⚠️ Could not save screenshot {}: {}", path.display(), e),
        }
    }
}
