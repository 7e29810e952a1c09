use crate::constants;
use crate::error::{Result, ScraperError};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Runtime configuration. Every field has a default so a missing
/// `config.toml` yields a working setup; CLI flags override on top.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub browser: BrowserConfig,
    pub links: LinksConfig,
    pub details: DetailsConfig,
    pub llm: LlmConfig,
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub base_url: String,
    pub origin: String,
    pub link_selector: String,
    pub event_path_pattern: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: constants::BASE_URL.to_string(),
            origin: constants::SITE_ORIGIN.to_string(),
            link_selector: constants::PRIMARY_LINK_SELECTOR.to_string(),
            event_path_pattern: constants::EVENT_PATH_PATTERN.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub headless: bool,
    pub page_timeout_secs: u64,
    pub selector_timeout_secs: u64,
    pub window_width: u32,
    pub window_height: u32,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            page_timeout_secs: 30,
            selector_timeout_secs: 20,
            window_width: 1920,
            window_height: 1080,
        }
    }
}

impl BrowserConfig {
    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    pub fn selector_timeout(&self) -> Duration {
        Duration::from_secs(self.selector_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LinksConfig {
    pub start_page: u32,
    pub end_page: u32,
    pub retries: u32,
    /// Pages wait a random `[delay, delay + jitter]` seconds after loading.
    pub page_delay_secs: f64,
    pub page_delay_jitter_secs: f64,
    pub polite_delay_secs: f64,
    pub retry_backoff_secs: f64,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            start_page: 1,
            end_page: 3,
            retries: 1,
            page_delay_secs: 5.0,
            page_delay_jitter_secs: 3.0,
            polite_delay_secs: 2.0,
            retry_backoff_secs: 2.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetailsConfig {
    pub batch_size: usize,
    pub min_delay_secs: f64,
    pub max_delay_secs: f64,
    pub min_batch_break_secs: f64,
    pub max_batch_break_secs: f64,
    pub scroll_probability: f64,
    pub max_content_chars: usize,
    /// Long break after this many links; 0 disables it.
    pub links_per_session: usize,
    pub min_session_break_mins: f64,
    pub max_session_break_mins: f64,
    /// Minimum minutes between progress report refreshes.
    pub report_interval_mins: f64,
    /// Also treat a repeated event title as a duplicate.
    pub dedup_titles: bool,
}

impl Default for DetailsConfig {
    fn default() -> Self {
        Self {
            batch_size: 3,
            min_delay_secs: 3.0,
            max_delay_secs: 7.0,
            min_batch_break_secs: 15.0,
            max_batch_break_secs: 45.0,
            scroll_probability: 0.3,
            max_content_chars: 24_000,
            links_per_session: 50,
            min_session_break_mins: 30.0,
            max_session_break_mins: 60.0,
            report_interval_mins: 10.0,
            dedup_titles: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: constants::LLM_ENDPOINT.to_string(),
            model: constants::LLM_MODEL.to_string(),
            api_key_env: constants::LLM_API_KEY_ENV.to_string(),
            timeout_secs: 90,
            max_attempts: 3,
            temperature: 0.0,
        }
    }
}

impl DetailsConfig {
    pub fn report_interval(&self) -> Duration {
        Duration::from_secs_f64(self.report_interval_mins.max(0.0) * 60.0)
    }
}

impl LlmConfig {
    /// Reads the provider credential from the environment. Absence is not an
    /// error here; extraction calls fail individually instead.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub links_dir: PathBuf,
    pub details_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub screenshots_dir: PathBuf,
    pub reports_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            links_dir: PathBuf::from(constants::LINKS_DIR),
            details_dir: PathBuf::from(constants::DETAILS_DIR),
            logs_dir: PathBuf::from(constants::LOGS_DIR),
            screenshots_dir: PathBuf::from(constants::SCREENSHOTS_DIR),
            reports_dir: PathBuf::from(constants::REPORTS_DIR),
        }
    }
}

impl Config {
    /// Loads `path` if given (it must exist), otherwise `config.toml` in the
    /// working directory when present, otherwise the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(explicit) => Self::from_file(explicit),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    Self::from_file(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ScraperError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.links.start_page > self.links.end_page {
            return Err(ScraperError::Config(format!(
                "links.start_page ({}) is after links.end_page ({})",
                self.links.start_page, self.links.end_page
            )));
        }
        if self.details.min_delay_secs > self.details.max_delay_secs {
            return Err(ScraperError::Config(
                "details.min_delay_secs must not exceed details.max_delay_secs".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.details.scroll_probability) {
            return Err(ScraperError::Config(
                "details.scroll_probability must be within [0, 1]".into(),
            ));
        }
        Ok(())
    }
}
