use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Input not found: {0}")]
    InputNotFound(String),

    #[error("No links found: {0}")]
    NoLinks(String),

    #[error("Environment variable error: {0}")]
    Env(#[from] std::env::VarError),
}

impl ScraperError {
    /// Whether retrying the same call could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ScraperError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            ScraperError::Api { status, .. } => *status == 429 || *status >= 500,
            ScraperError::Browser(_) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScraperError>;
