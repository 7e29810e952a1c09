//! Site, schema and file-layout constants shared by both scraping phases.

// Search results for stand-up comedy in Ontario
pub const BASE_URL: &str = "https://www.eventbrite.ca/d/canada--ontario/stand-up-comedy/";
pub const SITE_ORIGIN: &str = "https://www.eventbrite.ca";

// Event cards on search result pages
pub const PRIMARY_LINK_SELECTOR: &str = "a.eds-event-card-content__action-link";
// Any anchor whose resolved URL contains this is treated as an event page
pub const EVENT_PATH_PATTERN: &str = "eventbrite.ca/e/";

pub const NO_RESULTS_MARKERS: &[&str] = &[
    "No Results Found",
    "No events found",
    "We couldn't find any events",
    "Sorry, no events matched your search",
];

/// Column holding event links in every CSV this crate reads or writes.
pub const LINK_COLUMN: &str = "event_link";

/// Fields a record must carry, non-empty, to be persisted. Also the column
/// order of the detail CSV.
pub const REQUIRED_KEYS: &[&str] = &[
    "title",
    "venue",
    "summary",
    "address",
    "email",
    "city",
    "province",
    "producers",
    "event_link",
    "date",
];

pub const OPTIONAL_KEYS: &[&str] = &["price", "capacity", "duration", "performers", "age_restriction"];

// Output layout
pub const LINKS_DIR: &str = "Collected_Data/Discovered_Event_Websites";
pub const DETAILS_DIR: &str = "Collected_Data/Complete_Event_Descriptions";
pub const LOGS_DIR: &str = "Logs";
pub const SCREENSHOTS_DIR: &str = "Logs/Screenshots";
pub const REPORTS_DIR: &str = "Reports";

pub const LINKS_FILE_PREFIX: &str = "event_links";
pub const DETAILS_FILE_PREFIX: &str = "detailed_events";
pub const RUN_STATE_FILE: &str = "run_state.json";
pub const CSV_SUFFIX: &str = ".csv";

// LLM provider (OpenAI-compatible chat completions)
pub const LLM_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const LLM_MODEL: &str = "deepseek-r1-distill-llama-70b";
pub const LLM_API_KEY_ENV: &str = "GROQ_API_KEY";

pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.1.1 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:89.0) Gecko/20100101 Firefox/89.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/92.0.4515.107 Safari/537.36",
];

pub const BROWSER_ARGS: &[&str] = &[
    "--disable-blink-features=AutomationControlled",
    "--disable-extensions",
    "--disable-dev-shm-usage",
    "--disable-features=IsolateOrigins,site-per-process",
];
