// HTML and model-output parsing. Everything here is pure: no I/O, no browser.

pub mod extraction;
pub mod links;
pub mod page_text;

pub use extraction::{clean_model_output, parse_extraction};
pub use links::{extract_links, has_no_results, page_url, LinkSelectors, LinkStrategy, PageLinks};
pub use page_text::page_text;
