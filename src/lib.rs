pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod parser;
pub mod pipeline;
pub mod types;
pub mod validation;

// Use cases and the ports they depend on
pub mod app;
// Adapters behind the ports: browser, LLM, files
pub mod infra;

pub mod phases;
