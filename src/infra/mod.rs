pub mod browser;
pub mod checkpoint;
pub mod csv_store;
pub mod files;
pub mod llm_client;
pub mod report;
pub mod run_state;
