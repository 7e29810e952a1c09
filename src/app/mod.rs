pub mod ports;
pub mod collect_links_use_case;
pub mod extract_details_use_case;
pub mod batch_orchestrator;
