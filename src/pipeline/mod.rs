// Building blocks shared by the link and detail phases

pub mod batching;
pub mod pacing;
pub mod retry;

pub use batching::{batch_count, dedup_links, partition, select_window};
pub use pacing::DelayRange;
pub use retry::RetryPolicy;
