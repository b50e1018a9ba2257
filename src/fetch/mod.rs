pub mod client;
pub mod task;

pub use client::{HttpMarketData, MarketDataSource};
pub use task::FetchTask;

/// Fallback cap on a single fetch task when config does not say otherwise.
pub const DEFAULT_TASK_TIMEOUT_SECS: u64 = 30;
