pub mod time;

pub use time::{current_human_timestamp, notification_timestamp, snapshot_timestamp_slug};
