use chrono::{DateTime, Local};

pub fn notification_timestamp(at: &DateTime<Local>) -> String {
    at.format("%m/%d/%Y %H:%M:%S").to_string()
}

pub fn current_human_timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M").to_string()
}

pub fn snapshot_timestamp_slug() -> String {
    Local::now().format("%Y_%m_%d_%H_%M").to_string()
}
