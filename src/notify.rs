use std::fmt;
use std::sync::{Arc, Mutex};
use std::thread;

use chrono::{DateTime, Local};

use crate::error::AppError;
use crate::utils::notification_timestamp;

/// One appended line of the notification channel.
#[derive(Debug, Clone)]
pub struct Notification {
    pub at: DateTime<Local>,
    pub tag: String,
    pub message: String,
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}: {}",
            notification_timestamp(&self.at),
            self.tag,
            self.message
        )
    }
}

/// Append-only, thread-safe textual channel used to surface info and
/// failures from dispatcher and fetch tasks. Entries are ordered by delivery
/// time and tagged with the originating thread; everything is mirrored to the
/// `log` facade.
#[derive(Clone, Default)]
pub struct Notifier {
    entries: Arc<Mutex<Vec<Notification>>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info<T: Into<String>>(&self, message: T) {
        let message = message.into();
        log::info!("{}", message);
        self.push(message);
    }

    pub fn error<T: Into<String>>(&self, message: T, err: &AppError) {
        let message = format!("{}: {}", message.into(), err);
        log::error!("{}", message);
        self.push(message);
    }

    fn push(&self, message: String) {
        let entry = Notification {
            at: Local::now(),
            tag: thread_tag(),
            message,
        };
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.push(entry);
    }

    /// Snapshot of everything appended so far, in delivery order.
    pub fn entries(&self) -> Vec<Notification> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

fn thread_tag() -> String {
    let current = thread::current();
    match current.name() {
        Some(name) => name.to_string(),
        None => format!("{:?}", current.id()),
    }
}
