//! User-facing notifications
//!
//! The pipeline only knows the [`Notifier`] capability. How a message reaches
//! the user (toast, OS notification, log line) is up to the implementation.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;

/// Kind of notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A price alert fired
    Alert,
    /// Informational, non-blocking notice such as "showing cached data"
    Notice,
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Notification sink injected into the pipeline.
///
/// Implementations must not call back into the alert engine.
pub trait Notifier: Send + Sync {
    /// Deliver an alert notification
    fn notify(&self, message: &str);

    /// Deliver an informational notice
    fn notice(&self, message: &str) {
        self.notify(message);
    }
}

/// Writes notifications to the log
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, message: &str) {
        tracing::info!(target: "coinwatch::notify", "ALERT: {}", message);
    }

    fn notice(&self, message: &str) {
        tracing::info!(target: "coinwatch::notify", "{}", message);
    }
}

/// Keeps the most recent notifications for consumers that poll
pub struct NotificationLog {
    capacity: usize,
    entries: Mutex<VecDeque<Notification>>,
}

impl NotificationLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
        }
    }

    fn push(&self, kind: NotificationKind, message: &str) {
        let mut entries = self.entries.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(Notification {
            kind,
            message: message.to_string(),
            at: Utc::now(),
        });
    }

    /// Newest first
    pub fn recent(&self) -> Vec<Notification> {
        self.entries.lock().iter().rev().cloned().collect()
    }
}

impl Notifier for NotificationLog {
    fn notify(&self, message: &str) {
        TracingNotifier.notify(message);
        self.push(NotificationKind::Alert, message);
    }

    fn notice(&self, message: &str) {
        TracingNotifier.notice(message);
        self.push(NotificationKind::Notice, message);
    }
}
