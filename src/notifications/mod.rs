use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use tracing::{error, info};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::EntityKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationLevel {
    Success,
    Error,
    Info,
}

/// A toast shown to the operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub level: NotificationLevel,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            level,
            message: message.into(),
            created_at: Utc::now(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Success, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Info, message)
    }

    /// "Error, <message>" toast for a failed operation.
    pub fn failure(err: &ServiceError) -> Self {
        Self::new(NotificationLevel::Error, messages::error(&err.user_message()))
    }
}

/// Toast texts used across the back-office screens.
pub mod messages {
    use super::EntityKind;

    pub fn added(kind: EntityKind) -> String {
        format!("Success, {} has been added.", kind.label())
    }

    pub fn updated(kind: EntityKind) -> String {
        format!("Success, {} has been updated.", kind.label())
    }

    pub fn deleted(kind: EntityKind) -> String {
        format!("{} deleted successfully.", kind.label())
    }

    pub fn status_changed() -> String {
        "Status successfully changed".to_string()
    }

    pub fn error(message: &str) -> String {
        format!("Error, {}", message)
    }
}

/// Sink for operator-facing notifications.
#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Keeps the most recent notifications and mirrors them to the log.
#[derive(Debug)]
pub struct NotificationCenter {
    capacity: usize,
    entries: Mutex<VecDeque<Notification>>,
}

impl NotificationCenter {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    fn entries(&self) -> MutexGuard<'_, VecDeque<Notification>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Oldest first.
    pub fn recent(&self) -> Vec<Notification> {
        self.entries().iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<Notification> {
        self.entries().back().cloned()
    }

    pub fn dismiss(&self, id: Uuid) -> bool {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|n| n.id != id);
        entries.len() != before
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new(20)
    }
}

impl Notifier for NotificationCenter {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Error => error!(id = %notification.id, "{}", notification.message),
            _ => info!(id = %notification.id, "{}", notification.message),
        }
        let mut entries = self.entries();
        entries.push_back(notification);
        while entries.len() > self.capacity {
            entries.pop_front();
        }
    }
}
