// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transient user notifications.
//!
//! Each notification with a non-zero timeout gets its own timer task that
//! removes it when the timeout elapses. A zero timeout keeps it until
//! [`NotificationCenter::remove`] is called.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Timeout used by the convenience constructors.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
    Warning,
    Info,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NotificationKind::Success => "success",
            NotificationKind::Error => "error",
            NotificationKind::Warning => "warning",
            NotificationKind::Info => "info",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: String,
    pub kind: NotificationKind,
    pub message: String,
    /// Zero means the notification stays until removed.
    pub timeout: Duration,
}

struct Entry {
    notification: Notification,
    timer: Option<JoinHandle<()>>,
}

#[derive(Default)]
struct Inner {
    entries: Mutex<Vec<Entry>>,
}

impl Inner {
    fn entries(&self) -> MutexGuard<'_, Vec<Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take(&self, id: &str) -> Option<Entry> {
        let mut entries = self.entries();
        let index = entries.iter().position(|e| e.notification.id == id)?;
        Some(entries.remove(index))
    }
}

/// Shared list of active notifications. Clones share the same list.
#[derive(Clone, Default)]
pub struct NotificationCenter {
    inner: Arc<Inner>,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a notification and return its id.
    ///
    /// Auto-dismissal needs a tokio runtime. Outside one the notification
    /// is kept until removed.
    pub fn add(&self, kind: NotificationKind, message: impl Into<String>, timeout: Duration) -> String {
        let notification = Notification {
            id: uuid::Uuid::new_v4().simple().to_string(),
            kind,
            message: message.into(),
            timeout,
        };
        let id = notification.id.clone();
        debug!(id = %id, kind = %kind, message = %notification.message, "notification added");

        let mut entries = self.inner.entries();
        let timer = if timeout.is_zero() {
            None
        } else {
            self.schedule_expiry(&id, timeout)
        };
        entries.push(Entry { notification, timer });
        id
    }

    pub fn success(&self, message: impl Into<String>) -> String {
        self.add(NotificationKind::Success, message, DEFAULT_TIMEOUT)
    }

    pub fn error(&self, message: impl Into<String>) -> String {
        self.add(NotificationKind::Error, message, DEFAULT_TIMEOUT)
    }

    pub fn warning(&self, message: impl Into<String>) -> String {
        self.add(NotificationKind::Warning, message, DEFAULT_TIMEOUT)
    }

    pub fn info(&self, message: impl Into<String>) -> String {
        self.add(NotificationKind::Info, message, DEFAULT_TIMEOUT)
    }

    pub fn success_with_timeout(&self, message: impl Into<String>, timeout: Duration) -> String {
        self.add(NotificationKind::Success, message, timeout)
    }

    pub fn error_with_timeout(&self, message: impl Into<String>, timeout: Duration) -> String {
        self.add(NotificationKind::Error, message, timeout)
    }

    pub fn warning_with_timeout(&self, message: impl Into<String>, timeout: Duration) -> String {
        self.add(NotificationKind::Warning, message, timeout)
    }

    pub fn info_with_timeout(&self, message: impl Into<String>, timeout: Duration) -> String {
        self.add(NotificationKind::Info, message, timeout)
    }

    /// Dismiss a notification early. Unknown ids are ignored.
    pub fn remove(&self, id: &str) -> bool {
        match self.inner.take(id) {
            Some(entry) => {
                if let Some(timer) = entry.timer {
                    timer.abort();
                }
                true
            }
            None => false,
        }
    }

    /// Active notifications, oldest first.
    pub fn list(&self) -> Vec<Notification> {
        self.inner
            .entries()
            .iter()
            .map(|e| e.notification.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries().is_empty()
    }

    /// Remove and return every active notification.
    pub fn drain(&self) -> Vec<Notification> {
        self.inner
            .entries()
            .drain(..)
            .map(|entry| {
                if let Some(timer) = entry.timer {
                    timer.abort();
                }
                entry.notification
            })
            .collect()
    }

    fn schedule_expiry(&self, id: &str, timeout: Duration) -> Option<JoinHandle<()>> {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(id, "no tokio runtime; notification will not auto-dismiss");
            return None;
        };

        // The deadline is taken now, not when the task first runs.
        let deadline = Instant::now() + timeout;
        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        let id = id.to_string();

        Some(runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if let Some(inner) = inner.upgrade() {
                if inner.take(&id).is_some() {
                    debug!(id = %id, "notification expired");
                }
            }
        }))
    }
}
