//! Notification channel - transient status messages for the user.
//!
//! [`NotificationCenter`] is a cloneable handle created once at startup and
//! passed to every component that reports status (the upload controller and
//! the result viewer). Each pushed [`Notification`] gets a fresh id and is
//! removed automatically after the configured display duration; it can also
//! be dismissed early. Renderers either poll [`NotificationCenter::active`]
//! or follow [`NotificationCenter::subscribe`].
//!
//! # Lifecycle
//!
//! ```ignore
//! let notifications = NotificationCenter::new(Duration::from_secs(3));
//! let id = notifications.success("File uploaded successfully!");
//! notifications.dismiss(id);
//! notifications.shutdown(); // aborts pending timers, clears the list
//! ```

use crate::metrics::Metrics;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Unique notification token, never reused within one center
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotificationId(u64);

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: NotificationId,
    pub message: String,
    pub kind: NotificationKind,
}

/// Change to the active notification list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationEvent {
    Pushed(Notification),
    Dismissed(NotificationId),
}

struct Inner {
    active: Mutex<Vec<Notification>>,
    timers: Mutex<HashMap<NotificationId, JoinHandle<()>>>,
    next_id: AtomicU64,
    closed: AtomicBool,
    display_duration: Duration,
    events_tx: broadcast::Sender<NotificationEvent>,
    metrics: Option<Arc<Metrics>>,
}

impl Inner {
    /// Remove an entry; returns false when it was already gone
    fn remove(&self, id: NotificationId) -> bool {
        let removed = {
            let mut active = self.active.lock();
            match active.iter().position(|n| n.id == id) {
                Some(index) => {
                    active.remove(index);
                    true
                }
                None => false,
            }
        };

        if removed {
            let _ = self.events_tx.send(NotificationEvent::Dismissed(id));
        }
        removed
    }
}

/// Shared handle to the notification list
#[derive(Clone)]
pub struct NotificationCenter {
    inner: Arc<Inner>,
}

impl NotificationCenter {
    /// Initialize a center whose notifications expire after `display_duration`
    pub fn new(display_duration: Duration) -> Self {
        Self::build(display_duration, None)
    }

    /// Same as [`new`](Self::new), counting pushes in `metrics`
    pub fn with_metrics(display_duration: Duration, metrics: Arc<Metrics>) -> Self {
        Self::build(display_duration, Some(metrics))
    }

    fn build(display_duration: Duration, metrics: Option<Arc<Metrics>>) -> Self {
        let (events_tx, _) = broadcast::channel(100);
        tracing::debug!(
            "Notification center initialized (display {}ms)",
            display_duration.as_millis()
        );

        Self {
            inner: Arc::new(Inner {
                active: Mutex::new(Vec::new()),
                timers: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                closed: AtomicBool::new(false),
                display_duration,
                events_tx,
                metrics,
            }),
        }
    }

    pub fn display_duration(&self) -> Duration {
        self.inner.display_duration
    }

    /// Append a notification and schedule its removal.
    ///
    /// Removal is scheduled on the current tokio runtime. Outside a runtime
    /// the notification stays until [`dismiss`](Self::dismiss)ed. After
    /// [`shutdown`](Self::shutdown) pushes are logged and dropped.
    pub fn push(&self, message: impl Into<String>, kind: NotificationKind) -> NotificationId {
        let id = NotificationId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let notification = Notification {
            id,
            message: message.into(),
            kind,
        };

        if self.inner.closed.load(Ordering::Acquire) {
            tracing::warn!(
                "Notification after shutdown dropped: {}",
                notification.message
            );
            return id;
        }

        match kind {
            NotificationKind::Success => tracing::info!("Notify {}: {}", id, notification.message),
            NotificationKind::Error => tracing::warn!("Notify {}: {}", id, notification.message),
        }

        if let Some(metrics) = &self.inner.metrics {
            metrics.record_notification();
        }

        self.inner.active.lock().push(notification.clone());
        let _ = self.inner.events_tx.send(NotificationEvent::Pushed(notification));

        self.schedule_removal(id);
        id
    }

    pub fn success(&self, message: impl Into<String>) -> NotificationId {
        self.push(message, NotificationKind::Success)
    }

    pub fn error(&self, message: impl Into<String>) -> NotificationId {
        self.push(message, NotificationKind::Error)
    }

    fn schedule_removal(&self, id: NotificationId) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("No runtime for notification {}, kept until dismissed", id);
            return;
        };

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let delay = self.inner.display_duration;

        // Held across spawn so the timer's own cleanup can't run before insert
        let mut timers = self.inner.timers.lock();
        let task = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                inner.timers.lock().remove(&id);
                inner.remove(id);
            }
        });
        timers.insert(id, task);
    }

    /// Remove a notification early. Dismissing an unknown or expired id is a no-op.
    pub fn dismiss(&self, id: NotificationId) -> bool {
        if let Some(timer) = self.inner.timers.lock().remove(&id) {
            timer.abort();
        }
        self.inner.remove(id)
    }

    /// Snapshot of the visible notifications, oldest first
    pub fn active(&self) -> Vec<Notification> {
        self.inner.active.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.active.lock().is_empty()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.inner.events_tx.subscribe()
    }

    /// Tear down: abort pending timers, clear the list, refuse further pushes
    pub fn shutdown(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        for (_, timer) in self.inner.timers.lock().drain() {
            timer.abort();
        }

        let cleared: Vec<Notification> = std::mem::take(&mut *self.inner.active.lock());
        for notification in &cleared {
            let _ = self
                .inner
                .events_tx
                .send(NotificationEvent::Dismissed(notification.id));
        }

        tracing::debug!(
            "Notification center shut down ({} cleared)",
            cleared.len()
        );
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }
}

impl fmt::Debug for NotificationCenter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationCenter")
            .field("active", &self.inner.active.lock().len())
            .field("display_duration", &self.inner.display_duration)
            .finish()
    }
}
