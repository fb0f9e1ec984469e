// Workflow metrics
//
// Lightweight counters for what happened during a session, logged on shutdown

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Session counters
///
/// Uses atomic operations so the controller, its request tasks and the viewer
/// can share one instance behind an `Arc` without locking.
#[derive(Debug)]
pub struct Metrics {
    /// Files accepted by `select_file`
    pub files_selected: AtomicU64,

    /// Selections rejected (wrong type, busy, unreadable)
    pub selections_rejected: AtomicU64,

    /// Detection requests sent
    pub requests_issued: AtomicU64,

    /// Requests that produced a result
    pub requests_completed: AtomicU64,

    /// Requests that failed (transport, status or body)
    pub requests_failed: AtomicU64,

    /// Responses dropped because the session moved on
    pub stale_responses: AtomicU64,

    /// Total time spent waiting on the detection service in milliseconds
    pub total_request_time_ms: AtomicU64,

    /// Notifications pushed
    pub notifications: AtomicU64,

    /// Result files written
    pub exports: AtomicU64,

    /// Successful clipboard copies
    pub clipboard_copies: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            files_selected: AtomicU64::new(0),
            selections_rejected: AtomicU64::new(0),
            requests_issued: AtomicU64::new(0),
            requests_completed: AtomicU64::new(0),
            requests_failed: AtomicU64::new(0),
            stale_responses: AtomicU64::new(0),
            total_request_time_ms: AtomicU64::new(0),
            notifications: AtomicU64::new(0),
            exports: AtomicU64::new(0),
            clipboard_copies: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_file_selected(&self) {
        self.files_selected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_selection_rejected(&self) {
        self.selections_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_request_issued(&self) {
        self.requests_issued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_request_completed(&self) {
        self.requests_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_request_failed(&self) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale_response(&self) {
        self.stale_responses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_request_time(&self, duration: Duration) {
        self.total_request_time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn record_notification(&self) {
        self.notifications.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_export(&self) {
        self.exports.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_clipboard_copy(&self) {
        self.clipboard_copies.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Average detection round trip in milliseconds over finished requests
    pub fn avg_request_time_ms(&self) -> f64 {
        let total = self.total_request_time_ms.load(Ordering::Relaxed);
        let count = self.requests_completed.load(Ordering::Relaxed)
            + self.requests_failed.load(Ordering::Relaxed);
        if count > 0 {
            total as f64 / count as f64
        } else {
            0.0
        }
    }

    pub fn log_summary(&self) {
        tracing::info!("=== Session Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Files: {} selected, {} rejected",
            self.files_selected.load(Ordering::Relaxed),
            self.selections_rejected.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Requests: {} issued, {} completed, {} failed, {} stale (avg {:.0}ms)",
            self.requests_issued.load(Ordering::Relaxed),
            self.requests_completed.load(Ordering::Relaxed),
            self.requests_failed.load(Ordering::Relaxed),
            self.stale_responses.load(Ordering::Relaxed),
            self.avg_request_time_ms()
        );
        tracing::info!(
            "Notifications: {}, exports: {}, clipboard copies: {}",
            self.notifications.load(Ordering::Relaxed),
            self.exports.load(Ordering::Relaxed),
            self.clipboard_copies.load(Ordering::Relaxed)
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
