// Upload Controller - drives the upload/processing/result workflow
//
// This module contains the UploadController which coordinates between:
// - WorkflowStore (workflow state, the only thing it writes)
// - DetectionClient (the remote detection service)
// - NotificationCenter (user-facing status messages)
//
// It handles:
// - Validating file selections
// - Issuing one detection request per submit as a generation-tagged task
// - Applying or discarding responses depending on whether the session moved on

use crate::metrics::Metrics;
use crate::models::{SelectedFile, UploadState};
use crate::notifications::NotificationCenter;
use crate::services::{DetectionClient, DetectionError};
use crate::state::{Completion, StateChange, WorkflowState, WorkflowStore};
use camino::Utf8Path;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

pub const MSG_FILE_ACCEPTED: &str = "File uploaded successfully!";
pub const MSG_INVALID_FILE: &str = "Please upload a valid image file";
pub const MSG_BUSY: &str = "Please wait for the current floorplan to finish processing";
pub const MSG_UNREADABLE_FILE: &str = "Could not read the selected file";
pub const MSG_PROCESSED: &str = "Floorplan processed successfully!";
pub const MSG_PROCESSING_FAILED: &str = "Failed to process floorplan. Please try again.";
pub const MSG_SERVICE_UP: &str = "Detection service is reachable";
pub const MSG_SERVICE_DOWN: &str = "Detection service is unavailable";

/// Reasons a file selection is rejected. State is unchanged in every case.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("{name} is not an image (content type {content_type:?})")]
    InvalidFileType { name: String, content_type: String },

    #[error("A floorplan is already being processed")]
    Busy,

    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Upload workflow controller
///
/// Owns the state machine `Idle → FileSelected → Processing → Completed | Failed`
/// (with `reset()` back to `Idle` from anywhere). Cloning is cheap and all
/// clones drive the same workflow.
///
/// # Example
/// ```ignore
/// let controller = UploadController::new(store, client, notifications, metrics);
///
/// controller.select_file(SelectedFile::new("floorplan.png", "image/png", bytes))?;
/// if let Some(request) = controller.submit() {
///     request.await?;
/// }
/// let state = controller.snapshot();
/// ```
#[derive(Clone)]
pub struct UploadController {
    store: WorkflowStore,
    client: Arc<dyn DetectionClient>,
    notifications: NotificationCenter,
    metrics: Arc<Metrics>,
}

impl UploadController {
    pub fn new(
        store: WorkflowStore,
        client: Arc<dyn DetectionClient>,
        notifications: NotificationCenter,
        metrics: Arc<Metrics>,
    ) -> Self {
        tracing::info!("Upload controller initialized");
        Self {
            store,
            client,
            notifications,
            metrics,
        }
    }

    /// Hold `candidate` as the file to analyze.
    ///
    /// Allowed in every phase except `Processing`. Replaces any earlier
    /// selection and drops any held result.
    pub fn select_file(&self, candidate: SelectedFile) -> Result<(), UploadError> {
        if !candidate.is_image() {
            tracing::warn!(
                "Rejected {}: content type {:?} is not an image",
                candidate.name(),
                candidate.content_type()
            );
            self.metrics.record_selection_rejected();
            self.notifications.error(MSG_INVALID_FILE);
            return Err(UploadError::InvalidFileType {
                name: candidate.name().to_string(),
                content_type: candidate.content_type().to_string(),
            });
        }

        let name = candidate.name().to_string();
        let size_mb = candidate.size_mb();
        let (accepted, _) = self.store.select(candidate);

        if !accepted {
            tracing::warn!("Rejected {} while a request is in flight", name);
            self.metrics.record_selection_rejected();
            self.notifications.error(MSG_BUSY);
            return Err(UploadError::Busy);
        }

        tracing::info!("Selected {} ({:.2} MB)", name, size_mb);
        self.metrics.record_file_selected();
        self.notifications.success(MSG_FILE_ACCEPTED);
        Ok(())
    }

    /// Read `path` from disk and select it
    pub async fn select_path(&self, path: &Utf8Path) -> Result<(), UploadError> {
        match SelectedFile::from_path(path).await {
            Ok(file) => self.select_file(file),
            Err(source) => {
                tracing::error!("Failed to read {}: {}", path, source);
                self.metrics.record_selection_rejected();
                self.notifications.error(MSG_UNREADABLE_FILE);
                Err(UploadError::Read {
                    path: path.to_string(),
                    source,
                })
            }
        }
    }

    /// Send the held file to the detection service.
    ///
    /// Returns the request task, or `None` when there is nothing to send:
    /// no file held, a request already in flight, or the result already in.
    /// Must be called from within a tokio runtime.
    pub fn submit(&self) -> Option<JoinHandle<()>> {
        let (started, _) = self.store.begin_processing();

        let Some((generation, file)) = started else {
            tracing::debug!(
                "Submit ignored in phase {} (file held: {})",
                self.store.phase(),
                self.store.read(|s| s.selected_file.is_some())
            );
            return None;
        };

        tracing::info!(
            "Submitting {} ({} bytes), generation {}",
            file.name(),
            file.size(),
            generation
        );
        self.metrics.record_request_issued();

        let controller = self.clone();
        Some(tokio::spawn(async move {
            let started_at = Instant::now();

            // The request runs in its own task so a panicking client still
            // settles this generation instead of leaving it in Processing
            let client = controller.client.clone();
            let request = tokio::spawn(async move { client.detect(&file).await });
            let outcome = request.await.unwrap_or_else(|e| {
                tracing::error!("Detection task for generation {} ended: {}", generation, e);
                Err(DetectionError::Aborted(e.to_string()))
            });

            controller.metrics.record_request_time(started_at.elapsed());
            controller.apply_outcome(generation, outcome);
        }))
    }

    /// Apply a finished request, unless the session has moved on since it was issued
    fn apply_outcome(
        &self,
        generation: u64,
        outcome: Result<crate::models::DetectionResult, DetectionError>,
    ) {
        match outcome {
            Ok(result) => {
                let id = result.id.clone();
                let total = result.elements.total();
                match self.store.complete(generation, result) {
                    Completion::Applied(_) => {
                        tracing::info!("Detection {} complete: {} elements", id, total);
                        self.metrics.record_request_completed();
                        self.notifications.success(MSG_PROCESSED);
                    }
                    Completion::Stale { request, current } => {
                        self.discard_stale(request, current);
                    }
                }
            }
            Err(error) => {
                match self.store.fail(generation, error.to_string()) {
                    Completion::Applied(_) => {
                        tracing::error!("Detection failed: {}", error);
                        self.metrics.record_request_failed();
                        self.notifications.error(MSG_PROCESSING_FAILED);
                    }
                    Completion::Stale { request, current } => {
                        tracing::debug!("Stale failure was: {}", error);
                        self.discard_stale(request, current);
                    }
                }
            }
        }
    }

    fn discard_stale(&self, request: u64, current: u64) {
        tracing::debug!(
            "Discarding response for generation {} (current {})",
            request,
            current
        );
        self.metrics.record_stale_response();
    }

    /// Return to `Idle` from any phase.
    ///
    /// An in-flight request keeps running but its response is discarded.
    pub fn reset(&self) {
        let was = self.store.phase();
        self.store.reset();
        if was == UploadState::Processing {
            tracing::info!("Reset while processing; pending response will be ignored");
        } else {
            tracing::debug!("Reset from {}", was);
        }
    }

    /// Check the detection service and report the outcome to the user
    pub async fn check_service(&self) -> Result<(), DetectionError> {
        match self.client.health_check().await {
            Ok(()) => {
                self.notifications.success(MSG_SERVICE_UP);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Health check failed: {}", e);
                self.notifications.error(MSG_SERVICE_DOWN);
                Err(e)
            }
        }
    }

    /// Current phase, file, result and diagnostics
    pub fn snapshot(&self) -> WorkflowState {
        self.store.snapshot()
    }

    pub fn phase(&self) -> UploadState {
        self.store.phase()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.store.subscribe()
    }

    pub fn store(&self) -> &WorkflowStore {
        &self.store
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }
}
