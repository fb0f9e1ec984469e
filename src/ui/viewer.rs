//! Result viewer - read-only presentation of the current detection result.
//!
//! The viewer holds no result of its own; every view is computed from what
//! the [`WorkflowStore`] holds at the time of the call, so it always reflects
//! the latest completed upload (or shows nothing once the workflow is reset).
//! Its only own state is whether the detail panel is open.

use crate::metrics::Metrics;
use crate::models::{
    CategoryCounts, CategorySummary, DetectedElement, DetectionResult, ElementCategory,
};
use crate::notifications::NotificationCenter;
use crate::services::{Clipboard, ClipboardError, DetectionClient, DetectionError};
use crate::state::WorkflowStore;
use camino::{Utf8Path, Utf8PathBuf};
use std::sync::Arc;
use thiserror::Error;

pub const MSG_COPIED: &str = "Copied to clipboard!";
pub const MSG_COPY_FAILED: &str = "Failed to copy to clipboard";
pub const MSG_EXPORT_FAILED: &str = "Failed to export results";
pub const MSG_DOWNLOAD_FAILED: &str = "Failed to download the annotated image";
pub const MSG_NO_RESULT: &str = "No detection results to export yet";

#[derive(Error, Debug)]
pub enum ViewerError {
    #[error("No detection result available")]
    NoResult,

    #[error("Failed to serialize result: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Refusing to write server-supplied file name {name:?}")]
    UnsafeFileName { name: String },

    #[error(transparent)]
    Clipboard(#[from] ClipboardError),

    #[error(transparent)]
    Download(#[from] DetectionError),
}

/// One row of the merged, ranked element list
#[derive(Debug, Clone, PartialEq)]
pub struct RankedRow {
    pub category: ElementCategory,
    pub element: DetectedElement,
}

/// Format a confidence in `[0, 1]` as a percentage with one decimal
pub fn confidence_percent(confidence: f64) -> String {
    format!("{:.1}%", confidence * 100.0)
}

pub struct ResultViewer {
    store: WorkflowStore,
    notifications: NotificationCenter,
    clipboard: Arc<dyn Clipboard>,
    client: Arc<dyn DetectionClient>,
    metrics: Arc<Metrics>,
    details_visible: bool,
}

impl ResultViewer {
    pub fn new(
        store: WorkflowStore,
        notifications: NotificationCenter,
        clipboard: Arc<dyn Clipboard>,
        client: Arc<dyn DetectionClient>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            store,
            notifications,
            clipboard,
            client,
            metrics,
            details_visible: false,
        }
    }

    /// The result currently held by the workflow
    pub fn result(&self) -> Option<Arc<DetectionResult>> {
        self.store.result()
    }

    pub fn has_result(&self) -> bool {
        self.store.read(|s| s.result.is_some())
    }

    /// Element counts; all zero when there is no result
    pub fn counts(&self) -> CategoryCounts {
        self.result()
            .map(|r| CategoryCounts::from(r.as_ref()))
            .unwrap_or_default()
    }

    /// Mean confidence of one category; `0.0` when empty or without a result
    pub fn mean_confidence(&self, category: ElementCategory) -> f64 {
        self.result()
            .map(|r| r.mean_confidence(category))
            .unwrap_or(0.0)
    }

    /// Count and mean for walls, windows and doors, in that order
    pub fn summaries(&self) -> Vec<CategorySummary> {
        let Some(result) = self.result() else {
            return Vec::new();
        };

        ElementCategory::ALL
            .iter()
            .map(|&category| CategorySummary {
                category,
                count: result.count(category),
                mean_confidence: result.mean_confidence(category),
            })
            .collect()
    }

    /// All elements, highest confidence first, ties in walls → windows → doors order
    pub fn ranked_elements(&self) -> Vec<RankedRow> {
        let Some(result) = self.result() else {
            return Vec::new();
        };

        result
            .ranked()
            .into_iter()
            .map(|ranked| RankedRow {
                category: ranked.category,
                element: ranked.element.clone(),
            })
            .collect()
    }

    // Detail panel toggle

    pub fn details_visible(&self) -> bool {
        self.details_visible && self.has_result()
    }

    pub fn show_details(&mut self) {
        self.details_visible = true;
    }

    pub fn hide_details(&mut self) {
        self.details_visible = false;
    }

    pub fn toggle_details(&mut self) -> bool {
        self.details_visible = !self.details_visible;
        self.details_visible()
    }

    /// Pretty-printed JSON of the full result
    pub fn export_json(&self) -> Result<String, ViewerError> {
        let result = self.result().ok_or(ViewerError::NoResult)?;
        Ok(result.to_pretty_json()?)
    }

    /// `{filename}_results.json`, or `None` without a result
    pub fn export_file_name(&self) -> Option<String> {
        self.result().map(|r| r.export_file_name())
    }

    /// Write the result JSON into `dir` and report the outcome
    pub async fn export_to(&self, dir: &Utf8Path) -> Result<Utf8PathBuf, ViewerError> {
        match self.write_export(dir).await {
            Ok(path) => {
                tracing::info!("Exported results to {}", path);
                self.metrics.record_export();
                self.notifications
                    .success(format!("Results exported to {}", path));
                Ok(path)
            }
            Err(e) => {
                tracing::error!("Export failed: {}", e);
                self.report_failure(&e, MSG_EXPORT_FAILED);
                Err(e)
            }
        }
    }

    async fn write_export(&self, dir: &Utf8Path) -> Result<Utf8PathBuf, ViewerError> {
        let result = self.result().ok_or(ViewerError::NoResult)?;
        let path = output_path(dir, &result.filename, result.export_file_name())?;
        let json = result.to_pretty_json()?;

        write_file(&path, json.as_bytes()).await?;
        Ok(path)
    }

    /// Copy the result JSON to the clipboard.
    ///
    /// Failures (no result, missing tool, permission) are reported as an
    /// error notification; workflow state is never touched.
    pub async fn copy_to_clipboard(&self) -> Result<(), ViewerError> {
        let outcome = match self.export_json() {
            Ok(json) => self
                .clipboard
                .set_text(&json)
                .await
                .map_err(ViewerError::from),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => {
                self.metrics.record_clipboard_copy();
                self.notifications.success(MSG_COPIED);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Clipboard copy failed: {}", e);
                self.report_failure(&e, MSG_COPY_FAILED);
                Err(e)
            }
        }
    }

    /// Download the server-rendered annotated image into `dir` as
    /// `{filename}_detected.jpg`
    pub async fn download_annotated_image(&self, dir: &Utf8Path) -> Result<Utf8PathBuf, ViewerError> {
        let outcome = async {
            let result = self.result().ok_or(ViewerError::NoResult)?;
            let path = output_path(dir, &result.filename, result.annotated_image_file_name())?;
            let bytes = self.client.fetch_annotated_image(&result.image_url).await?;
            write_file(&path, &bytes).await?;
            Ok::<_, ViewerError>(path)
        }
        .await;

        match outcome {
            Ok(path) => {
                tracing::info!("Saved annotated image to {}", path);
                self.notifications
                    .success(format!("Annotated image saved to {}", path));
                Ok(path)
            }
            Err(e) => {
                tracing::error!("Annotated image download failed: {}", e);
                self.report_failure(&e, MSG_DOWNLOAD_FAILED);
                Err(e)
            }
        }
    }

    fn report_failure(&self, error: &ViewerError, message: &str) {
        match error {
            ViewerError::NoResult => self.notifications.error(MSG_NO_RESULT),
            _ => self.notifications.error(message),
        };
    }
}

/// Join a name derived from the server's `filename` onto `dir`.
///
/// The server echoes back whatever name the upload carried, so it must stay a
/// single plain component inside `dir`.
fn output_path(dir: &Utf8Path, filename: &str, derived: String) -> Result<Utf8PathBuf, ViewerError> {
    let plain = |name: &str| {
        !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\'])
            && Utf8Path::new(name).file_name() == Some(name)
    };

    if !plain(filename) || !plain(&derived) {
        return Err(ViewerError::UnsafeFileName {
            name: filename.to_string(),
        });
    }
    Ok(dir.join(derived))
}

async fn write_file(path: &Utf8Path, contents: &[u8]) -> Result<(), ViewerError> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|source| ViewerError::Io {
            path: path.to_path_buf(),
            source,
        })
}
