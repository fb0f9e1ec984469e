//! Data models for planscan.
//!
//! - [`DetectionResult`]: the detection service's response body, with the
//!   derived views the result viewer needs (counts, mean confidence, ranking)
//! - [`UploadState`] and [`SelectedFile`]: the workflow phase and the image it holds
//! - [`ClientConfig`]: service endpoint, notification, export, clipboard and
//!   logging settings loaded from `planscan.yaml`

pub mod config;
pub mod detection;
pub mod upload;

pub use config::{
    ClientConfig, ClipboardConfig, ExportConfig, LoggingConfig, NotificationConfig, ServiceConfig,
};
pub use detection::{
    CategoryCounts, CategorySummary, DetectedElement, DetectedElements, DetectionResult,
    ElementCategory, RankedElement, ResultValidationError,
};
pub use upload::{SelectedFile, UploadState};
