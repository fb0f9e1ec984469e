// planscan - floorplan detection client
//
// This is the library crate containing the upload workflow, the detection
// result model and the services it talks to. The binary crate (main.rs)
// drives one upload session from the command line.

pub mod config;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod notifications;
pub mod services;
pub mod state;
pub mod ui;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use metrics::Metrics;
pub use models::{ClientConfig, DetectionResult, ElementCategory, SelectedFile, UploadState};
pub use notifications::{Notification, NotificationCenter, NotificationKind};
pub use state::{StateChange, WorkflowState, WorkflowStore};
pub use ui::{ResultViewer, UploadController};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
