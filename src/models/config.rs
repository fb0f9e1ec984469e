use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Client configuration from planscan.yaml
///
/// Every section and field has a default, so a partial file (or none at all)
/// is valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub service: ServiceConfig,
    pub notifications: NotificationConfig,
    pub export: ExportConfig,
    pub clipboard: ClipboardConfig,
    pub logging: LoggingConfig,
}

/// Where and how to reach the detection service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub base_url: String,
    pub detect_path: String,
    pub health_path: String,
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            detect_path: "/api/floorplan/detect".to_string(),
            health_path: "/health".to_string(),
            timeout_secs: 120,
        }
    }
}

impl ServiceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// How long each notification stays visible
    pub display_duration_ms: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            display_duration_ms: 3000,
        }
    }
}

impl NotificationConfig {
    pub fn display_duration(&self) -> Duration {
        Duration::from_millis(self.display_duration_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub output_dir: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: ".".to_string(),
        }
    }
}

/// External command that receives clipboard text on stdin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipboardConfig {
    pub command: Vec<String>,
}

impl Default for ClipboardConfig {
    fn default() -> Self {
        let command: &[&str] = if cfg!(target_os = "macos") {
            &["pbcopy"]
        } else if cfg!(target_os = "windows") {
            &["clip"]
        } else {
            &["xclip", "-selection", "clipboard"]
        };

        Self {
            command: command.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: String,
    pub prefix: String,
    pub debug: bool,
    pub console: bool,
    /// One JSON object per line in the log file instead of plain text
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: "logs".to_string(),
            prefix: "planscan".to_string(),
            debug: false,
            console: true,
            json: false,
        }
    }
}
