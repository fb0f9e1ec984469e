//! HTTP client for the floorplan detection service.

use crate::models::{DetectionResult, SelectedFile, ServiceConfig};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use thiserror::Error;
use tracing::{debug, instrument, warn};
use url::Url;

/// Longest server error body kept for diagnostics
const MAX_ERROR_BODY: usize = 512;

/// Errors talking to the detection service.
///
/// All of them end the same way for the user (workflow `Failed` plus a generic
/// notification); the variants exist for logs and tests.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectionError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Detection service returned HTTP {status}: {body}")]
    Server { status: u16, body: String },

    #[error("Malformed detection response: {0}")]
    MalformedResponse(String),

    /// The request task ended without an outcome (panic or cancellation)
    #[error("Detection request aborted: {0}")]
    Aborted(String),
}

impl DetectionError {
    fn transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Transport(format!("request timed out: {}", err))
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// The detection service as the workflow sees it.
///
/// [`HttpDetectionClient`] is the real implementation; tests substitute fakes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DetectionClient: Send + Sync {
    /// Submit one image, single attempt
    async fn detect(&self, file: &SelectedFile) -> Result<DetectionResult, DetectionError>;

    /// Query the service's health endpoint
    async fn health_check(&self) -> Result<(), DetectionError>;

    /// Download the server-rendered annotated image
    async fn fetch_annotated_image(&self, image_url: &str) -> Result<Vec<u8>, DetectionError>;
}

/// reqwest-backed [`DetectionClient`]
#[derive(Clone, Debug)]
pub struct HttpDetectionClient {
    client: Client,
    base_url: Url,
    detect_url: Url,
    health_url: Url,
}

impl HttpDetectionClient {
    /// Create a client for the configured service.
    ///
    /// Fails on an unparsable base URL or path.
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(&config.base_url)
            .with_context(|| format!("Invalid service base URL: {}", config.base_url))?;
        let detect_url = base_url
            .join(&config.detect_path)
            .with_context(|| format!("Invalid detect path: {}", config.detect_path))?;
        let health_url = base_url
            .join(&config.health_path)
            .with_context(|| format!("Invalid health path: {}", config.health_path))?;

        tracing::info!(detect_url = %detect_url, "Detection client initialized");

        Ok(Self {
            client,
            base_url,
            detect_url,
            health_url,
        })
    }

    pub fn detect_url(&self) -> &Url {
        &self.detect_url
    }

    /// Resolve a server-provided image URL; relative URLs hang off the base URL
    pub fn resolve(&self, image_url: &str) -> Result<Url, DetectionError> {
        self.base_url
            .join(image_url)
            .map_err(|e| DetectionError::MalformedResponse(format!("bad image_url {image_url:?}: {e}")))
    }

    async fn error_body(response: reqwest::Response) -> String {
        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        body
    }
}

#[async_trait]
impl DetectionClient for HttpDetectionClient {
    #[instrument(skip(self, file), fields(file = file.name(), size = file.size()))]
    async fn detect(&self, file: &SelectedFile) -> Result<DetectionResult, DetectionError> {
        let part = Part::bytes(file.content().to_vec())
            .file_name(file.name().to_string())
            .mime_str(file.content_type())
            .map_err(DetectionError::transport)?;
        let form = Form::new().part("file", part);

        debug!(url = %self.detect_url, "Detection request");

        let response = self
            .client
            .post(self.detect_url.clone())
            .multipart(form)
            .send()
            .await
            .map_err(DetectionError::transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = Self::error_body(response).await;
            warn!(status = %status, "Detection service error");
            return Err(DetectionError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await.map_err(DetectionError::transport)?;
        DetectionResult::from_json(&bytes).map_err(DetectionError::MalformedResponse)
    }

    async fn health_check(&self) -> Result<(), DetectionError> {
        let response = self
            .client
            .get(self.health_url.clone())
            .send()
            .await
            .map_err(DetectionError::transport)?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(DetectionError::Server {
                status: status.as_u16(),
                body: Self::error_body(response).await,
            })
        }
    }

    async fn fetch_annotated_image(&self, image_url: &str) -> Result<Vec<u8>, DetectionError> {
        let url = self.resolve(image_url)?;
        debug!(url = %url, "Fetching annotated image");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(DetectionError::transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(DetectionError::Server {
                status: status.as_u16(),
                body: Self::error_body(response).await,
            });
        }

        let bytes = response.bytes().await.map_err(DetectionError::transport)?;
        Ok(bytes.to_vec())
    }
}
