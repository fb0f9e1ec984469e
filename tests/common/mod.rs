//! Shared fixtures for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum::extract::{Multipart, Path, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use planscan::models::{DetectedElement, DetectedElements, DetectionResult, SelectedFile};
use planscan::services::{Clipboard, ClipboardError, DetectionClient, DetectionError};
use planscan::{Metrics, NotificationCenter, ResultViewer, UploadController, WorkflowStore};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

pub fn png(name: &str) -> SelectedFile {
    SelectedFile::new(name, "image/png", vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A])
}

pub fn element(kind: &str, confidence: f64, x: f64) -> DetectedElement {
    DetectedElement {
        kind: kind.to_string(),
        confidence,
        bbox: [x, x, x + 50.0, x + 20.0],
        contour: vec![[x, x], [x + 50.0, x], [x + 50.0, x + 20.0], [x, x + 20.0]],
    }
}

/// A result with the given confidences per category
pub fn result_with(id: &str, walls: &[f64], windows: &[f64], doors: &[f64]) -> DetectionResult {
    let build = |kind: &str, confidences: &[f64]| {
        confidences
            .iter()
            .enumerate()
            .map(|(i, &c)| element(kind, c, i as f64 * 10.0))
            .collect()
    };

    DetectionResult {
        id: id.to_string(),
        filename: "floorplan.png".to_string(),
        elements: DetectedElements {
            walls: build("Wall", walls),
            windows: build("Window", windows),
            doors: build("Door", doors),
        },
        image_url: format!("/api/floorplan/images/{id}_detected.jpg"),
    }
}

/// Detection client with scripted responses.
///
/// Each `detect` call takes the next response at call time. With a gate, the
/// call then waits for a permit, which keeps the request "in flight" until the
/// test calls [`release`](Self::release).
pub struct FakeDetectionClient {
    responses: Mutex<VecDeque<Result<DetectionResult, DetectionError>>>,
    image: Mutex<Result<Vec<u8>, DetectionError>>,
    calls: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
}

impl FakeDetectionClient {
    pub fn new(responses: Vec<Result<DetectionResult, DetectionError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            image: Mutex::new(Err(DetectionError::Server {
                status: 404,
                body: "not found".to_string(),
            })),
            calls: AtomicUsize::new(0),
            gate: None,
        }
    }

    pub fn gated(responses: Vec<Result<DetectionResult, DetectionError>>) -> Self {
        Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::new(responses)
        }
    }

    pub fn with_image(self, image: Result<Vec<u8>, DetectionError>) -> Self {
        *self.image.lock().unwrap() = image;
        self
    }

    /// Let one waiting request finish
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DetectionClient for FakeDetectionClient {
    async fn detect(&self, _file: &SelectedFile) -> Result<DetectionResult, DetectionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let response = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(DetectionError::Transport("no scripted response".into())));

        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        response
    }

    async fn health_check(&self) -> Result<(), DetectionError> {
        Ok(())
    }

    async fn fetch_annotated_image(&self, _image_url: &str) -> Result<Vec<u8>, DetectionError> {
        self.image.lock().unwrap().clone()
    }
}

/// Clipboard that records what it was given, or fails every time
pub struct FakeClipboard {
    pub contents: Mutex<Vec<String>>,
    fail: bool,
}

impl FakeClipboard {
    pub fn working() -> Self {
        Self {
            contents: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn denied() -> Self {
        Self {
            contents: Mutex::new(Vec::new()),
            fail: true,
        }
    }
}

#[async_trait]
impl Clipboard for FakeClipboard {
    async fn set_text(&self, text: &str) -> Result<(), ClipboardError> {
        if self.fail {
            return Err(ClipboardError::Write(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "clipboard access denied",
            )));
        }
        self.contents.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// Controller, viewer and their shared pieces wired like the binary does
pub struct Harness {
    pub controller: UploadController,
    pub viewer: ResultViewer,
    pub client: Arc<FakeDetectionClient>,
    pub clipboard: Arc<FakeClipboard>,
    pub notifications: NotificationCenter,
    pub metrics: Arc<Metrics>,
}

impl Harness {
    pub fn new(client: FakeDetectionClient, clipboard: FakeClipboard) -> Self {
        let metrics = Arc::new(Metrics::new());
        let notifications = NotificationCenter::with_metrics(Duration::from_secs(60), metrics.clone());
        let client = Arc::new(client);
        let clipboard = Arc::new(clipboard);
        let store = WorkflowStore::new();

        let controller = UploadController::new(
            store.clone(),
            client.clone(),
            notifications.clone(),
            metrics.clone(),
        );
        let viewer = ResultViewer::new(
            store,
            notifications.clone(),
            clipboard.clone(),
            client.clone(),
            metrics.clone(),
        );

        Self {
            controller,
            viewer,
            client,
            clipboard,
            notifications,
            metrics,
        }
    }

    /// Run a full select → submit → complete cycle with `result`
    pub async fn completed(result: DetectionResult, clipboard: FakeClipboard) -> Self {
        let harness = Self::new(FakeDetectionClient::new(vec![Ok(result)]), clipboard);
        harness.controller.select_file(png("floorplan.png")).unwrap();
        harness.controller.submit().unwrap().await.unwrap();
        harness
    }

    pub fn messages(&self) -> Vec<String> {
        self.notifications
            .active()
            .into_iter()
            .map(|n| n.message)
            .collect()
    }
}

/// One multipart field as the server received it
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedField {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// A request seen by [`CannedServer`]
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedRequest {
    Detect(Vec<UploadedField>),
    Health,
    Image(String),
}

#[derive(Clone)]
struct Canned {
    status: StatusCode,
    body: &'static str,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl Canned {
    fn respond(&self, request: RecordedRequest) -> impl IntoResponse + use<> {
        self.requests.lock().unwrap().push(request);
        (
            self.status,
            [(header::CONTENT_TYPE, "application/json")],
            self.body,
        )
    }
}

async fn detect_route(State(canned): State<Canned>, mut multipart: Multipart) -> impl IntoResponse {
    let mut fields = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.unwrap().to_vec();
        fields.push(UploadedField {
            name,
            file_name,
            content_type,
            bytes,
        });
    }
    canned.respond(RecordedRequest::Detect(fields))
}

async fn health_route(State(canned): State<Canned>) -> impl IntoResponse {
    canned.respond(RecordedRequest::Health)
}

async fn image_route(State(canned): State<Canned>, Path(name): Path<String>) -> impl IntoResponse {
    canned.respond(RecordedRequest::Image(name))
}

/// Local detection service answering every route with the same status and body.
///
/// Requests are recorded before the response goes out, so they are visible as
/// soon as the client call returns.
pub struct CannedServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    handle: JoinHandle<()>,
}

impl CannedServer {
    pub async fn start(status: u16, body: &'static str) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let canned = Canned {
            status: StatusCode::from_u16(status).unwrap(),
            body,
            requests: requests.clone(),
        };

        let app = Router::new()
            .route("/api/floorplan/detect", post(detect_route))
            .route("/health", get(health_route))
            .route("/api/floorplan/images/:name", get(image_route))
            .with_state(canned);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", address),
            requests,
            handle,
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for CannedServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
