//! Integration tests for HttpDetectionClient against a local axum server
//!
//! These tests verify:
//! - The upload is a multipart POST with the image in the `file` field
//! - 2xx bodies are parsed and validated
//! - Non-2xx statuses, bad JSON and out-of-range values map to distinct errors
//! - The health check and image download hit the right paths

mod common;

use common::{CannedServer, RecordedRequest, png};
use planscan::models::ServiceConfig;
use planscan::services::{DetectionClient, DetectionError, HttpDetectionClient};
use planscan::{ElementCategory, UploadController, UploadState, WorkflowStore};
use std::sync::Arc;

const VALID_BODY: &str = r#"{
    "id": "7f3c",
    "filename": "floorplan.png",
    "elements": {
        "walls": [
            {"type": "Wall", "confidence": 0.92, "bbox": [10, 10, 200, 20], "contour": [[10, 10], [200, 10], [200, 20], [10, 20]]},
            {"type": "Wall", "confidence": 0.88, "bbox": [10, 10, 20, 300], "contour": []}
        ],
        "windows": [],
        "doors": [
            {"type": "Door", "confidence": 0.75, "bbox": [50, 60, 80, 70], "contour": []}
        ]
    },
    "image_url": "/api/floorplan/images/7f3c_detected.jpg"
}"#;

fn client_for(base_url: &str) -> HttpDetectionClient {
    let config = ServiceConfig {
        base_url: base_url.to_string(),
        timeout_secs: 5,
        ..Default::default()
    };
    HttpDetectionClient::new(&config).unwrap()
}


#[tokio::test]
async fn test_detect_posts_multipart_and_parses() {
    let server = CannedServer::start(200, VALID_BODY).await;
    let client = client_for(&server.base_url);
    let file = png("floorplan.png");

    let result = client.detect(&file).await.unwrap();

    assert_eq!(result.id, "7f3c");
    assert_eq!(result.count(ElementCategory::Wall), 2);
    assert_eq!(result.count(ElementCategory::Window), 0);
    assert_eq!(result.count(ElementCategory::Door), 1);
    assert_eq!(result.elements.walls[0].bbox, [10.0, 10.0, 200.0, 20.0]);
    assert_eq!(result.elements.walls[0].contour.len(), 4);

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    let RecordedRequest::Detect(fields) = &requests[0] else {
        panic!("Expected a detect upload, got: {:?}", requests[0]);
    };
    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0].name, "file");
    assert_eq!(fields[0].file_name.as_deref(), Some("floorplan.png"));
    assert_eq!(fields[0].content_type.as_deref(), Some("image/png"));
    assert_eq!(fields[0].bytes, file.content());
}

#[tokio::test]
async fn test_detect_server_error() {
    let server = CannedServer::start(500, r#"{"detail":"model crashed"}"#).await;
    let client = client_for(&server.base_url);

    let err = client.detect(&png("floorplan.png")).await.unwrap_err();

    match err {
        DetectionError::Server { status, body } => {
            assert_eq!(status, 500);
            assert!(body.contains("model crashed"));
        }
        other => panic!("Expected Server error, got: {:?}", other),
    }
}

#[tokio::test]
async fn test_detect_malformed_body() {
    let server = CannedServer::start(200, r#"{"id": "x", "filename": "f.png"}"#).await;
    let client = client_for(&server.base_url);

    let err = client.detect(&png("f.png")).await.unwrap_err();

    assert!(matches!(err, DetectionError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_detect_rejects_bad_bbox_arity() {
    let body = r#"{"id": "x", "filename": "f.png", "image_url": "/i.jpg",
        "elements": {"walls": [{"type": "Wall", "confidence": 0.5, "bbox": [1, 2, 3], "contour": []}], "windows": [], "doors": []}}"#;
    let server = CannedServer::start(200, body).await;

    let err = client_for(&server.base_url).detect(&png("f.png")).await.unwrap_err();

    assert!(matches!(err, DetectionError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_detect_rejects_out_of_range_confidence() {
    let body = r#"{"id": "x", "filename": "f.png", "image_url": "/i.jpg",
        "elements": {"walls": [], "windows": [{"type": "Window", "confidence": 1.7, "bbox": [1, 2, 3, 4], "contour": []}], "doors": []}}"#;
    let server = CannedServer::start(200, body).await;

    let err = client_for(&server.base_url).detect(&png("f.png")).await.unwrap_err();

    match err {
        DetectionError::MalformedResponse(message) => assert!(message.contains("1.7")),
        other => panic!("Expected MalformedResponse, got: {:?}", other),
    }
}

#[tokio::test]
async fn test_detect_rejects_missing_category() {
    let body = r#"{"id": "x", "filename": "f.png", "image_url": "/i.jpg",
        "elements": {"walls": [], "windows": []}}"#;
    let server = CannedServer::start(200, body).await;

    let err = client_for(&server.base_url).detect(&png("f.png")).await.unwrap_err();

    match err {
        DetectionError::MalformedResponse(message) => assert!(message.contains("doors")),
        other => panic!("Expected MalformedResponse, got: {:?}", other),
    }
}

#[tokio::test]
async fn test_health_check_paths() {
    let server = CannedServer::start(200, "{}").await;
    client_for(&server.base_url).health_check().await.unwrap();
    assert_eq!(server.requests(), vec![RecordedRequest::Health]);

    let server = CannedServer::start(503, "starting").await;
    let err = client_for(&server.base_url).health_check().await.unwrap_err();
    assert_eq!(
        err,
        DetectionError::Server {
            status: 503,
            body: "starting".to_string()
        }
    );
}

#[tokio::test]
async fn test_fetch_annotated_image_resolves_relative_url() {
    let server = CannedServer::start(200, "JPEGDATA").await;
    let client = client_for(&server.base_url);

    let bytes = client
        .fetch_annotated_image("/api/floorplan/images/7f3c_detected.jpg")
        .await
        .unwrap();

    assert_eq!(bytes, b"JPEGDATA");
    assert_eq!(
        server.requests(),
        vec![RecordedRequest::Image("7f3c_detected.jpg".to_string())]
    );
}

#[tokio::test]
async fn test_controller_over_http_server_error() {
    let server = CannedServer::start(500, "boom").await;
    let client: Arc<dyn DetectionClient> = Arc::new(client_for(&server.base_url));
    let notifications = planscan::NotificationCenter::new(std::time::Duration::from_secs(60));
    let controller = UploadController::new(
        WorkflowStore::new(),
        client,
        notifications.clone(),
        Arc::new(planscan::Metrics::new()),
    );

    controller.select_file(png("floorplan.png")).unwrap();
    controller.submit().unwrap().await.unwrap();

    let state = controller.snapshot();
    assert_eq!(state.phase, UploadState::Failed);
    assert_eq!(state.file_name(), Some("floorplan.png"));
    assert_eq!(
        notifications
            .active()
            .iter()
            .filter(|n| n.kind == planscan::NotificationKind::Error)
            .count(),
        1
    );
}
