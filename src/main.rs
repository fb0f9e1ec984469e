//! planscan - floorplan detection client
//!
//! Main entry point for the command-line client.
//!
//! # Overview
//!
//! The binary runs one upload session against the detection service:
//! - Logging infrastructure (file rotation + console output on stderr)
//! - Single-threaded tokio runtime (request task, notification timers)
//! - Workflow store, notification center and metrics
//! - Upload controller and result viewer
//!
//! # Execution Flow
//!
//! 1. Load `planscan.yaml` from the config directory (environment overrides apply)
//! 2. Initialize logging → logs/planscan.<date>
//! 3. Pick the image (argument, or a native file dialog)
//! 4. Select → submit → wait for the response
//! 5. Print counts, mean confidences and the ranked element list
//! 6. Optional export / clipboard copy / annotated image download
//! 7. Tear down notifications and log the session summary

use anyhow::{Context, Result, bail};
use camino::Utf8PathBuf;
use clap::Parser;
use planscan::models::ClientConfig;
use planscan::notifications::{NotificationEvent, NotificationKind};
use planscan::services::{CommandClipboard, DetectionClient, HttpDetectionClient};
use planscan::ui::confidence_percent;
use planscan::{
    APP_NAME, ConfigManager, Metrics, NotificationCenter, ResultViewer, UploadController,
    UploadState, VERSION, WorkflowStore,
};
use std::sync::Arc;

/// Analyze a floorplan image with the detection service
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Floorplan image to upload; a file dialog opens when omitted
    #[arg(value_name = "IMAGE")]
    image: Option<Utf8PathBuf>,

    /// Directory holding planscan.yaml
    #[arg(long, default_value = ".", value_name = "DIR")]
    config_dir: Utf8PathBuf,

    /// Override the detection service base URL
    #[arg(long, value_name = "URL")]
    service_url: Option<String>,

    /// Write {filename}_results.json
    #[arg(long)]
    export: bool,

    /// Copy the result JSON to the clipboard
    #[arg(long)]
    copy: bool,

    /// Save the annotated image as {filename}_detected.jpg
    #[arg(long)]
    download: bool,

    /// Directory for exported files (defaults to the configured output_dir)
    #[arg(long, value_name = "DIR")]
    output_dir: Option<Utf8PathBuf>,

    /// Only check that the detection service is reachable
    #[arg(long)]
    check: bool,

    /// Show every ranked element, not just the top 20
    #[arg(long)]
    all: bool,
}

/// Main entry point
///
/// # Errors
///
/// Fails if configuration or logging setup fails, if no image is chosen, or
/// if the session ends without a result. Workflow errors themselves are
/// reported as notifications before that.
fn main() -> Result<()> {
    let args = Args::parse();

    let config_manager = ConfigManager::new(&args.config_dir)?;
    let mut config = config_manager.load()?;
    if let Some(url) = &args.service_url {
        config.service.base_url = url.clone();
    }

    let _log_guard = planscan::logging::setup_logging(&config.logging)?;
    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    // One logical thread of control; suspension only at I/O and timers
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    let result = runtime.block_on(run(args, config));

    tracing::info!("Session finished");
    result
}

async fn run(args: Args, config: ClientConfig) -> Result<()> {
    let metrics = Arc::new(Metrics::new());
    let notifications = NotificationCenter::with_metrics(
        config.notifications.display_duration(),
        metrics.clone(),
    );
    let renderer = spawn_notification_renderer(&notifications);

    let client: Arc<dyn DetectionClient> = Arc::new(HttpDetectionClient::new(&config.service)?);
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
        Arc::new(CommandClipboard::new(&config.clipboard)),
        client,
        metrics.clone(),
    );

    let outcome = if args.check {
        controller
            .check_service()
            .await
            .context("Detection service health check failed")
    } else {
        run_session(&args, &config, &controller, &viewer).await
    };

    // Let the renderer print what is still queued
    tokio::task::yield_now().await;
    notifications.shutdown();
    renderer.abort();
    metrics.log_summary();
    outcome
}

async fn run_session(
    args: &Args,
    config: &ClientConfig,
    controller: &UploadController,
    viewer: &ResultViewer,
) -> Result<()> {
    let image = match &args.image {
        Some(path) => path.clone(),
        None => pick_image().context("No image selected")?,
    };

    controller.select_path(&image).await?;

    let Some(request) = controller.submit() else {
        bail!("Nothing to submit for {}", image);
    };
    eprintln!("Processing {} ...", image);
    request.await.context("Detection task panicked")?;

    let state = controller.snapshot();
    if state.phase != UploadState::Completed {
        bail!(
            "Detection failed: {}",
            state.last_error.as_deref().unwrap_or("unknown error")
        );
    }

    print_results(viewer, args.all);

    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| Utf8PathBuf::from(&config.export.output_dir));

    // Failures below are already reported as notifications; keep going
    if args.export {
        let _ = viewer.export_to(&output_dir).await;
    }
    if args.copy {
        let _ = viewer.copy_to_clipboard().await;
    }
    if args.download {
        let _ = viewer.download_annotated_image(&output_dir).await;
    }

    Ok(())
}

fn print_results(viewer: &ResultViewer, show_all: bool) {
    let Some(result) = viewer.result() else {
        return;
    };

    println!("Detection Results: {} ({})", result.filename, result.id);
    for summary in viewer.summaries() {
        println!(
            "  {:<8} {:>4}  avg {} confidence",
            format!("{}s", summary.category),
            summary.count,
            confidence_percent(summary.mean_confidence)
        );
    }

    let ranked = viewer.ranked_elements();
    println!();
    println!("Detected Elements ({})", ranked.len());

    let limit = if show_all { ranked.len() } else { 20 };
    for row in ranked.iter().take(limit) {
        let [x_min, y_min, x_max, y_max] = row.element.bbox;
        println!(
            "  {:<7} {:>6}  bbox [{:.0}, {:.0}, {:.0}, {:.0}]",
            row.category,
            confidence_percent(row.element.confidence),
            x_min,
            y_min,
            x_max,
            y_max
        );
    }
    if ranked.len() > limit {
        println!("  ... {} more (use --all)", ranked.len() - limit);
    }
    println!();
    println!("Annotated image: {}", result.image_url);
}

/// Print notifications as they appear
fn spawn_notification_renderer(notifications: &NotificationCenter) -> tokio::task::JoinHandle<()> {
    let mut rx = notifications.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(NotificationEvent::Pushed(notification)) => {
                    let tag = match notification.kind {
                        NotificationKind::Success => "ok",
                        NotificationKind::Error => "error",
                    };
                    eprintln!("[{}] {}", tag, notification.message);
                }
                Ok(NotificationEvent::Dismissed(_)) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Notification renderer skipped {} events", skipped);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

/// Native file dialog filtered to image types
fn pick_image() -> Option<Utf8PathBuf> {
    let path = rfd::FileDialog::new()
        .set_title("Select a floorplan image")
        .add_filter(
            "Images",
            &["png", "jpg", "jpeg", "gif", "bmp", "webp", "tif", "tiff"],
        )
        .pick_file()?;

    Utf8PathBuf::from_path_buf(path)
        .map_err(|p| tracing::warn!("Selected path is not UTF-8: {}", p.display()))
        .ok()
}
