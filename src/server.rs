use crate::error::DetectError;
use crate::nose::{NoseEstimate, decode_frame, estimate_noses};
use crate::pipeline::LandmarkDetector;
use anyhow::Result;
use axum::extract::{DefaultBodyLimit, State};
use axum::routing::post;
use axum::{Json, Router};
use axum_extra::extract::Multipart;
use axum_extra::extract::multipart::MultipartRejection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use tower_http::trace::TraceLayer;
use tracing::{Level, debug, info, span, warn};

pub const FILE_FIELD: &str = "file";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResponse {
    pub noses: Vec<NoseEstimate>,
}

/// The detector is built once and shared by every request. Access is
/// serialized, the model runtime isn't assumed to be reentrant.
#[derive(Clone)]
pub struct AppState {
    detector: Arc<Mutex<Box<dyn LandmarkDetector>>>,
}

impl AppState {
    pub fn new<D: LandmarkDetector + 'static>(detector: D) -> AppState {
        AppState {
            detector: Arc::new(Mutex::new(Box::new(detector))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// `None` accepts uploads of any size.
    pub max_upload_bytes: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 5001,
            max_upload_bytes: None,
        }
    }
}

struct Upload {
    filename: String,
    bytes: Vec<u8>,
}

pub fn create_app(state: AppState, max_upload_bytes: Option<usize>) -> Router {
    let body_limit = match max_upload_bytes {
        Some(limit) => DefaultBodyLimit::max(limit),
        None => DefaultBodyLimit::disable(),
    };

    Router::new()
        .route("/detect", post(detect_handler))
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(config: ServerConfig, state: AppState) -> Result<()> {
    let app = create_app(state, config.max_upload_bytes);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Nose detector listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Nose detector stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
}

async fn detect_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<DetectionResponse>, DetectError> {
    // a body that isn't multipart has no file part either
    let multipart = multipart.map_err(|rejection| {
        debug!("Rejected upload: {rejection}");
        DetectError::MissingFile
    })?;

    let upload = read_file_field(multipart).await?;
    if upload.filename.is_empty() {
        return Err(DetectError::EmptySelection);
    }
    debug!("Received {} ({} bytes)", upload.filename, upload.bytes.len());

    let detector = Arc::clone(&state.detector);
    let noses = tokio::task::spawn_blocking(move || -> Result<Vec<NoseEstimate>, DetectError> {
        let span = span!(Level::DEBUG, "detect", filename = %upload.filename);
        let _guard = span.enter();

        let frame = decode_frame(&upload.bytes)?;
        // detectors hold no per-request state, a poisoned lock is still usable
        let mut detector = detector.lock().unwrap_or_else(PoisonError::into_inner);
        estimate_noses(&mut **detector, &frame)
    })
    .await
    .map_err(|e| DetectError::Detection(e.into()))??;

    Ok(Json(DetectionResponse { noses }))
}

/// First part named `file` that carries a filename. Parts without one are
/// plain form values, not files.
async fn read_file_field(mut multipart: Multipart) -> Result<Upload, DetectError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let Some(filename) = field.file_name().map(str::to_owned) else {
            continue;
        };

        let bytes = field.bytes().await?;
        return Ok(Upload {
            filename,
            bytes: bytes.to_vec(),
        });
    }

    Err(DetectError::MissingFile)
}
