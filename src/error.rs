use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::multipart::MultipartError;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Failure of a single detection request. Client mistakes map to 400 with a
/// fixed message, everything else to 500 with the message of the cause.
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("No file part")]
    MissingFile,

    #[error("No selected file")]
    EmptySelection,

    #[error(transparent)]
    Decode(#[from] image::ImageError),

    #[error("{0}")]
    Detection(anyhow::Error),

    #[error("{}", .0.body_text())]
    Upload(#[from] MultipartError),
}

impl From<anyhow::Error> for DetectError {
    fn from(e: anyhow::Error) -> Self {
        DetectError::Detection(e)
    }
}

impl DetectError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DetectError::MissingFile | DetectError::EmptySelection => StatusCode::BAD_REQUEST,
            DetectError::Decode(_) | DetectError::Detection(_) | DetectError::Upload(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            DetectError::MissingFile => "missing_file",
            DetectError::EmptySelection => "empty_selection",
            DetectError::Decode(_) => "decode",
            DetectError::Detection(_) => "detection",
            DetectError::Upload(_) => "upload",
        }
    }
}

impl IntoResponse for DetectError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(kind = self.kind(), "{self:#}");
        } else {
            warn!(kind = self.kind(), "{self}");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
