use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::downloader::DownloadError;

/// Everything a handler can fail with. Each failure only affects its own request.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Use POST with JSON: {{\"url\": \"...\"}}")]
    MethodNotAllowed,

    #[error("Invalid JSON payload")]
    InvalidJson,

    #[error("Provide a valid Instagram URL")]
    InvalidUrl,

    /// The adapter failed; its message goes back to the client
    #[error("{0}")]
    Extraction(#[from] DownloadError),

    /// Extraction worked but nothing single-file was on offer
    #[error("Could not resolve a direct media URL")]
    NoRendition,

    /// Local storage trouble; detail is logged, not returned
    #[error("Could not store the downloaded file")]
    Storage(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// `{status:"error", message}` body
    pub fn into_json(self) -> Response {
        let status = self.status();
        let allow = matches!(self, Self::MethodNotAllowed);
        let body = Json(json!({ "status": "error", "message": self.to_string() }));
        if allow {
            (status, [(header::ALLOW, "POST")], body).into_response()
        } else {
            (status, body).into_response()
        }
    }

    /// Plain-text body, for the redirect endpoint
    pub fn into_text(self) -> Response {
        let status = self.status();
        let allow = matches!(self, Self::MethodNotAllowed);
        let body = self.to_string();
        if allow {
            (status, [(header::ALLOW, "POST")], body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.into_json()
    }
}
