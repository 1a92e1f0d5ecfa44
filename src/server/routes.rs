use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;

use crate::config::MediaConfig;
use crate::downloader::{
    is_acceptable, DownloadError, DownloadTarget, ExtractionResult, FormatSelector, Selection,
};
use crate::server::error::ApiError;
use crate::server::AppContext;

const EXPIRY_NOTE: &str = "This link may expire soon; download immediately.";

#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    pub status: &'static str,
    pub direct_url: String,
    pub title: Option<String>,
    pub duration: Option<f64>,
    pub note: &'static str,
}

#[derive(Debug, Serialize)]
pub struct DownloadResponse {
    pub status: &'static str,
    pub download_url: String,
    pub filename: String,
}

pub fn media_routes() -> Router<AppContext> {
    Router::new()
        .route("/resolve/", post(resolve).fallback(json_method_not_allowed))
        .route("/redirect/", post(redirect).fallback(text_method_not_allowed))
        .route("/download/", post(download).fallback(json_method_not_allowed))
        .route("/health/", get(health))
}

async fn health() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn json_method_not_allowed() -> Response {
    ApiError::MethodNotAllowed.into_json()
}

async fn text_method_not_allowed() -> Response {
    ApiError::MethodNotAllowed.into_text()
}

/// Pull a validated source URL out of a raw `{"url": "..."}` body
pub fn parse_source_url(body: &[u8]) -> Result<String, ApiError> {
    let payload: serde_json::Value =
        serde_json::from_slice(body).map_err(|_| ApiError::InvalidJson)?;
    let object = payload.as_object().ok_or(ApiError::InvalidJson)?;

    let url = match object.get("url") {
        None | Some(serde_json::Value::Null) => "",
        Some(serde_json::Value::String(s)) => s.trim(),
        Some(_) => return Err(ApiError::InvalidJson),
    };

    if !is_acceptable(url) {
        return Err(ApiError::InvalidUrl);
    }
    Ok(url.to_string())
}

fn extraction_failed(url: &str, err: DownloadError) -> ApiError {
    match err.hint() {
        Some(hint) => tracing::warn!("Extraction of {} failed: {:?} - {}", url, err, hint),
        None => tracing::warn!("Extraction of {} failed: {:?}", url, err),
    }
    ApiError::Extraction(err)
}

/// validate -> options -> extract -> select
async fn resolve_source(
    ctx: &AppContext,
    body: &[u8],
) -> Result<(ExtractionResult, Selection), ApiError> {
    let url = parse_source_url(body)?;
    let options = ctx.options.build();

    tracing::info!("Resolving {} via {}", url, ctx.extractor.name());
    let info = ctx
        .extractor
        .extract(&url, &options)
        .await
        .map_err(|e| extraction_failed(&url, e))?;

    let selection = FormatSelector::select_from(&info).ok_or_else(|| {
        tracing::warn!(
            "No single-file rendition for {} among {} candidates",
            url,
            info.renditions.len()
        );
        ApiError::NoRendition
    })?;

    tracing::info!(
        "Resolved {} to {:?} rendition {}",
        url,
        selection.tier,
        selection.format_id.as_deref().unwrap_or("-")
    );
    Ok((info, selection))
}

async fn resolve(
    State(ctx): State<AppContext>,
    body: Bytes,
) -> Result<Json<ResolveResponse>, ApiError> {
    let (info, selection) = resolve_source(&ctx, &body).await?;

    Ok(Json(ResolveResponse {
        status: "ok",
        direct_url: selection.url,
        title: info.title,
        duration: info.duration,
        note: EXPIRY_NOTE,
    }))
}

async fn redirect(State(ctx): State<AppContext>, body: Bytes) -> Response {
    match resolve_source(&ctx, &body).await {
        // 302; the client fetches straight from Instagram's CDN
        Ok((_, selection)) => (StatusCode::FOUND, [(header::LOCATION, selection.url)]).into_response(),
        Err(e) => e.into_text(),
    }
}

async fn download(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<DownloadResponse>, ApiError> {
    let url = parse_source_url(&body)?;
    let options = ctx.options.build();
    let media = &ctx.config.media;
    let target = DownloadTarget::fresh(media.videos_dir());

    tracing::info!("Downloading {} as {}", url, target.stem);
    let file = ctx
        .extractor
        .download(&url, &options, &target)
        .await
        .map_err(|e| extraction_failed(&url, e))?;

    let path = file
        .public_path(&media.root, &media.url_prefix)
        .ok_or_else(|| {
            tracing::error!(
                "Downloaded file {:?} is outside media root {:?}",
                file.local_path,
                media.root
            );
            ApiError::Storage(format!("{:?}", file.local_path))
        })?;

    tracing::info!("Stored {} at {:?}", url, file.local_path);
    Ok(Json(DownloadResponse {
        status: "ok",
        download_url: absolute_url(media, &headers, &path),
        filename: file.filename,
    }))
}

/// Configured public base, else scheme + Host.
/// The scheme is https only when the proxy's X-Forwarded-Proto says so.
pub fn absolute_url(media: &MediaConfig, headers: &HeaderMap, path: &str) -> String {
    if let Some(base) = &media.public_base_url {
        return format!("{}{}", base, path);
    }

    let Some(host) = headers.get(header::HOST).and_then(|v| v.to_str().ok()) else {
        return path.to_string();
    };

    let forwarded_https = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("https"));
    let scheme = if forwarded_https { "https" } else { "http" };

    format!("{}://{}{}", scheme, host, path)
}
