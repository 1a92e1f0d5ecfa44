//! HTTP API integration tests
//!
//! Drive the router end to end against a stub extractor that records how
//! often it was called.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use instadl::config::AppConfig;
use instadl::downloader::{
    CookieSource, CredentialSettings, CredentialSource, DownloadError, DownloadTarget,
    DownloadedFile, ExtractionResult, ExtractorDefaults, MediaExtractor, OptionsBuilder,
    OptionsBundle, RenditionCandidate,
};
use instadl::server::{create_router, AppContext};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

const REEL: &str = "https://www.instagram.com/reel/ABC123/";

enum Behaviour {
    Succeed(ExtractionResult),
    Fail(String),
}

struct StubExtractor {
    behaviour: Behaviour,
    calls: AtomicUsize,
    seen_options: Mutex<Vec<OptionsBundle>>,
}

impl StubExtractor {
    fn new(behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            behaviour,
            calls: AtomicUsize::new(0),
            seen_options: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record(&self, options: &OptionsBundle) -> Result<(), DownloadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_options.lock().unwrap().push(options.clone());
        match &self.behaviour {
            Behaviour::Succeed(_) => Ok(()),
            Behaviour::Fail(msg) => Err(DownloadError::from(msg.clone())),
        }
    }
}

#[async_trait]
impl MediaExtractor for StubExtractor {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn extract(
        &self,
        _url: &str,
        options: &OptionsBundle,
    ) -> Result<ExtractionResult, DownloadError> {
        self.record(options)?;
        match &self.behaviour {
            Behaviour::Succeed(info) => Ok(info.clone()),
            Behaviour::Fail(_) => unreachable!(),
        }
    }

    async fn download(
        &self,
        _url: &str,
        options: &OptionsBundle,
        target: &DownloadTarget,
    ) -> Result<DownloadedFile, DownloadError> {
        self.record(options)?;
        tokio::fs::create_dir_all(&target.dir).await?;
        let path = target.dir.join(format!("{}.mp4", target.stem));
        tokio::fs::write(&path, b"fake mp4").await?;
        Ok(DownloadedFile::new(path))
    }
}

fn progressive(id: &str, height: u32) -> RenditionCandidate {
    RenditionCandidate {
        format_id: id.to_string(),
        ext: "mp4".to_string(),
        vcodec: Some("avc1.64001f".to_string()),
        acodec: Some("mp4a.40.2".to_string()),
        url: Some(format!("https://scontent.cdninstagram.com/{}.mp4", id)),
        height: Some(height),
        tbr: Some(1200.0),
    }
}

fn reel_info(renditions: Vec<RenditionCandidate>, top_level: Option<&str>) -> ExtractionResult {
    ExtractionResult {
        title: Some("Video by someone".to_string()),
        duration: Some(12.5),
        url: top_level.map(|s| s.to_string()),
        renditions,
    }
}

/// Test context with fixed credentials and a temp media root
fn create_test_app(stub: Arc<StubExtractor>, creds: CredentialSettings) -> (Router, TempDir) {
    let media_root = tempdir().unwrap();
    let mut config = AppConfig::default();
    config.media.root = media_root.path().to_path_buf();

    let ctx = AppContext::new(config, stub).with_options(OptionsBuilder::new(
        ExtractorDefaults::default(),
        CredentialSource::Fixed(creds),
    ));
    (create_router(ctx), media_root)
}

fn post_json(path: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::HOST, "api.example.com")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Helper to get response body as string
async fn body_to_string(body: Body) -> String {
    let bytes = body.collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_to_json(body: Body) -> serde_json::Value {
    serde_json::from_str(&body_to_string(body).await).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let stub = StubExtractor::new(Behaviour::Succeed(reel_info(vec![], None)));
    let (app, _media) = create_test_app(stub, CredentialSettings::default());

    let response = app
        .oneshot(Request::get("/health/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_to_json(response.into_body()).await, serde_json::json!({"ok": true}));
}

#[tokio::test]
async fn test_resolve_returns_tier_one_url() {
    let stub = StubExtractor::new(Behaviour::Succeed(reel_info(vec![progressive("720", 720)], None)));
    let (app, _media) = create_test_app(stub.clone(), CredentialSettings::default());

    let response = app
        .oneshot(post_json("/resolve/", &format!(r#"{{"url":"{}"}}"#, REEL)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["direct_url"], "https://scontent.cdninstagram.com/720.mp4");
    assert_eq!(json["title"], "Video by someone");
    assert_eq!(json["duration"], 12.5);
    assert!(json["note"].as_str().unwrap().contains("expire"));
    assert_eq!(stub.calls(), 1);
}

#[tokio::test]
async fn test_resolve_prefers_higher_progressive() {
    let stub = StubExtractor::new(Behaviour::Succeed(reel_info(
        vec![progressive("720", 720), progressive("1080", 1080)],
        None,
    )));
    let (app, _media) = create_test_app(stub, CredentialSettings::default());

    let response = app
        .oneshot(post_json("/resolve/", &format!(r#"{{"url":"{}"}}"#, REEL)))
        .await
        .unwrap();

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["direct_url"], "https://scontent.cdninstagram.com/1080.mp4");
}

#[tokio::test]
async fn test_resolve_rejects_bad_url_without_extracting() {
    let stub = StubExtractor::new(Behaviour::Succeed(reel_info(vec![progressive("720", 720)], None)));
    let (app, _media) = create_test_app(stub.clone(), CredentialSettings::default());

    let response = app
        .oneshot(post_json("/resolve/", r#"{"url":"not-a-url"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "error");
    assert_eq!(json["message"], "Provide a valid Instagram URL");
    assert_eq!(stub.calls(), 0);
}

#[tokio::test]
async fn test_malformed_json_is_rejected() {
    let stub = StubExtractor::new(Behaviour::Succeed(reel_info(vec![], None)));
    let (app, _media) = create_test_app(stub.clone(), CredentialSettings::default());

    for path in ["/resolve/", "/redirect/", "/download/"] {
        let response = app
            .clone()
            .oneshot(post_json(path, "{\"url\": "))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", path);
        assert!(body_to_string(response.into_body())
            .await
            .contains("Invalid JSON payload"));
    }
    assert_eq!(stub.calls(), 0);
}

#[tokio::test]
async fn test_non_post_methods_are_rejected() {
    let stub = StubExtractor::new(Behaviour::Succeed(reel_info(vec![progressive("720", 720)], None)));
    let (app, _media) = create_test_app(stub.clone(), CredentialSettings::default());

    for path in ["/resolve/", "/redirect/", "/download/"] {
        for method in [Method::GET, Method::PUT, Method::DELETE, Method::PATCH] {
            let response = app
                .clone()
                .oneshot(
                    Request::builder()
                        .method(method.clone())
                        .uri(path)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED, "{} {}", method, path);
            assert_eq!(response.headers()[header::ALLOW], "POST");
        }
    }
    assert_eq!(stub.calls(), 0);
}

#[tokio::test]
async fn test_resolve_without_rendition() {
    let stub = StubExtractor::new(Behaviour::Succeed(reel_info(vec![], None)));
    let (app, _media) = create_test_app(stub, CredentialSettings::default());

    let response = app
        .oneshot(post_json("/resolve/", &format!(r#"{{"url":"{}"}}"#, REEL)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["message"], "Could not resolve a direct media URL");
}

#[tokio::test]
async fn test_resolve_falls_back_to_top_level_url() {
    let stub = StubExtractor::new(Behaviour::Succeed(reel_info(
        vec![],
        Some("https://scontent.cdninstagram.com/top.mp4"),
    )));
    let (app, _media) = create_test_app(stub, CredentialSettings::default());

    let response = app
        .oneshot(post_json("/resolve/", &format!(r#"{{"url":"{}"}}"#, REEL)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["direct_url"], "https://scontent.cdninstagram.com/top.mp4");
}

#[tokio::test]
async fn test_resolve_surfaces_extractor_message() {
    let stub = StubExtractor::new(Behaviour::Fail(
        "ERROR: [Instagram] ABC123: Requested content is not available, rate-limit reached or login required".to_string(),
    ));
    let (app, _media) = create_test_app(stub.clone(), CredentialSettings::default());

    let response = app
        .oneshot(post_json("/resolve/", &format!(r#"{{"url":"{}"}}"#, REEL)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "error");
    assert!(json["message"]
        .as_str()
        .unwrap()
        .starts_with("ERROR: [Instagram] ABC123"));
    assert_eq!(stub.calls(), 1);
}

#[tokio::test]
async fn test_missing_tool_hides_server_paths() {
    let stub = StubExtractor::new(Behaviour::Fail(
        "/srv/instadl/venv/bin/python3: No module named yt_dlp".to_string(),
    ));
    let (app, _media) = create_test_app(stub, CredentialSettings::default());

    let response = app
        .oneshot(post_json("/resolve/", &format!(r#"{{"url":"{}"}}"#, REEL)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_to_string(response.into_body()).await;
    assert!(body.contains("yt-dlp is not available"));
    assert!(!body.contains("/srv/instadl"));
}

#[tokio::test]
async fn test_redirect_sends_302() {
    let stub = StubExtractor::new(Behaviour::Succeed(reel_info(vec![progressive("720", 720)], None)));
    let (app, _media) = create_test_app(stub, CredentialSettings::default());

    let response = app
        .oneshot(post_json("/redirect/", &format!(r#"{{"url":"{}"}}"#, REEL)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers()[header::LOCATION],
        "https://scontent.cdninstagram.com/720.mp4"
    );
    assert!(body_to_string(response.into_body()).await.is_empty());
}

#[tokio::test]
async fn test_redirect_failure_is_plain_text() {
    let stub = StubExtractor::new(Behaviour::Succeed(reel_info(vec![], None)));
    let (app, _media) = create_test_app(stub, CredentialSettings::default());

    let response = app
        .oneshot(post_json("/redirect/", &format!(r#"{{"url":"{}"}}"#, REEL)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().get(header::LOCATION).is_none());
    assert_eq!(
        body_to_string(response.into_body()).await,
        "Could not resolve a direct media URL"
    );
}

#[tokio::test]
async fn test_download_stores_file_and_links_it() {
    let stub = StubExtractor::new(Behaviour::Succeed(reel_info(vec![], None)));
    let (app, media) = create_test_app(stub.clone(), CredentialSettings::default());

    let response = app
        .clone()
        .oneshot(post_json("/download/", &format!(r#"{{"url":"{}"}}"#, REEL)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "ok");

    let filename = json["filename"].as_str().unwrap().to_string();
    assert!(filename.ends_with(".mp4"));
    assert_eq!(
        json["download_url"],
        format!("http://api.example.com/media/videos/{}", filename)
    );
    assert!(media.path().join("videos").join(&filename).exists());

    // The stored file is served back under the media prefix
    let served = app
        .oneshot(
            Request::get(format!("/media/videos/{}", filename))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(served.status(), StatusCode::OK);
    assert_eq!(body_to_string(served.into_body()).await, "fake mp4");
}

#[tokio::test]
async fn test_download_url_scheme_follows_proxy_https_only() {
    let stub = StubExtractor::new(Behaviour::Succeed(reel_info(vec![], None)));
    let (app, _media) = create_test_app(stub, CredentialSettings::default());
    let body = format!(r#"{{"url":"{}"}}"#, REEL);

    for (proto, scheme) in [("https", "https"), ("javascript", "http")] {
        let mut request = post_json("/download/", &body);
        request
            .headers_mut()
            .insert("x-forwarded-proto", proto.parse().unwrap());

        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_to_json(response.into_body()).await;
        let expected = format!("{}://api.example.com/media/videos/", scheme);
        assert!(
            json["download_url"].as_str().unwrap().starts_with(&expected),
            "{}",
            proto
        );
    }
}

#[tokio::test]
async fn test_concurrent_downloads_get_distinct_files() {
    let stub = StubExtractor::new(Behaviour::Succeed(reel_info(vec![], None)));
    let (app, _media) = create_test_app(stub.clone(), CredentialSettings::default());

    let body = format!(r#"{{"url":"{}"}}"#, REEL);
    let (a, b) = tokio::join!(
        app.clone().oneshot(post_json("/download/", &body)),
        app.clone().oneshot(post_json("/download/", &body)),
    );

    let a = body_to_json(a.unwrap().into_body()).await;
    let b = body_to_json(b.unwrap().into_body()).await;
    assert_ne!(a["filename"], b["filename"]);
    assert_eq!(stub.calls(), 2);
}

#[tokio::test]
async fn test_download_failure_is_client_error() {
    let stub = StubExtractor::new(Behaviour::Fail("ERROR: HTTP Error 404: Not Found".to_string()));
    let (app, _media) = create_test_app(stub, CredentialSettings::default());

    let response = app
        .oneshot(post_json("/download/", &format!(r#"{{"url":"{}"}}"#, REEL)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "error");
    assert_eq!(json["message"], "ERROR: HTTP Error 404: Not Found");
}

#[tokio::test]
async fn test_configured_credentials_reach_extractor() {
    let stub = StubExtractor::new(Behaviour::Succeed(reel_info(vec![progressive("720", 720)], None)));
    let creds = CredentialSettings {
        cookie_header: Some("sessionid=abc".to_string()),
        cookies_file: Some(PathBuf::from("/etc/hosts")),
        user_agent: Some("custom-agent/2.0".to_string()),
        ..Default::default()
    };
    let (app, _media) = create_test_app(stub.clone(), creds);

    let response = app
        .oneshot(post_json("/resolve/", &format!(r#"{{"url":"{}"}}"#, REEL)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let seen = stub.seen_options.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(
        seen[0].identity.cookies,
        CookieSource::Header("sessionid=abc".to_string())
    );
    assert_eq!(seen[0].identity.user_agent, "custom-agent/2.0");
}
