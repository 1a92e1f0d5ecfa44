// Common data models for the extraction pipeline

use std::fmt;
use std::path::{Path, PathBuf};

use uuid::Uuid;

/// Where the session cookies for a request come from
#[derive(Clone, PartialEq, Eq)]
pub enum CookieSource {
    /// Raw `Cookie:` header value
    Header(String),
    /// Netscape cookie-jar content, materialised per call
    InlineJar(String),
    /// Existing cookie-jar file on disk
    JarFile(PathBuf),
    /// No stored session; yt-dlp acts as an anonymous client
    Anonymous,
}

impl CookieSource {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Header(_) => "header",
            Self::InlineJar(_) => "inline-jar",
            Self::JarFile(_) => "jar-file",
            Self::Anonymous => "anonymous",
        }
    }
}

// Cookie values never reach the logs
impl fmt::Debug for CookieSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::JarFile(path) => f.debug_tuple("JarFile").field(path).finish(),
            other => write!(f, "{}", other.label()),
        }
    }
}

/// Network identity presented to Instagram
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkIdentity {
    pub user_agent: String,
    pub cookies: CookieSource,
}

/// Everything the adapter needs besides the URL. Built once per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionsBundle {
    pub identity: NetworkIdentity,
    /// yt-dlp `-f` expression
    pub format_preference: String,
    pub retries: u32,
}

/// Destination for a download: `<dir>/<stem>.<ext chosen by yt-dlp>`
#[derive(Debug, Clone)]
pub struct DownloadTarget {
    pub dir: PathBuf,
    pub stem: String,
}

impl DownloadTarget {
    /// Fresh target with a random stem so concurrent downloads never collide
    pub fn fresh(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            stem: Uuid::new_v4().to_string(),
        }
    }

    /// Output template handed to yt-dlp
    pub fn output_template(&self) -> PathBuf {
        self.dir.join(format!("{}.%(ext)s", self.stem))
    }
}

/// A file the adapter wrote to local storage
#[derive(Debug, Clone)]
pub struct DownloadedFile {
    pub local_path: PathBuf,
    pub filename: String,
}

impl DownloadedFile {
    pub fn new(local_path: PathBuf) -> Self {
        let filename = local_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            local_path,
            filename,
        }
    }

    /// URL path of this file under the public media prefix, e.g.
    /// `/media/videos/<uuid>.mp4`. None if it sits outside `media_root`.
    pub fn public_path(&self, media_root: &Path, media_url: &str) -> Option<String> {
        let rel = self.local_path.strip_prefix(media_root).ok()?;
        let rel = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        Some(format!("{}{}", media_url, rel))
    }
}
