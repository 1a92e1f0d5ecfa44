// MediaExtractor trait and common types

use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;

use crate::downloader::errors::DownloadError;
use crate::downloader::models::{DownloadTarget, DownloadedFile, OptionsBundle};

/// How yt-dlp is invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractorMode {
    /// Python module yt_dlp
    Python,
    /// CLI binary yt-dlp
    Cli,
    /// CLI when the binary answers, otherwise Python
    #[default]
    Auto,
}

impl fmt::Display for ExtractorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Python => write!(f, "python"),
            Self::Cli => write!(f, "cli"),
            Self::Auto => write!(f, "auto"),
        }
    }
}

impl FromStr for ExtractorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "python" => Ok(Self::Python),
            "cli" => Ok(Self::Cli),
            "auto" | "" => Ok(Self::Auto),
            other => Err(format!("unknown extractor mode '{}'", other)),
        }
    }
}

/// Process-level settings for the yt-dlp adapter
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub mode: ExtractorMode,
    /// Explicit yt-dlp binary; discovered when unset
    pub ytdlp_path: Option<String>,
    /// Interpreter for Python mode
    pub python_cmd: String,
    /// `--socket-timeout` passed to yt-dlp
    pub socket_timeout_seconds: u32,
    /// Caller-side limit on the whole child process
    pub timeout_seconds: u64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            mode: ExtractorMode::Auto,
            ytdlp_path: None,
            python_cmd: "python3".to_string(),
            socket_timeout_seconds: 30,
            timeout_seconds: 120,
        }
    }
}

impl ExtractorConfig {
    pub fn with_mode(mut self, mode: ExtractorMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_ytdlp_path(mut self, path: Option<String>) -> Self {
        self.ytdlp_path = path;
        self
    }
}

/// One entry of yt-dlp's `formats` array
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenditionCandidate {
    /// Format ID (e.g. "dash-1080p", "8")
    pub format_id: String,
    /// Container extension (mp4, webm, m4a)
    pub ext: String,
    /// Video codec; yt-dlp uses the literal "none" for audio-only
    pub vcodec: Option<String>,
    /// Audio codec; "none" for video-only
    pub acodec: Option<String>,
    /// Direct media URL
    pub url: Option<String>,
    /// Video height in pixels
    pub height: Option<u32>,
    /// Total bitrate in kbps
    pub tbr: Option<f64>,
}

impl RenditionCandidate {
    /// A missing codec field is unknown, not absent; only "none" rules a track out
    pub fn has_video(&self) -> bool {
        self.vcodec.as_deref() != Some("none")
    }

    pub fn has_audio(&self) -> bool {
        self.acodec.as_deref() != Some("none")
    }

    pub fn direct_url(&self) -> Option<&str> {
        self.url.as_deref().filter(|u| !u.is_empty())
    }

    pub fn is_mp4(&self) -> bool {
        self.ext == "mp4"
    }
}

/// Structured result of one extraction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionResult {
    pub title: Option<String>,
    /// Seconds
    pub duration: Option<f64>,
    /// Top-level `url` (may be a manifest)
    pub url: Option<String>,
    pub renditions: Vec<RenditionCandidate>,
}

/// Trait for media extraction backends
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    /// Name of the extractor (for logging)
    fn name(&self) -> &'static str;

    /// Extract metadata and candidate renditions without downloading
    async fn extract(
        &self,
        url: &str,
        options: &OptionsBundle,
    ) -> Result<ExtractionResult, DownloadError>;

    /// Transfer the media into `target`, returning the file actually written
    async fn download(
        &self,
        url: &str,
        options: &OptionsBundle,
        target: &DownloadTarget,
    ) -> Result<DownloadedFile, DownloadError>;
}
