// Error types for the extraction adapter

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DownloadError {
    /// The child process outlived the caller-side timeout and was killed
    #[error("Timed out after {0}s waiting for yt-dlp")]
    Timeout(u64),

    /// yt-dlp reported a socket/read timeout talking to Instagram
    #[error("{0}")]
    NetworkTimeout(String),

    /// Private post, login wall, or a session Instagram no longer accepts
    #[error("{0}")]
    LoginRequired(String),

    /// HTTP 429 or Instagram's "please wait a few minutes"
    #[error("{0}")]
    RateLimited(String),

    /// Deleted post, unsupported URL, nothing to extract
    #[error("{0}")]
    Unavailable(String),

    /// yt-dlp or python not found in system. The detail (a local path or
    /// interpreter message) is for logs only.
    #[error("yt-dlp is not available")]
    ToolNotFound(String),

    /// Failed to parse yt-dlp JSON output
    #[error("Parse error: {0}")]
    ParseError(String),

    /// yt-dlp exited non-zero for a reason we don't recognise
    #[error("{0}")]
    ExecutionError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DownloadError {
    /// Short machine-friendly label, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "timeout",
            Self::NetworkTimeout(_) => "network_timeout",
            Self::LoginRequired(_) => "login_required",
            Self::RateLimited(_) => "rate_limited",
            Self::Unavailable(_) => "unavailable",
            Self::ToolNotFound(_) => "tool_not_found",
            Self::ParseError(_) => "parse_error",
            Self::ExecutionError(_) => "execution_error",
            Self::Io(_) => "io",
        }
    }

    /// Operator hint logged next to the failure
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::LoginRequired(_) => Some(
                "configure INSTAGRAM_COOKIE_HEADER, INSTAGRAM_COOKIES or INSTAGRAM_COOKIES_FILE",
            ),
            Self::RateLimited(_) => Some("Instagram is throttling this IP; retry later or rotate cookies"),
            Self::ToolNotFound(_) => Some("install yt-dlp or set YTDLP_PATH / YTDLP_PYTHON"),
            Self::Timeout(_) | Self::NetworkTimeout(_) => {
                Some("raise INSTADL_REQUEST_TIMEOUT_SECS or check outbound connectivity")
            }
            _ => None,
        }
    }
}

// Classify a yt-dlp error line
impl From<String> for DownloadError {
    fn from(s: String) -> Self {
        let lower = s.to_lowercase();

        // Instagram bundles "rate-limit reached or login required" into one
        // message; cookies are the fix for both, so login wins
        if lower.contains("login required")
            || lower.contains("log in")
            || lower.contains("login_required")
            || lower.contains("private")
            || lower.contains("use --cookies")
        {
            return Self::LoginRequired(s);
        }

        if lower.contains("429") || lower.contains("rate-limit") || lower.contains("rate limit")
            || lower.contains("please wait a few minutes")
        {
            return Self::RateLimited(s);
        }

        if lower.contains("timed out") || lower.contains("timeout") {
            return Self::NetworkTimeout(s);
        }

        if lower.contains("command not found") || lower.contains("no module named yt_dlp") {
            return Self::ToolNotFound(s);
        }

        if lower.contains("unsupported url")
            || lower.contains("404")
            || lower.contains("not available")
            || lower.contains("does not exist")
            || lower.contains("no video formats found")
            || lower.contains("there is no video in this post")
        {
            return Self::Unavailable(s);
        }

        if lower.contains("invalid json") {
            return Self::ParseError(s);
        }

        Self::ExecutionError(s)
    }
}
