//! Process configuration, read from the environment at startup.
//!
//! Credential variables are deliberately absent here: the options builder
//! re-reads them per request.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};

use crate::downloader::extractors::{ExtractorConfig, ExtractorMode};
use crate::downloader::options::{ExtractorDefaults, ENV_USER_AGENT};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// Downloads land in `<root>/videos`
    pub root: PathBuf,
    /// Public prefix the root is served under; always starts and ends with '/'
    pub url_prefix: String,
    /// Absolute base for download links; derived from the request when unset
    pub public_base_url: Option<String>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("media"),
            url_prefix: "/media/".to_string(),
            public_base_url: None,
        }
    }
}

impl MediaConfig {
    pub fn videos_dir(&self) -> PathBuf {
        self.root.join("videos")
    }
}

#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub media: MediaConfig,
    pub extractor: ExtractorConfig,
    pub defaults: ExtractorDefaults,
}

impl AppConfig {
    /// Load from the environment, after pulling in a `.env` file if present
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {:?}", path);
        }

        let mut config = Self::default();

        if let Some(host) = env_var("INSTADL_HOST") {
            config.server.host = host;
        }
        config.server.port = env_parse("INSTADL_PORT", config.server.port)?;

        if let Some(root) = env_var("INSTADL_MEDIA_ROOT") {
            config.media.root = PathBuf::from(root);
        }
        if let Some(prefix) = env_var("INSTADL_MEDIA_URL") {
            config.media.url_prefix = normalize_prefix(&prefix);
        }
        config.media.public_base_url =
            env_var("INSTADL_PUBLIC_BASE_URL").map(|u| u.trim_end_matches('/').to_string());

        config.extractor.mode = env_parse("YTDLP_MODE", config.extractor.mode)?;
        config.extractor.ytdlp_path = env_var("YTDLP_PATH");
        if let Some(python) = env_var("YTDLP_PYTHON") {
            config.extractor.python_cmd = python;
        }
        config.extractor.socket_timeout_seconds =
            env_parse("YTDLP_SOCKET_TIMEOUT_SECS", config.extractor.socket_timeout_seconds)?;
        config.extractor.timeout_seconds =
            env_parse("INSTADL_REQUEST_TIMEOUT_SECS", config.extractor.timeout_seconds)?;

        config.defaults.retries = env_parse("YTDLP_RETRIES", config.defaults.retries)?;
        if let Some(ua) = env_var(ENV_USER_AGENT) {
            config.defaults.user_agent = ua;
        }

        validate_config(&config)?;
        Ok(config)
    }
}

/// Validate configuration
pub fn validate_config(config: &AppConfig) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }
    if config.extractor.timeout_seconds == 0 {
        anyhow::bail!("INSTADL_REQUEST_TIMEOUT_SECS must be at least 1");
    }
    if config.extractor.mode == ExtractorMode::Python && config.extractor.python_cmd.is_empty() {
        anyhow::bail!("YTDLP_PYTHON cannot be empty in python mode");
    }
    Ok(())
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_var(name) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("Invalid value for {}: {:?}", name, raw)),
        None => Ok(default),
    }
}

/// "media" -> "/media/"
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", trimmed)
    }
}
