// yt-dlp MediaExtractor - runs yt-dlp as a child process
//
// Two ways to reach it:
// - CLI mode: native `yt-dlp` binary
// - Python mode: `python3 -m yt_dlp` (for hosts that only have the pip package)
//
// yt-dlp is a black box here: we hand it a URL plus options and read back
// its JSON, or the path of the file it wrote.

use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command as StdCommand;

use tempfile::NamedTempFile;

use super::traits::{
    ExtractionResult, ExtractorConfig, ExtractorMode, MediaExtractor, RenditionCandidate,
};
use crate::downloader::errors::DownloadError;
use crate::downloader::models::{CookieSource, DownloadTarget, DownloadedFile, OptionsBundle};
use crate::downloader::utils::{run_output_with_timeout, summarize_stderr};

/// Cookie arguments plus the scratch jar backing them, if any.
/// The jar is deleted when this is dropped, i.e. after the child exits.
struct PreparedCookies {
    args: Vec<String>,
    _jar: Option<NamedTempFile>,
}

impl PreparedCookies {
    fn prepare(source: &CookieSource) -> Result<Self, DownloadError> {
        match source {
            CookieSource::Header(header) => Ok(Self {
                args: vec!["--add-header".to_string(), format!("Cookie:{}", header)],
                _jar: None,
            }),
            CookieSource::InlineJar(content) => {
                // Unique per call: concurrent requests never share a jar
                let mut jar = tempfile::Builder::new()
                    .prefix("instadl-cookies-")
                    .suffix(".txt")
                    .tempfile()?;
                jar.write_all(content.as_bytes())?;
                if !content.ends_with('\n') {
                    jar.write_all(b"\n")?;
                }
                jar.flush()?;
                Ok(Self {
                    args: vec![
                        "--cookies".to_string(),
                        jar.path().to_string_lossy().into_owned(),
                    ],
                    _jar: Some(jar),
                })
            }
            CookieSource::JarFile(path) => Ok(Self {
                args: vec!["--cookies".to_string(), path.to_string_lossy().into_owned()],
                _jar: None,
            }),
            CookieSource::Anonymous => Ok(Self {
                args: Vec::new(),
                _jar: None,
            }),
        }
    }
}

/// yt-dlp backed extractor
pub struct YtDlpExtractor {
    config: ExtractorConfig,
    /// Mode after resolving Auto
    mode: ExtractorMode,
    program: String,
    prefix_args: Vec<String>,
}

impl YtDlpExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        let ytdlp_path = config.ytdlp_path.clone().unwrap_or_else(Self::find_ytdlp);

        let mode = match config.mode {
            ExtractorMode::Auto => {
                if Self::has_ytdlp_binary(&ytdlp_path) {
                    ExtractorMode::Cli
                } else if Self::has_ytdlp_module(&config.python_cmd) {
                    ExtractorMode::Python
                } else {
                    tracing::warn!("Neither yt-dlp binary nor Python yt_dlp module found");
                    ExtractorMode::Cli
                }
            }
            other => other,
        };

        let (program, prefix_args) = match mode {
            ExtractorMode::Python => (
                config.python_cmd.clone(),
                vec!["-m".to_string(), "yt_dlp".to_string()],
            ),
            _ => (ytdlp_path, Vec::new()),
        };

        tracing::debug!("yt-dlp extractor using {} mode via {}", mode, program);

        Self {
            config,
            mode,
            program,
            prefix_args,
        }
    }

    /// Build the extractor and check it can run, on the blocking pool.
    /// Auto resolution and the availability check both wait on probe processes.
    pub async fn detect(config: ExtractorConfig) -> Result<(Self, bool), DownloadError> {
        tokio::task::spawn_blocking(move || {
            let extractor = Self::new(config);
            let available = extractor.is_available();
            (extractor, available)
        })
        .await
        .map_err(|e| DownloadError::ExecutionError(format!("yt-dlp probe task failed: {}", e)))
    }

    /// Find yt-dlp binary
    fn find_ytdlp() -> String {
        let common_paths = [
            "/opt/homebrew/bin/yt-dlp", // Homebrew on Apple Silicon
            "/usr/local/bin/yt-dlp",    // Homebrew on Intel Mac, pip --user on Linux
            "/usr/bin/yt-dlp",          // System installation
        ];

        for path in common_paths {
            if Path::new(path).exists() {
                return path.to_string();
            }
        }

        if let Ok(output) = StdCommand::new("which").arg("yt-dlp").output() {
            if output.status.success() {
                if let Ok(path) = String::from_utf8(output.stdout) {
                    let trimmed = path.trim();
                    if !trimmed.is_empty() {
                        return trimmed.to_string();
                    }
                }
            }
        }

        "yt-dlp".to_string()
    }

    fn has_ytdlp_binary(path: &str) -> bool {
        StdCommand::new(path)
            .arg("--version")
            .output()
            .map(|out| out.status.success())
            .unwrap_or(false)
    }

    fn has_ytdlp_module(python: &str) -> bool {
        StdCommand::new(python)
            .args(["-c", "import yt_dlp"])
            .output()
            .map(|out| out.status.success())
            .unwrap_or(false)
    }

    pub fn mode(&self) -> ExtractorMode {
        self.mode
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn is_available(&self) -> bool {
        match self.mode {
            ExtractorMode::Python => Self::has_ytdlp_module(&self.program),
            _ => Self::has_ytdlp_binary(&self.program),
        }
    }

    /// `yt-dlp --version`, if it runs
    pub async fn version(&self) -> Option<String> {
        let mut args = self.prefix_args.clone();
        args.push("--version".to_string());
        let out = run_output_with_timeout(&self.program, &args, 15).await.ok()?;
        if !out.status.success() {
            return None;
        }
        let v = String::from_utf8_lossy(&out.stdout).trim().to_string();
        (!v.is_empty()).then_some(v)
    }

    /// Arguments shared by extraction and download
    fn common_args(&self, options: &OptionsBundle) -> Vec<String> {
        let retries = options.retries.to_string();
        let mut args = self.prefix_args.clone();
        args.extend([
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--socket-timeout".to_string(),
            self.config.socket_timeout_seconds.to_string(),
            "--retries".to_string(),
            retries.clone(),
            "--extractor-retries".to_string(),
            retries,
            "--user-agent".to_string(),
            options.identity.user_agent.clone(),
            "-f".to_string(),
            options.format_preference.clone(),
        ]);
        args
    }

    fn build_extract_args(&self, url: &str, options: &OptionsBundle, cookies: &[String]) -> Vec<String> {
        let mut args = self.common_args(options);
        args.extend_from_slice(cookies);
        args.push("--dump-single-json".to_string());
        args.push(url.to_string());
        args
    }

    fn build_download_args(
        &self,
        url: &str,
        options: &OptionsBundle,
        target: &DownloadTarget,
        cookies: &[String],
    ) -> Vec<String> {
        let mut args = self.common_args(options);
        args.extend_from_slice(cookies);
        args.extend([
            "-o".to_string(),
            target.output_template().to_string_lossy().into_owned(),
            "--merge-output-format".to_string(),
            "mp4".to_string(),
            "--print".to_string(),
            "after_move:filepath".to_string(),
            "--no-simulate".to_string(),
            url.to_string(),
        ]);
        args
    }

    async fn run(&self, args: &[String]) -> Result<std::process::Output, DownloadError> {
        let out = run_output_with_timeout(&self.program, args, self.config.timeout_seconds).await?;
        if out.status.success() {
            return Ok(out);
        }

        let message = summarize_stderr(&out.stderr)
            .unwrap_or_else(|| format!("yt-dlp exited with {}", out.status));
        Err(DownloadError::from(message))
    }

    /// Parse `--dump-single-json` output
    pub fn parse_info(stdout: &[u8]) -> Result<ExtractionResult, DownloadError> {
        let json: serde_json::Value = serde_json::from_slice(stdout)
            .map_err(|e| DownloadError::ParseError(format!("Invalid JSON: {}", e)))?;

        if !json.is_object() {
            return Err(DownloadError::ParseError(
                "Expected a JSON object from yt-dlp".to_string(),
            ));
        }

        Ok(ExtractionResult {
            title: json["title"].as_str().map(|s| s.to_string()),
            duration: json["duration"].as_f64(),
            url: json["url"].as_str().map(|s| s.to_string()),
            renditions: Self::parse_formats(&json),
        })
    }

    /// Parse formats array; single-format extractions have none
    fn parse_formats(json: &serde_json::Value) -> Vec<RenditionCandidate> {
        let Some(formats_array) = json["formats"].as_array() else {
            return Vec::new();
        };

        formats_array
            .iter()
            .map(|f| RenditionCandidate {
                format_id: f["format_id"].as_str().unwrap_or("").to_string(),
                ext: f["ext"].as_str().unwrap_or("").to_string(),
                vcodec: f["vcodec"].as_str().map(|s| s.to_string()),
                acodec: f["acodec"].as_str().map(|s| s.to_string()),
                url: f["url"].as_str().map(|s| s.to_string()),
                height: f["height"]
                    .as_u64()
                    .or_else(|| f["height"].as_f64().map(|h| h as u64))
                    .map(|h| h as u32),
                tbr: f["tbr"].as_f64(),
            })
            .collect()
    }

    /// Final path of a download: what yt-dlp printed, else the file in
    /// `target.dir` carrying our stem
    async fn locate_download(stdout: &[u8], target: &DownloadTarget) -> Result<PathBuf, DownloadError> {
        let printed = String::from_utf8_lossy(stdout)
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .last()
            .map(PathBuf::from);

        if let Some(path) = printed {
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                return Ok(path);
            }
        }

        let prefix = format!("{}.", target.stem);
        let mut entries = tokio::fs::read_dir(&target.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            // Skip yt-dlp's leftovers from an interrupted merge
            if name.starts_with(&prefix) && !name.ends_with(".part") && !name.ends_with(".ytdl") {
                return Ok(entry.path());
            }
        }

        Err(DownloadError::ExecutionError(
            "yt-dlp finished but no output file was found".to_string(),
        ))
    }
}

#[async_trait]
impl MediaExtractor for YtDlpExtractor {
    fn name(&self) -> &'static str {
        match self.mode {
            ExtractorMode::Python => "python-yt-dlp",
            _ => "cli-yt-dlp",
        }
    }

    async fn extract(
        &self,
        url: &str,
        options: &OptionsBundle,
    ) -> Result<ExtractionResult, DownloadError> {
        let cookies = PreparedCookies::prepare(&options.identity.cookies)?;
        let args = self.build_extract_args(url, options, &cookies.args);

        tracing::debug!(
            "[{}] extracting {} (format '{}', cookies: {})",
            self.name(),
            url,
            options.format_preference,
            options.identity.cookies.label()
        );

        let out = self.run(&args).await?;
        Self::parse_info(&out.stdout)
    }

    async fn download(
        &self,
        url: &str,
        options: &OptionsBundle,
        target: &DownloadTarget,
    ) -> Result<DownloadedFile, DownloadError> {
        tokio::fs::create_dir_all(&target.dir).await?;

        let cookies = PreparedCookies::prepare(&options.identity.cookies)?;
        let args = self.build_download_args(url, options, target, &cookies.args);

        tracing::debug!(
            "[{}] downloading {} into {:?} as {}.*",
            self.name(),
            url,
            target.dir,
            target.stem
        );

        let out = self.run(&args).await?;
        let path = Self::locate_download(&out.stdout, target).await?;
        Ok(DownloadedFile::new(path))
    }
}
