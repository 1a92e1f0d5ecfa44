// Helper functions for extractor implementations

use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command as TokioCommand;
use tokio::time::timeout;

use crate::downloader::errors::DownloadError;

/// Run command with timeout (shared utility).
///
/// The child is killed when the timeout fires; yt-dlp exposes no other
/// cancellation hook.
pub async fn run_output_with_timeout(
    program: &str,
    args: &[String],
    timeout_secs: u64,
) -> Result<std::process::Output, DownloadError> {
    let mut child = TokioCommand::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            // The program path stays in the log; clients only see the error's Display
            tracing::error!("Failed to start {}: {}", program, e);
            match e.kind() {
                ErrorKind::NotFound => DownloadError::ToolNotFound(program.to_string()),
                _ => DownloadError::ExecutionError("yt-dlp could not be started".to_string()),
            }
        })?;

    let mut stdout_pipe = child.stdout.take().ok_or_else(|| {
        DownloadError::ExecutionError("Failed to capture yt-dlp stdout".to_string())
    })?;
    let mut stderr_pipe = child.stderr.take().ok_or_else(|| {
        DownloadError::ExecutionError("Failed to capture yt-dlp stderr".to_string())
    })?;

    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stdout_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });

    match timeout(Duration::from_secs(timeout_secs), child.wait()).await {
        Ok(status_res) => {
            let status = status_res?;
            let stdout = stdout_task
                .await
                .map_err(|e| DownloadError::ExecutionError(format!("stdout task failed: {}", e)))??;
            let stderr = stderr_task
                .await
                .map_err(|e| DownloadError::ExecutionError(format!("stderr task failed: {}", e)))??;
            Ok(std::process::Output {
                status,
                stdout,
                stderr,
            })
        }
        Err(_) => {
            let _ = child.kill().await;
            stdout_task.abort();
            stderr_task.abort();
            Err(DownloadError::Timeout(timeout_secs))
        }
    }
}

/// Pick the line worth showing a client out of yt-dlp's stderr: the last
/// `ERROR:` line, else the last non-empty line.
pub fn summarize_stderr(stderr: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    lines
        .iter()
        .rev()
        .find(|l| l.starts_with("ERROR:"))
        .or_else(|| lines.last())
        .map(|l| l.to_string())
}
