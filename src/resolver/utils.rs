// Helper functions shared across the resolver

use std::path::PathBuf;
use std::process::Stdio;

use regex::Regex;
use tokio::io::AsyncReadExt;
use tokio::process::Command as TokioCommand;
use tokio::time::{timeout, Duration as TokioDuration};

lazy_static::lazy_static! {
    // Covers CSI color/style sequences and the short two-byte escapes.
    static ref ANSI_RE: Regex =
        Regex::new(r"\x1B(?:[@-Z\\-_]|\[[0-?]*[ -/]*[@-~])").unwrap();
    static ref ILLEGAL_FILENAME_RE: Regex = Regex::new(r#"[\\/*?:"<>|]"#).unwrap();
}

/// Remove terminal styling control sequences from a string.
pub fn strip_ansi(text: &str) -> String {
    ANSI_RE.replace_all(text, "").into_owned()
}

/// Sanitize a base filename: strip characters that are illegal on common
/// filesystems and trim whitespace. Empty results fall back to a
/// timestamped default so two downloads never silently collide.
pub fn sanitize_filename(base: Option<&str>) -> String {
    let sanitized = ILLEGAL_FILENAME_RE
        .replace_all(base.unwrap_or(""), "")
        .trim()
        .to_string();

    if !sanitized.is_empty() {
        return sanitized;
    }

    let format = time::macros::format_description!("[year][month][day]_[hour][minute][second]");
    let stamp = time::OffsetDateTime::now_utc()
        .format(&format)
        .unwrap_or_else(|_| "download".to_string());
    format!("media_{}", stamp)
}

/// Canonical form of a link for cache keying: parsed and re-serialized so
/// host-case and default-port differences collapse to one key. Text that
/// does not parse is keyed as typed (the validator rejects it anyway).
pub fn normalize_link(raw: &str) -> String {
    match url::Url::parse(raw.trim()) {
        Ok(parsed) => parsed.to_string(),
        Err(_) => raw.trim().to_string(),
    }
}

/// Default directory download output is rooted at: the platform Downloads
/// directory, then the home directory, then the working directory.
pub fn default_output_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Clamp status text to a display-friendly length.
pub fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Human-readable size text.
pub fn format_size(bytes: u64) -> String {
    let mb = bytes as f64 / 1_048_576.0;
    if mb >= 1024.0 {
        format!("{:.1} GB", mb / 1024.0)
    } else {
        format!("{:.2} MB", mb)
    }
}

/// Run a command to completion with a timeout, capturing stdout/stderr.
pub async fn run_output_with_timeout(
    program: &str,
    args: Vec<String>,
    timeout_secs: u64,
) -> Result<std::process::Output, String> {
    let mut child = TokioCommand::new(program)
        .args(&args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| format!("Failed to start {}: {}", program, e))?;

    let mut stdout_pipe = child
        .stdout
        .take()
        .ok_or_else(|| format!("Failed to capture stdout from {}", program))?;
    let mut stderr_pipe = child
        .stderr
        .take()
        .ok_or_else(|| format!("Failed to capture stderr from {}", program))?;

    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stdout_pipe
            .read_to_end(&mut buf)
            .await
            .map_err(|e| format!("Failed to read stdout: {}", e))?;
        Ok::<Vec<u8>, String>(buf)
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr_pipe
            .read_to_end(&mut buf)
            .await
            .map_err(|e| format!("Failed to read stderr: {}", e))?;
        Ok::<Vec<u8>, String>(buf)
    });

    let waited = timeout(TokioDuration::from_secs(timeout_secs), child.wait()).await;
    match waited {
        Ok(status_res) => {
            let status = status_res.map_err(|e| format!("Failed to wait for {}: {}", program, e))?;
            let stdout = stdout_task
                .await
                .map_err(|e| format!("stdout task failed: {}", e))??;
            let stderr = stderr_task
                .await
                .map_err(|e| format!("stderr task failed: {}", e))??;
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
            Err(format!("Timed out after {}s", timeout_secs))
        }
    }
}
