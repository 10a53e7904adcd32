// CLI MediaExtractor - drives the native `yt-dlp` binary
//
// Metadata and size queries use `--dump-json` (no payload transfer); the
// download streams stdout line by line and converts yt-dlp's progress
// output into ProgressEvents.

use std::process::Stdio;

use async_trait::async_trait;
use regex::Regex;
use std::process::Command as StdCommand;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command as TokioCommand;

use super::traits::{MediaExtractor, ProgressFn};
use crate::resolver::errors::ExtractError;
use crate::resolver::format_spec::FormatSpec;
use crate::resolver::models::{
    DownloadOutcome, FormatDescriptor, FormatKind, MediaProbe, ProgressEvent, ProgressStatus,
    ThumbnailRef,
};
use crate::resolver::utils::{run_output_with_timeout, strip_ansi};

lazy_static::lazy_static! {
    // [download]  42.5% of ~ 343.72MiB at  420.30KiB/s ETA 12:32
    static ref PROGRESS_RE: Regex =
        Regex::new(r"\[download\]\s+([\d.]+)%\s+of\s+~?\s*([\d.]+)\s*([KMGT]?i?B)").unwrap();
    static ref DEST_RE: Regex = Regex::new(r"\[download\]\s+Destination:\s+(.+)").unwrap();
    static ref MERGE_RE: Regex = Regex::new(r"\[Merger\]\s+Merging").unwrap();
    static ref ALREADY_RE: Regex = Regex::new(r"has already been downloaded").unwrap();
}

/// One interpreted line of yt-dlp stdout.
#[derive(Debug, Clone, PartialEq)]
enum ProgressLine {
    Percent { percent: f32, total_bytes: Option<u64> },
    Destination(String),
    Merging,
    AlreadyDone,
}

fn parse_size_token(value: &str, unit: &str) -> Option<u64> {
    let value: f64 = value.parse().ok()?;
    let multiplier: f64 = match unit {
        "B" => 1.0,
        "KiB" | "KB" => 1024.0,
        "MiB" | "MB" => 1024.0 * 1024.0,
        "GiB" | "GB" => 1024.0 * 1024.0 * 1024.0,
        "TiB" | "TB" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        _ => return None,
    };
    Some((value * multiplier) as u64)
}

/// Interpret a single stdout line. Styling sequences are stripped first;
/// yt-dlp colors its progress output on some terminals.
fn parse_progress_line(line: &str) -> Option<ProgressLine> {
    let line = strip_ansi(line);

    if let Some(caps) = PROGRESS_RE.captures(&line) {
        let percent: f32 = caps.get(1)?.as_str().parse().ok()?;
        let total_bytes = match (caps.get(2), caps.get(3)) {
            (Some(v), Some(u)) => parse_size_token(v.as_str(), u.as_str()),
            _ => None,
        };
        return Some(ProgressLine::Percent {
            percent: percent.min(100.0),
            total_bytes,
        });
    }

    if let Some(caps) = DEST_RE.captures(&line) {
        let filename = caps.get(1).map(|m| m.as_str()).unwrap_or("file");
        let short_name = filename.rsplit('/').next().unwrap_or(filename).to_string();
        return Some(ProgressLine::Destination(short_name));
    }

    if MERGE_RE.is_match(&line) {
        return Some(ProgressLine::Merging);
    }

    if ALREADY_RE.is_match(&line) {
        return Some(ProgressLine::AlreadyDone);
    }

    None
}

/// yt-dlp backed extractor.
pub struct CliExtractor {
    ytdlp_path: String,
    timeout_secs: u64,
}

impl CliExtractor {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            ytdlp_path: Self::find_ytdlp(),
            timeout_secs,
        }
    }

    /// Find the yt-dlp binary across common install locations.
    fn find_ytdlp() -> String {
        let common_paths = vec![
            "/opt/homebrew/bin/yt-dlp", // Homebrew on Apple Silicon
            "/usr/local/bin/yt-dlp",    // Homebrew on Intel Mac
            "/usr/bin/yt-dlp",          // System installation
            "yt-dlp",                   // In PATH
        ];

        for path in common_paths {
            if std::path::Path::new(path).exists() {
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

    fn query_args(&self, url: &str, format: Option<&FormatSpec>) -> Vec<String> {
        let mut args = vec![
            "--dump-json".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--socket-timeout".to_string(),
            self.timeout_secs.to_string(),
            "--retries".to_string(),
            "2".to_string(),
        ];
        if let Some(spec) = format {
            args.push("-f".to_string());
            args.push(spec.render());
        }
        args.push(url.to_string());
        args
    }

    /// Map yt-dlp's format JSON onto our capability model. Video-only DASH
    /// streams still count as video capability: the download merges them
    /// with best audio.
    fn parse_probe(stdout: &[u8]) -> Result<MediaProbe, ExtractError> {
        let json_str = String::from_utf8_lossy(stdout);
        let json: serde_json::Value = serde_json::from_str(&json_str)
            .map_err(|e| ExtractError::ParseError(format!("Invalid JSON: {}", e)))?;

        let mut formats = Vec::new();
        if let Some(list) = json["formats"].as_array() {
            for f in list {
                let vcodec = f["vcodec"].as_str().unwrap_or("none");
                let acodec = f["acodec"].as_str().unwrap_or("none");
                let has_video = vcodec != "none" && !vcodec.is_empty();
                let has_audio = acodec != "none" && !acodec.is_empty();

                if has_video {
                    formats.push(FormatDescriptor {
                        kind: FormatKind::VideoWithAudio,
                        audio_bitrate_kbps: f["abr"].as_f64().map(|a| a as u32),
                        video_height_px: f["height"].as_u64().map(|h| h as u32),
                    });
                } else if has_audio {
                    formats.push(FormatDescriptor {
                        kind: FormatKind::AudioOnly,
                        audio_bitrate_kbps: f["abr"].as_f64().map(|a| a as u32),
                        video_height_px: None,
                    });
                }
                // Storyboard/image formats carry neither codec; skip them.
            }
        }

        Ok(MediaProbe {
            title: json["title"].as_str().unwrap_or("Unknown").to_string(),
            thumbnail: ThumbnailRef(json["thumbnail"].as_str().unwrap_or("").to_string()),
            formats,
        })
    }

    /// Per-part sizes for a resolved format selection. A merged selection
    /// lists its parts under `requested_formats`; a single progressive
    /// stream reports a top-level size.
    fn parse_part_sizes(stdout: &[u8]) -> Result<Vec<Option<u64>>, ExtractError> {
        let json_str = String::from_utf8_lossy(stdout);
        let json: serde_json::Value = serde_json::from_str(&json_str)
            .map_err(|e| ExtractError::ParseError(format!("Invalid JSON: {}", e)))?;

        let part_size = |f: &serde_json::Value| -> Option<u64> {
            f["filesize"].as_u64().or_else(|| f["filesize_approx"].as_u64())
        };

        if let Some(parts) = json["requested_formats"].as_array() {
            return Ok(parts.iter().map(part_size).collect());
        }

        Ok(vec![part_size(&json)])
    }

    fn download_args(&self, url: &str, spec: &FormatSpec, output_template: &str) -> Vec<String> {
        let mut args = vec![
            "-f".to_string(),
            spec.render(),
            "--no-playlist".to_string(),
            "--newline".to_string(),
            "--no-warnings".to_string(),
            "--socket-timeout".to_string(),
            self.timeout_secs.to_string(),
            "--retries".to_string(),
            "5".to_string(),
            "-o".to_string(),
            output_template.to_string(),
        ];

        if spec.is_audio() {
            args.extend(vec![
                "-x".to_string(),
                "--audio-format".to_string(),
                "mp3".to_string(),
            ]);
        } else {
            args.push("--merge-output-format".to_string());
            args.push("mp4".to_string());
        }

        args.push(url.to_string());
        args
    }
}

impl Default for CliExtractor {
    fn default() -> Self {
        Self::new(30)
    }
}

#[async_trait]
impl MediaExtractor for CliExtractor {
    fn name(&self) -> &'static str {
        "cli-yt-dlp"
    }

    fn is_available(&self) -> bool {
        match StdCommand::new(&self.ytdlp_path).arg("--version").output() {
            Ok(out) => out.status.success(),
            Err(_) => false,
        }
    }

    async fn query_metadata(&self, url: &str) -> Result<MediaProbe, ExtractError> {
        let args = self.query_args(url, None);
        log::debug!("[CliExtractor] metadata query: {} {}", self.ytdlp_path, args.join(" "));

        let output = run_output_with_timeout(&self.ytdlp_path, args, self.timeout_secs)
            .await
            .map_err(ExtractError::ExecutionError)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            log::warn!("[CliExtractor] metadata query failed: {}", stderr);
            return Err(ExtractError::from(stderr));
        }

        Self::parse_probe(&output.stdout)
    }

    async fn query_format_size(
        &self,
        url: &str,
        spec: &FormatSpec,
    ) -> Result<Vec<Option<u64>>, ExtractError> {
        let args = self.query_args(url, Some(spec));
        log::debug!("[CliExtractor] size query: -f {}", spec);

        let output = run_output_with_timeout(&self.ytdlp_path, args, self.timeout_secs)
            .await
            .map_err(ExtractError::ExecutionError)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(ExtractError::from(stderr));
        }

        Self::parse_part_sizes(&output.stdout)
    }

    async fn download(
        &self,
        url: &str,
        spec: &FormatSpec,
        output_template: &str,
        progress: ProgressFn,
    ) -> Result<DownloadOutcome, ExtractError> {
        let args = self.download_args(url, spec, output_template);
        log::info!("[CliExtractor] starting download: -f {}", spec);

        let mut child = TokioCommand::new(&self.ytdlp_path)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ExtractError::ExecutionError(format!("Failed to start yt-dlp: {}", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ExtractError::ExecutionError("Failed to capture stdout".to_string()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| ExtractError::ExecutionError("Failed to capture stderr".to_string()))?;

        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stderr.read_to_end(&mut buf).await;
            String::from_utf8_lossy(&buf).to_string()
        });

        let mut artifact = String::new();
        let mut total_bytes: Option<u64> = None;

        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            match parse_progress_line(&line) {
                Some(ProgressLine::Percent { percent, total_bytes: total }) => {
                    if total.is_some() {
                        total_bytes = total;
                    }
                    (*progress)(ProgressEvent {
                        status: ProgressStatus::Downloading,
                        percent: Some(percent),
                        artifact: artifact.clone(),
                    });
                }
                Some(ProgressLine::Destination(name)) => {
                    artifact = name;
                    (*progress)(ProgressEvent {
                        status: ProgressStatus::Downloading,
                        percent: Some(0.0),
                        artifact: artifact.clone(),
                    });
                }
                Some(ProgressLine::Merging) => {
                    (*progress)(ProgressEvent {
                        status: ProgressStatus::Downloading,
                        percent: Some(99.0),
                        artifact: artifact.clone(),
                    });
                }
                Some(ProgressLine::AlreadyDone) | None => {}
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| ExtractError::ExecutionError(format!("Process error: {}", e)))?;
        let stderr_output = stderr_task.await.unwrap_or_default();

        if !status.success() {
            log::warn!("[CliExtractor] download failed: {}", stderr_output);
            return Err(ExtractError::from(stderr_output));
        }

        (*progress)(ProgressEvent {
            status: ProgressStatus::Finished,
            percent: Some(100.0),
            artifact: artifact.clone(),
        });

        Ok(DownloadOutcome {
            artifact,
            total_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_percent_line() {
        let parsed =
            parse_progress_line("[download]  42.5% of ~ 10.00MiB at  420.30KiB/s ETA 00:12");
        assert_eq!(
            parsed,
            Some(ProgressLine::Percent {
                percent: 42.5,
                total_bytes: Some(10 * 1024 * 1024),
            })
        );
    }

    #[test]
    fn test_parse_percent_line_with_styling() {
        let parsed = parse_progress_line("\x1b[0;94m[download]\x1b[0m  42.0% of 1.00KiB at 1KiB/s");
        assert_eq!(
            parsed,
            Some(ProgressLine::Percent {
                percent: 42.0,
                total_bytes: Some(1024),
            })
        );
    }

    #[test]
    fn test_parse_destination_line() {
        let parsed = parse_progress_line("[download] Destination: /tmp/out/My Song.m4a");
        assert_eq!(parsed, Some(ProgressLine::Destination("My Song.m4a".to_string())));
    }

    #[test]
    fn test_parse_unrelated_line() {
        assert_eq!(parse_progress_line("[info] Extracting URL"), None);
    }

    #[test]
    fn test_parse_probe_maps_format_kinds() {
        let json = br#"{
            "title": "Some Clip",
            "thumbnail": "https://example.com/t.jpg",
            "formats": [
                {"vcodec": "none", "acodec": "opus", "abr": 130.0},
                {"vcodec": "avc1.4d401f", "acodec": "none", "height": 1080},
                {"vcodec": "none", "acodec": "none"}
            ]
        }"#;

        let probe = CliExtractor::parse_probe(json).unwrap();
        assert_eq!(probe.title, "Some Clip");
        assert_eq!(probe.formats.len(), 2);
        assert_eq!(probe.formats[0].kind, FormatKind::AudioOnly);
        assert_eq!(probe.formats[0].audio_bitrate_kbps, Some(130));
        assert_eq!(probe.formats[1].kind, FormatKind::VideoWithAudio);
        assert_eq!(probe.formats[1].video_height_px, Some(1080));
    }

    #[test]
    fn test_parse_part_sizes_from_requested_formats() {
        let json = br#"{
            "requested_formats": [
                {"filesize": 1000},
                {"filesize_approx": 2000},
                {"height": 720}
            ]
        }"#;

        let parts = CliExtractor::parse_part_sizes(json).unwrap();
        assert_eq!(parts, vec![Some(1000), Some(2000), None]);
    }

    #[test]
    fn test_parse_part_sizes_progressive_fallback() {
        let json = br#"{"filesize": 4321}"#;
        let parts = CliExtractor::parse_part_sizes(json).unwrap();
        assert_eq!(parts, vec![Some(4321)]);
    }

    #[test]
    fn test_parse_probe_rejects_bad_json() {
        assert!(matches!(
            CliExtractor::parse_probe(b"not json"),
            Err(ExtractError::ParseError(_))
        ));
    }
}
