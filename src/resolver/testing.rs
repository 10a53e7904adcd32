// Test doubles shared by the resolver test modules

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::errors::ExtractError;
use super::extractors::traits::{MediaExtractor, ProgressFn};
use super::format_spec::FormatSpec;
use super::models::{
    DownloadOutcome, FormatDescriptor, FormatKind, MediaProbe, ProgressEvent, QualityTier,
    ThumbnailRef,
};
use super::surface::Surface;

/// Build a probe advertising the given audio bitrate and video height.
pub fn make_probe(title: &str, max_abr: Option<u32>, max_height: Option<u32>) -> MediaProbe {
    let mut formats = Vec::new();
    if let Some(abr) = max_abr {
        formats.push(FormatDescriptor {
            kind: FormatKind::AudioOnly,
            audio_bitrate_kbps: Some(abr),
            video_height_px: None,
        });
    }
    if let Some(height) = max_height {
        formats.push(FormatDescriptor {
            kind: FormatKind::VideoWithAudio,
            audio_bitrate_kbps: None,
            video_height_px: Some(height),
        });
    }
    MediaProbe {
        title: title.to_string(),
        thumbnail: ThumbnailRef::default(),
        formats,
    }
}

/// Surface that records every call for later assertions.
#[derive(Default)]
pub struct RecordingSurface {
    link_statuses: Mutex<Vec<String>>,
    titles: Mutex<Vec<String>>,
    thumbnail_images: Mutex<Vec<Vec<u8>>>,
    clears: AtomicUsize,
    quality_sets: Mutex<Vec<(Vec<&'static str>, Option<&'static str>)>>,
    size_texts: Mutex<Vec<String>>,
    download_statuses: Mutex<Vec<String>>,
    percents: Mutex<Vec<Option<f32>>>,
    controls: Mutex<Vec<bool>>,
    revealed: Mutex<Vec<PathBuf>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn link_statuses(&self) -> Vec<String> {
        self.link_statuses.lock().unwrap().clone()
    }

    pub fn last_link_status(&self) -> Option<String> {
        self.link_statuses.lock().unwrap().last().cloned()
    }

    pub fn titles(&self) -> Vec<String> {
        self.titles.lock().unwrap().clone()
    }

    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }

    pub fn last_quality(&self) -> Option<(Vec<&'static str>, Option<&'static str>)> {
        self.quality_sets.lock().unwrap().last().cloned()
    }

    pub fn size_texts(&self) -> Vec<String> {
        self.size_texts.lock().unwrap().clone()
    }

    pub fn last_size_text(&self) -> Option<String> {
        self.size_texts.lock().unwrap().last().cloned()
    }

    pub fn download_statuses(&self) -> Vec<String> {
        self.download_statuses.lock().unwrap().clone()
    }

    pub fn last_download_status(&self) -> Option<String> {
        self.download_statuses.lock().unwrap().last().cloned()
    }

    pub fn last_percent(&self) -> Option<Option<f32>> {
        self.percents.lock().unwrap().last().cloned()
    }

    pub fn last_controls_enabled(&self) -> Option<bool> {
        self.controls.lock().unwrap().last().copied()
    }

    pub fn revealed(&self) -> Vec<PathBuf> {
        self.revealed.lock().unwrap().clone()
    }
}

impl Surface for RecordingSurface {
    fn set_link_status(&self, text: &str) {
        self.link_statuses.lock().unwrap().push(text.to_string());
    }

    fn set_metadata_display(&self, title: &str, _thumbnail: &ThumbnailRef) {
        self.titles.lock().unwrap().push(title.to_string());
    }

    fn set_thumbnail_image(&self, bytes: Vec<u8>) {
        self.thumbnail_images.lock().unwrap().push(bytes);
    }

    fn clear_metadata_display(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
    }

    fn set_quality_options(&self, supported: &[QualityTier], selected: Option<QualityTier>) {
        self.quality_sets.lock().unwrap().push((
            supported.iter().map(|t| t.label).collect(),
            selected.map(|t| t.label),
        ));
    }

    fn set_size_display(&self, text: &str) {
        self.size_texts.lock().unwrap().push(text.to_string());
    }

    fn set_download_status(&self, text: &str) {
        self.download_statuses.lock().unwrap().push(text.to_string());
    }

    fn set_progress_percent(&self, percent: Option<f32>) {
        self.percents.lock().unwrap().push(percent);
    }

    fn set_controls_enabled(&self, enabled: bool) {
        self.controls.lock().unwrap().push(enabled);
    }

    fn reveal_directory(&self, path: &Path) {
        self.revealed.lock().unwrap().push(path.to_path_buf());
    }
}

/// Extractor whose responses and latencies are scripted per URL.
pub struct ScriptedExtractor {
    probes: Mutex<HashMap<String, Result<MediaProbe, ExtractError>>>,
    fetch_delays_ms: Mutex<HashMap<String, u64>>,
    parts: Mutex<HashMap<String, Result<Vec<Option<u64>>, ExtractError>>>,
    size_delay_ms: Mutex<u64>,
    pub metadata_calls: AtomicUsize,
    pub size_calls: AtomicUsize,
    download_result: Mutex<Result<DownloadOutcome, ExtractError>>,
    download_events: Mutex<Vec<ProgressEvent>>,
}

impl Default for ScriptedExtractor {
    fn default() -> Self {
        Self {
            probes: Mutex::new(HashMap::new()),
            fetch_delays_ms: Mutex::new(HashMap::new()),
            parts: Mutex::new(HashMap::new()),
            size_delay_ms: Mutex::new(0),
            metadata_calls: AtomicUsize::new(0),
            size_calls: AtomicUsize::new(0),
            download_result: Mutex::new(Ok(DownloadOutcome {
                artifact: "out.mp3".to_string(),
                total_bytes: Some(1_048_576),
            })),
            download_events: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_probe(self, url: &str, probe: MediaProbe) -> Self {
        self.probes.lock().unwrap().insert(url.to_string(), Ok(probe));
        self
    }

    pub fn with_probe_error(self, url: &str, error: ExtractError) -> Self {
        self.probes.lock().unwrap().insert(url.to_string(), Err(error));
        self
    }

    pub fn with_fetch_delay(self, url: &str, ms: u64) -> Self {
        self.fetch_delays_ms.lock().unwrap().insert(url.to_string(), ms);
        self
    }

    pub fn with_parts(self, url: &str, parts: Vec<Option<u64>>) -> Self {
        self.parts.lock().unwrap().insert(url.to_string(), Ok(parts));
        self
    }

    pub fn with_parts_error(self, url: &str, error: ExtractError) -> Self {
        self.parts.lock().unwrap().insert(url.to_string(), Err(error));
        self
    }

    pub fn with_size_delay(self, ms: u64) -> Self {
        *self.size_delay_ms.lock().unwrap() = ms;
        self
    }

    pub fn with_download_result(self, result: Result<DownloadOutcome, ExtractError>) -> Self {
        *self.download_result.lock().unwrap() = result;
        self
    }

    pub fn with_download_events(self, events: Vec<ProgressEvent>) -> Self {
        *self.download_events.lock().unwrap() = events;
        self
    }
}

#[async_trait]
impl MediaExtractor for ScriptedExtractor {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn query_metadata(&self, url: &str) -> Result<MediaProbe, ExtractError> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self
            .fetch_delays_ms
            .lock()
            .unwrap()
            .get(url)
            .copied()
            .unwrap_or(0);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.probes
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(ExtractError::Unavailable(format!("unscripted url {}", url))))
    }

    async fn query_format_size(
        &self,
        url: &str,
        _spec: &FormatSpec,
    ) -> Result<Vec<Option<u64>>, ExtractError> {
        self.size_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.size_delay_ms.lock().unwrap();
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.parts
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| Ok(vec![Some(1_048_576)]))
    }

    async fn download(
        &self,
        _url: &str,
        _spec: &FormatSpec,
        _output_template: &str,
        progress: ProgressFn,
    ) -> Result<DownloadOutcome, ExtractError> {
        for event in self.download_events.lock().unwrap().clone() {
            (*progress)(event);
        }
        self.download_result.lock().unwrap().clone()
    }
}
