// Download session - orchestrates validation, fetch, gating, estimation
// and download for one link input field
//
// Threading model: public methods may be called from any thread (typically
// the embedder's UI thread). Each one enqueues a handler on the dispatch
// lane; every read-modify-write of session state and every surface call
// happens inside those serialized handlers. Background workers (metadata
// fetch, size estimation, thumbnail, download) are spawned from handlers
// and publish their results back through the lane, tagged with the input
// generation they were spawned for. A result whose generation no longer
// matches the current one is dropped at publish time, so the newest edit
// always wins no matter how fetches interleave.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

use super::dispatch::Dispatcher;
use super::errors::ExtractError;
use super::estimator::{self, BeginOutcome, SizeCache, SizeKey};
use super::extractors::traits::{MediaExtractor, ProgressFn};
use super::format_spec::FormatSpec;
use super::models::{
    DownloadOutcome, LinkState, MediaProbe, Metadata, OutputKind, QualityTier, ThumbnailRef,
    Validation,
};
use super::progress::ProgressCoordinator;
use super::quality;
use super::surface::Surface;
use super::thumbs;
use super::utils::{format_size, normalize_link, sanitize_filename, truncate};
use super::validator;
use crate::config::EngineConfig;

struct SessionState {
    link: LinkState,
    metadata: Option<Metadata>,
    kind: OutputKind,
    selected: Option<QualityTier>,
    supported: Vec<QualityTier>,
    downloading: bool,
}

struct SessionInner {
    config: EngineConfig,
    extractor: Arc<dyn MediaExtractor>,
    surface: Arc<dyn Surface>,
    dispatch: Dispatcher,
    progress: ProgressCoordinator,
    generation: AtomicU64,
    state: Mutex<SessionState>,
    cache: SizeCache,
    status_revert: Mutex<Option<JoinHandle<()>>>,
}

/// One interactive session: a link input, an output-kind toggle, a quality
/// menu, and a download button, wired to an extraction collaborator and a
/// presentation surface.
pub struct DownloadSession {
    inner: Arc<SessionInner>,
}

impl DownloadSession {
    /// Must be called from within a tokio runtime; the dispatch consumer
    /// and all workers run on it.
    pub fn new(
        extractor: Arc<dyn MediaExtractor>,
        surface: Arc<dyn Surface>,
        config: EngineConfig,
    ) -> Self {
        let dispatch = Dispatcher::spawn();
        let progress =
            ProgressCoordinator::new(dispatch.clone(), surface.clone(), config.idle_reset_secs);
        let kind = OutputKind::Audio;

        Self {
            inner: Arc::new(SessionInner {
                config,
                extractor,
                surface,
                dispatch,
                progress,
                generation: AtomicU64::new(0),
                state: Mutex::new(SessionState {
                    link: LinkState::empty(),
                    metadata: None,
                    kind,
                    selected: Some(kind.default_tier()),
                    supported: Vec::new(),
                    downloading: false,
                }),
                cache: SizeCache::new(),
                status_revert: Mutex::new(None),
            }),
        }
    }

    /// The link text changed. Classifies the new text and, for a valid
    /// link, spawns a metadata fetch tagged with a fresh generation.
    pub fn observe_input(&self, raw_text: &str) {
        // Mint the generation before queueing so in-flight work for older
        // text is already stale by the time its publish handler runs.
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let raw = raw_text.to_string();
        let inner = self.inner.clone();
        self.inner
            .dispatch
            .submit(move || inner.apply_input(raw, generation));
    }

    /// The user toggled audio/video output.
    pub fn set_output_kind(&self, kind: OutputKind) {
        let inner = self.inner.clone();
        self.inner.dispatch.submit(move || inner.apply_kind(kind));
    }

    /// The user picked a quality tier by label. Selections outside the
    /// gated set are ignored.
    pub fn select_quality(&self, label: &str) {
        let label = label.to_string();
        let inner = self.inner.clone();
        self.inner
            .dispatch
            .submit(move || inner.apply_quality(label));
    }

    /// The user hit download. `filename` overrides the title-derived name.
    pub fn start_download(&self, filename: Option<&str>) {
        let filename = filename.map(|s| s.to_string());
        let inner = self.inner.clone();
        self.inner
            .dispatch
            .submit(move || inner.begin_download(filename));
    }

    // Read accessors. Mutations are applied on the dispatch lane, so a
    // value read immediately after a setter may not reflect it yet.

    pub fn validation(&self) -> Validation {
        self.inner.state.lock().unwrap().link.validation
    }

    pub fn output_kind(&self) -> OutputKind {
        self.inner.state.lock().unwrap().kind
    }

    pub fn selected_quality(&self) -> Option<QualityTier> {
        self.inner.state.lock().unwrap().selected
    }
}

impl SessionInner {
    fn apply_input(self: Arc<Self>, raw: String, generation: u64) {
        self.cancel_status_revert();
        let validation = validator::classify(&raw);
        log::debug!("[Session] input gen {} classified {:?}", generation, validation);

        {
            let mut state = self.state.lock().unwrap();
            let stored = if validation == Validation::Valid {
                Validation::Verifying
            } else {
                validation
            };
            state.link = LinkState {
                raw_text: raw.clone(),
                validation: stored,
                generation,
            };
            if validation != Validation::Valid {
                state.metadata = None;
            }
        }

        match validation {
            Validation::Empty => {
                self.publish_reset(validator::status_text(Validation::Empty));
            }
            Validation::InvalidSyntax | Validation::UnsupportedPlatform => {
                self.publish_reset(validator::status_text(validation));
                self.schedule_status_revert(generation);
            }
            Validation::Valid => {
                self.surface
                    .set_link_status(validator::status_text(Validation::Verifying));
                self.spawn_fetch(raw.trim().to_string(), generation);
            }
            // classify never produces Verifying
            Validation::Verifying => {}
        }
    }

    /// Blank everything that described the previous link. The stored
    /// quality selection survives so a later fetch can re-validate it.
    fn publish_reset(&self, status: &'static str) {
        self.surface.set_link_status(status);
        self.surface.clear_metadata_display();
        self.surface.set_size_display("");
        self.surface.set_quality_options(&[], None);
    }

    fn spawn_fetch(self: Arc<Self>, url: String, generation: u64) {
        tokio::spawn(async move {
            let result = self.extractor.query_metadata(&url).await;
            let dispatch = self.dispatch.clone();
            dispatch.submit(move || self.apply_fetch_result(generation, result));
        });
    }

    fn apply_fetch_result(
        self: Arc<Self>,
        generation: u64,
        result: Result<MediaProbe, ExtractError>,
    ) {
        if generation != self.generation.load(Ordering::SeqCst) {
            log::debug!("[Session] dropping fetch result for stale gen {}", generation);
            return;
        }

        match result {
            Ok(probe) => {
                // Estimates were conditioned on the previous link's format
                // set; drop them before the new metadata becomes visible.
                self.cache.flush();

                let outcome;
                {
                    let mut state = self.state.lock().unwrap();
                    let metadata = Metadata::from_probe(probe.clone(), generation);
                    outcome = quality::gate(&metadata.formats, state.kind, state.selected);
                    state.metadata = Some(metadata);
                    state.link.validation = Validation::Valid;
                    state.supported = outcome.supported.clone();
                    state.selected = outcome.selected;
                }

                self.surface
                    .set_link_status(validator::status_text(Validation::Valid));
                self.surface
                    .set_metadata_display(&probe.title, &probe.thumbnail);
                self.surface
                    .set_quality_options(&outcome.supported, outcome.selected);
                self.clone().spawn_thumbnail(probe.thumbnail, generation);
                self.refresh_estimate();
            }
            Err(e) => {
                log::warn!("[Session] metadata fetch failed: {}", e);
                {
                    let mut state = self.state.lock().unwrap();
                    state.metadata = None;
                    state.link.validation = Validation::Valid;
                }
                // Selection and size cache stay as they were; a new edit
                // is the only way to retry.
                self.surface.clear_metadata_display();
                self.surface
                    .set_link_status(&format!("Error fetching: {}", truncate(&e.to_string(), 100)));
            }
        }
    }

    fn spawn_thumbnail(self: Arc<Self>, thumbnail: ThumbnailRef, generation: u64) {
        if thumbnail.is_empty() {
            return;
        }
        let timeout = self.config.thumbnail_timeout_secs;
        tokio::spawn(async move {
            let bytes = thumbs::fetch_thumbnail(&thumbnail, timeout).await;
            let dispatch = self.dispatch.clone();
            dispatch.submit(move || {
                if generation != self.generation.load(Ordering::SeqCst) {
                    return;
                }
                if let Some(bytes) = bytes {
                    self.surface.set_thumbnail_image(bytes);
                }
            });
        });
    }

    fn apply_kind(self: Arc<Self>, kind: OutputKind) {
        let outcome;
        {
            let mut state = self.state.lock().unwrap();
            state.kind = kind;
            let formats: Vec<_> = state
                .metadata
                .as_ref()
                .map(|m| m.formats.clone())
                .unwrap_or_default();
            outcome = quality::gate(&formats, kind, state.selected);
            state.supported = outcome.supported.clone();
            state.selected = outcome.selected;
        }
        self.surface
            .set_quality_options(&outcome.supported, outcome.selected);
        self.refresh_estimate();
    }

    fn apply_quality(self: Arc<Self>, label: String) {
        let accepted = {
            let mut state = self.state.lock().unwrap();
            match state.supported.iter().find(|t| t.label == label).copied() {
                Some(tier) => {
                    state.selected = Some(tier);
                    true
                }
                None => false,
            }
        };

        if accepted {
            self.refresh_estimate();
        } else {
            log::warn!("[Session] ignoring unsupported quality '{}'", label);
        }
    }

    /// Show the size for the current (link, kind, quality) selection,
    /// spawning a dry-run query only when the cache has nothing and nobody
    /// else is already computing it.
    fn refresh_estimate(self: Arc<Self>) {
        let snapshot = {
            let state = self.state.lock().unwrap();
            match (&state.metadata, state.selected) {
                (Some(_), Some(tier)) => Some((
                    state.link.raw_text.trim().to_string(),
                    state.kind,
                    tier,
                    state.link.generation,
                )),
                _ => None,
            }
        };

        let (url, kind, tier, generation) = match snapshot {
            Some(parts) => parts,
            None => {
                self.surface.set_size_display("");
                return;
            }
        };

        let key = SizeKey::new(normalize_link(&url), kind, tier);
        match self.cache.begin(&key) {
            BeginOutcome::Hit(est) => {
                self.surface.set_size_display(&estimator::display_text(&est));
            }
            BeginOutcome::AlreadyInFlight => {
                self.surface.set_size_display(estimator::ESTIMATING_TEXT);
            }
            BeginOutcome::Started => {
                self.surface.set_size_display(estimator::ESTIMATING_TEXT);
                let spec = FormatSpec::for_selection(kind, tier);
                tokio::spawn(async move {
                    let result = self.extractor.query_format_size(&url, &spec).await;
                    let dispatch = self.dispatch.clone();
                    dispatch.submit(move || self.apply_estimate(key, generation, result));
                });
            }
        }
    }

    fn apply_estimate(
        &self,
        key: SizeKey,
        generation: u64,
        result: Result<Vec<Option<u64>>, ExtractError>,
    ) {
        if generation != self.generation.load(Ordering::SeqCst) {
            log::debug!("[Session] dropping estimate for stale gen {}", generation);
            self.cache.abandon(&key);
            return;
        }

        match result {
            Ok(parts) => {
                let estimate = estimator::sum_parts(&parts);
                if !self.cache.complete(&key, estimate) {
                    // Flushed while the query ran; nothing to show.
                    return;
                }
                if self.key_matches_selection(&key) {
                    self.surface
                        .set_size_display(&estimator::display_text(&estimate));
                }
            }
            Err(e) => {
                log::warn!("[Session] size estimation failed: {}", e);
                self.cache.abandon(&key);
                if self.key_matches_selection(&key) {
                    self.surface.set_size_display(estimator::SIZE_FAILED_TEXT);
                }
            }
        }
    }

    fn key_matches_selection(&self, key: &SizeKey) -> bool {
        let state = self.state.lock().unwrap();
        state.metadata.is_some()
            && state.kind == key.kind
            && state.selected.map(|t| t.label) == Some(key.quality)
            && normalize_link(&state.link.raw_text) == key.link
    }

    fn begin_download(self: Arc<Self>, filename: Option<String>) {
        enum Refusal {
            Busy,
            NoMetadata,
            NoQuality,
        }

        let snapshot = {
            let mut state = self.state.lock().unwrap();
            if state.downloading {
                Err(Refusal::Busy)
            } else {
                let title = state.metadata.as_ref().map(|m| m.title.clone());
                match (title, state.selected) {
                    (None, _) => Err(Refusal::NoMetadata),
                    (_, None) => Err(Refusal::NoQuality),
                    (Some(title), Some(tier)) => {
                        state.downloading = true;
                        Ok((
                            state.link.raw_text.trim().to_string(),
                            state.kind,
                            tier,
                            title,
                        ))
                    }
                }
            }
        };

        let (url, kind, tier, title) = match snapshot {
            Ok(parts) => parts,
            Err(Refusal::Busy) => {
                log::warn!("[Session] download already in progress, ignoring");
                return;
            }
            Err(Refusal::NoMetadata) => {
                self.surface.set_download_status("No media loaded.");
                return;
            }
            Err(Refusal::NoQuality) => {
                self.surface
                    .set_download_status("Selected quality not available.");
                return;
            }
        };

        let base = sanitize_filename(
            filename
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .or(Some(title.as_str())),
        );
        let template = self
            .config
            .output_dir
            .join(format!("{}.%(ext)s", base))
            .to_string_lossy()
            .into_owned();
        let spec = FormatSpec::for_selection(kind, tier);
        let key = SizeKey::new(normalize_link(&url), kind, tier);

        self.progress.begin();

        tokio::spawn(async move {
            let events_to = self.clone();
            let progress: ProgressFn = Arc::new(move |event| events_to.progress.on_event(event));
            let result = self
                .extractor
                .download(&url, &spec, &template, progress)
                .await;
            let dispatch = self.dispatch.clone();
            dispatch.submit(move || self.finish_download(key, result));
        });
    }

    fn finish_download(&self, key: SizeKey, result: Result<DownloadOutcome, ExtractError>) {
        self.state.lock().unwrap().downloading = false;

        let note = match &result {
            Ok(outcome) => self.discrepancy_note(&key, outcome),
            Err(_) => None,
        };
        self.progress
            .on_complete(result, self.config.output_dir.clone(), note);
    }

    /// A rough estimate that missed the real size by more than the
    /// configured band earns a note next to the completion message.
    fn discrepancy_note(&self, key: &SizeKey, outcome: &DownloadOutcome) -> Option<String> {
        let actual = outcome.total_bytes? as f64;
        let estimate = self.cache.lookup(key)?;
        if !estimate.rough || estimate.total_bytes == 0 {
            return None;
        }
        let low = estimate.total_bytes as f64 * self.config.discrepancy_lower_ratio;
        let high = estimate.total_bytes as f64 * self.config.discrepancy_upper_ratio;
        if actual < low || actual > high {
            Some(format!(
                "(rough estimate of ~{} differed from the actual size)",
                format_size(estimate.total_bytes)
            ))
        } else {
            None
        }
    }

    fn schedule_status_revert(self: Arc<Self>, generation: u64) {
        let inner = self.clone();
        let delay = Duration::from_secs(self.config.status_revert_secs);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let dispatch = inner.dispatch.clone();
            dispatch.submit(move || {
                // Only revert if the message is still about this input.
                if generation == inner.generation.load(Ordering::SeqCst) {
                    inner
                        .surface
                        .set_link_status(validator::status_text(Validation::Empty));
                }
            });
        });

        if let Some(previous) = self.status_revert.lock().unwrap().replace(handle) {
            previous.abort();
        }
    }

    fn cancel_status_revert(&self) {
        if let Some(task) = self.status_revert.lock().unwrap().take() {
            task.abort();
        }
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        if let Some(task) = self.status_revert.lock().unwrap().take() {
            task.abort();
        }
    }
}
