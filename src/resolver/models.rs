// Common data models for the resolver engine

use serde::{Deserialize, Serialize};

use crate::config::{
    AUDIO_TIERS, DEFAULT_AUDIO_TIER_IDX, DEFAULT_VIDEO_TIER_IDX, VIDEO_TIERS,
};

/// Classification of the raw link text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Validation {
    /// No input yet.
    Empty,
    /// Syntactically valid link, metadata fetch in flight.
    Verifying,
    /// Not a well-formed URL.
    InvalidSyntax,
    /// Well-formed URL on a host we cannot extract from.
    UnsupportedPlatform,
    /// Supported link, metadata available (or fetch finished).
    Valid,
}

/// State of the link input field.
///
/// `generation` is bumped on every raw-text change and tags all background
/// work spawned for that text, so late results from older input can be
/// recognized and dropped.
#[derive(Debug, Clone)]
pub struct LinkState {
    pub raw_text: String,
    pub validation: Validation,
    pub generation: u64,
}

impl LinkState {
    pub fn empty() -> Self {
        Self {
            raw_text: String::new(),
            validation: Validation::Empty,
            generation: 0,
        }
    }
}

/// What kind of artifact the user wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OutputKind {
    Audio,
    Video,
}

impl OutputKind {
    /// Quality tiers selectable for this kind, ascending.
    pub fn tiers(&self) -> &'static [QualityTier] {
        match self {
            Self::Audio => AUDIO_TIERS,
            Self::Video => VIDEO_TIERS,
        }
    }

    /// Preferred tier when nothing narrows the choice.
    pub fn default_tier(&self) -> QualityTier {
        match self {
            Self::Audio => AUDIO_TIERS[DEFAULT_AUDIO_TIER_IDX],
            Self::Video => VIDEO_TIERS[DEFAULT_VIDEO_TIER_IDX],
        }
    }
}

/// One selectable quality option.
///
/// `value` is a bitrate in kbps for audio tiers and a height in px for video
/// tiers; both are compared against source capability the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QualityTier {
    pub label: &'static str,
    pub value: u32,
}

/// Stream flavor of a source format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormatKind {
    AudioOnly,
    VideoWithAudio,
}

/// Capability data for one source format, immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatDescriptor {
    pub kind: FormatKind,
    /// Audio bitrate in kbps, when the source reports one.
    pub audio_bitrate_kbps: Option<u32>,
    /// Video height in px, when the source reports one.
    pub video_height_px: Option<u32>,
}

/// Opaque handle to a thumbnail resource (a URL for every current extractor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ThumbnailRef(pub String);

impl ThumbnailRef {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Raw result of a metadata query, before the engine conditions it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaProbe {
    pub title: String,
    pub thumbnail: ThumbnailRef,
    pub formats: Vec<FormatDescriptor>,
}

/// Engine-owned metadata for the current link.
///
/// Replaced wholesale on every successful fetch, never mutated in place.
/// `source_generation` records which input edit the fetch was spawned for.
#[derive(Debug, Clone)]
pub struct Metadata {
    pub title: String,
    pub thumbnail: ThumbnailRef,
    pub formats: Vec<FormatDescriptor>,
    pub source_generation: u64,
}

impl Metadata {
    pub fn from_probe(probe: MediaProbe, generation: u64) -> Self {
        Self {
            title: probe.title,
            thumbnail: probe.thumbnail,
            formats: probe.formats,
            source_generation: generation,
        }
    }
}

/// A computed size estimate.
///
/// `rough` means at least one constituent part reported no size and was
/// counted as zero, so the total undercounts the real transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeEstimate {
    pub total_bytes: u64,
    pub rough: bool,
}

/// Progress phase reported by the download collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressStatus {
    Downloading,
    Finished,
}

/// One progress callback from the download collaborator. Transient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub status: ProgressStatus,
    /// Percent complete in [0, 100] when the collaborator reports one.
    pub percent: Option<f32>,
    /// Name of the artifact being written. May carry terminal styling.
    pub artifact: String,
}

/// Final report from a completed download.
#[derive(Debug, Clone, Default)]
pub struct DownloadOutcome {
    pub artifact: String,
    /// Bytes written, when the collaborator reports a total.
    pub total_bytes: Option<u64>,
}
