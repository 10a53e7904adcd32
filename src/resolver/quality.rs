// Quality gating - derives selectable tiers from source capability

use super::models::{FormatDescriptor, FormatKind, OutputKind, QualityTier};

/// Result of gating the quality menu against fetched formats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateOutcome {
    /// Tiers the source can actually satisfy, ascending.
    pub supported: Vec<QualityTier>,
    /// The tier to show as selected, if any tier is supported at all.
    pub selected: Option<QualityTier>,
}

impl GateOutcome {
    /// Nothing selectable - quality-dependent actions must be disabled.
    pub fn is_empty(&self) -> bool {
        self.supported.is_empty()
    }
}

/// Best audio bitrate the source offers, in kbps. Zero when no audio-only
/// format reports one.
fn max_audio_bitrate(formats: &[FormatDescriptor]) -> u32 {
    formats
        .iter()
        .filter(|f| f.kind == FormatKind::AudioOnly)
        .filter_map(|f| f.audio_bitrate_kbps)
        .max()
        .unwrap_or(0)
}

/// Tallest video stream the source offers, in px. Zero when no video format
/// reports a height.
fn max_video_height(formats: &[FormatDescriptor]) -> u32 {
    formats
        .iter()
        .filter(|f| f.kind == FormatKind::VideoWithAudio)
        .filter_map(|f| f.video_height_px)
        .max()
        .unwrap_or(0)
}

/// Gate the fixed tier list for `kind` against `formats`.
///
/// A tier is supported iff its target value does not exceed what the source
/// can deliver (bitrate for audio, height for video). When the current
/// selection survives it is kept; otherwise the first supported tier in
/// ascending order becomes the selection. Pure and synchronous.
pub fn gate(
    formats: &[FormatDescriptor],
    kind: OutputKind,
    current: Option<QualityTier>,
) -> GateOutcome {
    let ceiling = match kind {
        OutputKind::Audio => max_audio_bitrate(formats),
        OutputKind::Video => max_video_height(formats),
    };

    let supported: Vec<QualityTier> = kind
        .tiers()
        .iter()
        .copied()
        .filter(|tier| tier.value <= ceiling)
        .collect();

    let selected = match current {
        Some(tier) if supported.contains(&tier) => Some(tier),
        _ => supported.first().copied(),
    };

    GateOutcome { supported, selected }
}
