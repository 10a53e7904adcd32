// Format specifier - what the extraction collaborator should resolve

use std::fmt;

use super::models::{OutputKind, QualityTier};

/// Encodes the stream selection handed to the extraction collaborator, for
/// both dry-run size queries and the real download. The same selection must
/// be used for both so the estimate matches the transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatSpec {
    /// Best available audio-only stream.
    BestAudio,
    /// Best video at or below the target height, combined with best audio.
    VideoUpTo { height: u32 },
}

impl FormatSpec {
    pub fn for_selection(kind: OutputKind, tier: QualityTier) -> Self {
        match kind {
            OutputKind::Audio => Self::BestAudio,
            OutputKind::Video => Self::VideoUpTo { height: tier.value },
        }
    }

    /// Render to a yt-dlp format string.
    pub fn render(&self) -> String {
        match self {
            Self::BestAudio => "bestaudio/best".to_string(),
            Self::VideoUpTo { height } => format!(
                "bestvideo[height<={h}]+bestaudio/best[height<={h}]/best",
                h = height
            ),
        }
    }

    pub fn is_audio(&self) -> bool {
        matches!(self, Self::BestAudio)
    }
}

impl fmt::Display for FormatSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AUDIO_TIERS, VIDEO_TIERS};

    #[test]
    fn test_audio_spec_ignores_tier_value() {
        let spec = FormatSpec::for_selection(OutputKind::Audio, AUDIO_TIERS[2]);
        assert_eq!(spec.render(), "bestaudio/best");
    }

    #[test]
    fn test_video_spec_carries_height_ceiling() {
        let spec = FormatSpec::for_selection(OutputKind::Video, VIDEO_TIERS[2]);
        assert_eq!(
            spec.render(),
            "bestvideo[height<=1080]+bestaudio/best[height<=1080]/best"
        );
    }
}
