// Engine configuration - quality tables, supported hosts, timeouts

use std::path::PathBuf;

use crate::resolver::models::QualityTier;

/// Hostnames the link validator accepts as a supported platform.
pub const SUPPORTED_HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
    "youtu.be",
];

/// Audio quality tiers in ascending order. Values are target bitrates in kbps.
pub const AUDIO_TIERS: &[QualityTier] = &[
    QualityTier { label: "Low", value: 96 },
    QualityTier { label: "Medium", value: 192 },
    QualityTier { label: "High", value: 320 },
];

/// Video quality tiers in ascending order. Values are target heights in px.
pub const VIDEO_TIERS: &[QualityTier] = &[
    QualityTier { label: "480p", value: 480 },
    QualityTier { label: "720p", value: 720 },
    QualityTier { label: "1080p", value: 1080 },
    QualityTier { label: "4K", value: 2160 },
];

/// Default tier indices (Medium / 720p).
pub const DEFAULT_AUDIO_TIER_IDX: usize = 1;
pub const DEFAULT_VIDEO_TIER_IDX: usize = 1;

/// Engine-wide tunables.
///
/// A rough estimate is flagged to the user when the downloaded size falls
/// outside `[estimate * lower_ratio, estimate * upper_ratio]`.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Seconds before an invalid-link status message reverts to the idle prompt.
    pub status_revert_secs: u64,
    /// Seconds the final download status stays on screen before resetting to idle.
    pub idle_reset_secs: u64,
    /// Timeout for the thumbnail HTTP fetch.
    pub thumbnail_timeout_secs: u64,
    /// Timeout handed to the extraction collaborator for metadata/size queries.
    pub extractor_timeout_secs: u64,
    /// Directory download output templates are rooted at.
    pub output_dir: PathBuf,
    pub discrepancy_lower_ratio: f64,
    pub discrepancy_upper_ratio: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            status_revert_secs: 5,
            idle_reset_secs: 5,
            thumbnail_timeout_secs: 10,
            extractor_timeout_secs: 30,
            output_dir: crate::resolver::utils::default_output_dir(),
            discrepancy_lower_ratio: 0.5,
            discrepancy_upper_ratio: 2.0,
        }
    }
}

impl EngineConfig {
    pub fn with_output_dir(mut self, dir: PathBuf) -> Self {
        self.output_dir = dir;
        self
    }

    pub fn with_idle_reset_secs(mut self, secs: u64) -> Self {
        self.idle_reset_secs = secs;
        self
    }

    pub fn with_status_revert_secs(mut self, secs: u64) -> Self {
        self.status_revert_secs = secs;
        self
    }

    pub fn with_extractor_timeout(mut self, secs: u64) -> Self {
        self.extractor_timeout_secs = secs;
        self
    }
}
