// Surface trait - callbacks into the presentation layer
//
// Implemented by the embedding application (a GUI shell, a TUI, a test
// recorder). Every method is invoked from the dispatch consumer, one call
// at a time, in submission order; implementations must not block.

use std::path::Path;

use super::models::{QualityTier, ThumbnailRef};

pub trait Surface: Send + Sync {
    /// Status line under the link input.
    fn set_link_status(&self, text: &str);

    /// Title and thumbnail handle for the resolved link.
    fn set_metadata_display(&self, title: &str, thumbnail: &ThumbnailRef);

    /// Decoded thumbnail bytes, once the fetch worker has them.
    fn set_thumbnail_image(&self, bytes: Vec<u8>);

    /// Drop title, thumbnail, and size display back to blank.
    fn clear_metadata_display(&self);

    /// Quality menu contents. An empty `supported` list with `selected`
    /// `None` means quality-dependent actions must be disabled.
    fn set_quality_options(&self, supported: &[QualityTier], selected: Option<QualityTier>);

    /// Size estimate line ("Estimating size...", "Est. size: 12.30 MB", ...).
    fn set_size_display(&self, text: &str);

    /// Download status line ("Preparing...", "Download complete!", ...).
    fn set_download_status(&self, text: &str);

    /// Progress bar position; `None` blanks the bar.
    fn set_progress_percent(&self, percent: Option<f32>);

    /// Enable or disable the interactive controls during a download.
    fn set_controls_enabled(&self, enabled: bool);

    /// Open a file-manager view of the finished download's directory.
    fn reveal_directory(&self, path: &Path);
}
