// MediaExtractor trait - the extraction/download collaborator seam

use std::sync::Arc;

use async_trait::async_trait;

use crate::resolver::errors::ExtractError;
use crate::resolver::format_spec::FormatSpec;
use crate::resolver::models::{DownloadOutcome, MediaProbe, ProgressEvent};

/// Callback invoked by `download` for each progress change, on the
/// collaborator's own execution context.
pub type ProgressFn = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// The external extraction and download service.
///
/// All methods are expected to block on the network and are only ever
/// invoked from background worker tasks, never from dispatch handlers.
/// Timeouts are the implementation's responsibility; callers treat a
/// timeout like any other failure.
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    /// Name of the extractor (for logging)
    fn name(&self) -> &'static str;

    /// Check if this extractor can run on this machine
    fn is_available(&self) -> bool;

    /// Metadata-only query: title, thumbnail handle, and format list.
    /// No payload bytes are transferred.
    async fn query_metadata(&self, url: &str) -> Result<MediaProbe, ExtractError>;

    /// Dry-run query resolving `spec` the same way a download would,
    /// returning the size of each constituent part. `None` for a part the
    /// service reports no size for.
    async fn query_format_size(
        &self,
        url: &str,
        spec: &FormatSpec,
    ) -> Result<Vec<Option<u64>>, ExtractError>;

    /// Perform the transfer, invoking `progress` zero or more times before
    /// returning.
    async fn download(
        &self,
        url: &str,
        spec: &FormatSpec,
        output_template: &str,
        progress: ProgressFn,
    ) -> Result<DownloadOutcome, ExtractError>;
}
