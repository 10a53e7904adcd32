// Resolver module - link resolution, gating, estimation and download engine

pub mod dispatch;
pub mod errors;
pub mod estimator;
pub mod extractors;
pub mod format_spec;
pub mod models;
pub mod progress;
pub mod quality;
pub mod session;
pub mod surface;
pub mod thumbs;
pub mod utils;
pub mod validator;

#[cfg(test)]
pub(crate) mod testing;

pub use dispatch::Dispatcher;
pub use errors::ExtractError;
pub use estimator::{SizeCache, SizeKey};
pub use extractors::{CliExtractor, MediaExtractor, ProgressFn};
pub use format_spec::FormatSpec;
pub use models::{
    DownloadOutcome, FormatDescriptor, FormatKind, LinkState, MediaProbe, Metadata, OutputKind,
    ProgressEvent, ProgressStatus, QualityTier, SizeEstimate, ThumbnailRef, Validation,
};
pub use quality::{gate, GateOutcome};
pub use session::DownloadSession;
pub use surface::Surface;
