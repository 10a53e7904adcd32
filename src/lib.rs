//! Link resolution, metadata and download engine for a media downloader
//! application.
//!
//! The crate turns raw link text into validated state, fetches metadata off
//! the interactive thread, gates the selectable quality tiers against what
//! the source actually offers, memoizes size estimates, and relays download
//! progress - all serialized through one dispatch lane so the embedding UI
//! never sees a torn update.
//!
//! The presentation layer implements [`Surface`]; the extraction service
//! implements [`MediaExtractor`] (a yt-dlp backed [`CliExtractor`] ships
//! with the crate). Wire them into a [`DownloadSession`] and forward input
//! events to it.

pub mod config;
pub mod resolver;

pub use config::EngineConfig;
pub use resolver::{
    CliExtractor, DownloadSession, ExtractError, MediaExtractor, OutputKind, QualityTier, Surface,
    Validation,
};
