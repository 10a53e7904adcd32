// Extraction collaborator implementations

pub mod cli;
pub mod traits;

pub use cli::CliExtractor;
pub use traits::{MediaExtractor, ProgressFn};
