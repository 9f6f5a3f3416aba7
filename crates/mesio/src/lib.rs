//! Mesio engine: resumable, progress-tracked file downloads.
//!
//! The crate exposes a single transfer primitive, [`ResumableFetcher`], plus
//! the client construction and configuration it relies on.

pub mod config;
pub mod decryption;
pub mod error;
pub mod fetcher;
pub mod progress;

pub use config::{DownloaderConfig, create_client};
pub use decryption::StreamDecryptor;
pub use error::DownloadError;
pub use fetcher::{FetchOutcome, FetchRequest, ResumableFetcher};
pub use progress::{NoProgress, ProgressSink, TransferState, partial_path};
