//! Download pipeline: deciding what to fetch, fetching it and muxing.

pub mod existing;
pub mod muxer;
pub mod orchestrator;
pub mod policy;

pub use existing::{ExistingOutputRecord, find_existing};
pub use muxer::{FfmpegLocation, FfmpegMuxer, MuxError, Muxer};
pub use orchestrator::{
    DownloadOptions, DownloadOutcome, Downloader, Stage, select_best_audio, select_best_video,
};
pub use policy::{Decision, OverwritePolicy, SkipReason, decide};
