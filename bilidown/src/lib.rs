//! Bilibili video downloader.
//!
//! The `bilidown` binary (`src/main.rs`) wires these modules together; the
//! library target holds the pipeline so it can be driven from tests.

pub mod cli;
pub mod config;
pub mod downloader;
pub mod error;
pub mod logging;
pub mod progress;
pub mod utils;

pub use error::{Error, Result};
