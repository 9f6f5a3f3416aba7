//! Application-wide error types.

use std::path::{Path, PathBuf};

use mesio::DownloadError;
use platforms_parser::ExtractorError;
use thiserror::Error;

use crate::downloader::{MuxError, Stage};

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Application-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Extraction error: {0}")]
    Extractor(#[from] ExtractorError),

    #[error("Download error: {0}")]
    Download(#[from] DownloadError),

    #[error("Mux error: {0}")]
    Mux(#[from] MuxError),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error while {op} `{}`: {source}", .path.display())]
    IoPath {
        op: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{stage} failed: {source}")]
    Pipeline {
        stage: Stage,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub fn io_path(op: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::IoPath {
            op,
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn stream(msg: impl Into<String>) -> Self {
        Self::Stream(msg.into())
    }

    /// Stage the error was raised in, if it came out of the download pipeline.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Pipeline { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Whether the failure left a partial transfer that a rerun picks up.
    pub fn is_resumable(&self) -> bool {
        match self {
            Self::Pipeline { source, .. } => source.is_resumable(),
            Self::Download(e) => e.is_resumable(),
            _ => false,
        }
    }
}

/// Tags errors with the pipeline stage that produced them.
pub trait StageExt<T> {
    fn at(self, stage: Stage) -> Result<T>;
}

impl<T, E: Into<Error>> StageExt<T> for std::result::Result<T, E> {
    fn at(self, stage: Stage) -> Result<T> {
        self.map_err(|e| Error::Pipeline {
            stage,
            source: Box::new(e.into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_is_attached() {
        let res: std::result::Result<(), ExtractorError> = Err(ExtractorError::NoPlayableStream);
        let err = res.at(Stage::ResolveStreams).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::ResolveStreams));
        assert!(err.to_string().starts_with("resolve streams failed"));
        assert!(!err.is_resumable());
    }

    #[test]
    fn test_interrupted_fetch_is_resumable() {
        let res: std::result::Result<(), DownloadError> = Err(DownloadError::Incomplete {
            expected: 8000,
            received: 3000,
        });
        let err = res.at(Stage::FetchDashPair).unwrap_err();
        assert!(err.is_resumable());
    }
}
