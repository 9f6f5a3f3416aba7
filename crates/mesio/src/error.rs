use std::path::{Path, PathBuf};

use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("HTTP request failed: {source}")]
    Network {
        #[from]
        source: reqwest::Error,
    },

    #[error("request failed with HTTP {status} during {operation} for {url}")]
    HttpStatus {
        status: StatusCode,
        url: String,
        operation: &'static str,
    },

    #[error("I/O error while {op} `{}`: {source}", .path.display())]
    IoPath {
        op: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("transfer ended early: received {received} of {expected} bytes")]
    Incomplete { expected: u64, received: u64 },

    #[error("decryption error: {reason}")]
    Decryption { reason: String },
}

impl DownloadError {
    pub fn http_status(
        status: StatusCode,
        url: impl Into<String>,
        operation: &'static str,
    ) -> Self {
        Self::HttpStatus {
            status,
            url: url.into(),
            operation,
        }
    }

    pub fn io_path(op: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::IoPath {
            op,
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn decryption(reason: impl Into<String>) -> Self {
        Self::Decryption {
            reason: reason.into(),
        }
    }

    /// Whether a later attempt can pick up where this one stopped.
    ///
    /// Errors raised before or during the byte transfer leave the partial
    /// file in place; decryption problems will recur.
    pub fn is_resumable(&self) -> bool {
        match self {
            Self::Network { .. } | Self::IoPath { .. } | Self::Incomplete { .. } => true,
            Self::HttpStatus { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            Self::Decryption { .. } => false,
        }
    }
}
