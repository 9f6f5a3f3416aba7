//! Transfer state and the progress callback invoked from the transfer loop.

use std::path::{Path, PathBuf};

/// State of one file transfer, updated after every received chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferState {
    pub target_path: PathBuf,
    pub partial_path: PathBuf,
    /// Bytes present in the partial file, including any resumed prefix.
    pub bytes_written: u64,
    /// Total size once known from the caller or the response headers.
    pub total_expected: Option<u64>,
    /// Offset the transfer resumed from, zero for fresh downloads.
    pub resumed_from: u64,
}

impl TransferState {
    pub fn new(target_path: &Path, start_offset: u64, total_expected: Option<u64>) -> Self {
        Self {
            target_path: target_path.to_path_buf(),
            partial_path: partial_path(target_path),
            bytes_written: start_offset,
            total_expected,
            resumed_from: start_offset,
        }
    }
}

/// Path of the in-progress file for `target`: the target name plus `.part`.
pub fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Receives progress for a single transfer.
///
/// Callbacks run synchronously on the task driving the transfer and should
/// return quickly.
pub trait ProgressSink: Send + Sync {
    fn on_start(&self, _state: &TransferState) {}

    fn on_progress(&self, state: &TransferState);

    fn on_finish(&self, _state: &TransferState) {}
}

impl<F> ProgressSink for F
where
    F: Fn(&TransferState) + Send + Sync,
{
    fn on_progress(&self, state: &TransferState) {
        self(state)
    }
}

/// Discards all progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _state: &TransferState) {}
}
