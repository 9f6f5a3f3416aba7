//! # Resumable Fetcher
//!
//! Streams a single URL to disk through a `.part` file. An interrupted
//! transfer leaves the partial file behind and the next call for the same
//! target resumes from its current size with a range request. The final
//! file only appears once the partial file is complete, by renaming it.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use reqwest::header::{ORIGIN, RANGE, REFERER};
use reqwest::{Client, Response, StatusCode};
use tokio::fs;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, error, info, instrument, warn};

use crate::decryption::StreamDecryptor;
use crate::progress::{ProgressSink, TransferState, partial_path};
use crate::{DownloadError, DownloaderConfig};

/// A single file to fetch.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub target_path: PathBuf,
    /// Size announced by the source, used to detect already-complete partials.
    pub expected_size: Option<u64>,
    /// AES-128 key for encrypted bodies (the IV equals the key).
    pub decryption_key: Option<[u8; 16]>,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>, target_path: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            target_path: target_path.into(),
            expected_size: None,
            decryption_key: None,
        }
    }

    pub fn with_expected_size(mut self, size: Option<u64>) -> Self {
        self.expected_size = size;
        self
    }

    pub fn with_decryption_key(mut self, key: [u8; 16]) -> Self {
        self.decryption_key = Some(key);
        self
    }
}

/// How a successful fetch was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The target already existed, nothing was requested.
    AlreadyComplete,
    /// The partial file was already whole and was renamed into place.
    PromotedPartial,
    /// Bytes were transferred; `bytes` is the final file size.
    Completed { bytes: u64 },
}

/// Downloads files with resume support.
#[derive(Debug, Clone)]
pub struct ResumableFetcher {
    client: Client,
    config: DownloaderConfig,
}

impl ResumableFetcher {
    pub fn new(client: Client, config: DownloaderConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &DownloaderConfig {
        &self.config
    }

    /// Fetch `request`, reporting failures through the log only.
    ///
    /// Returns `true` when the target file exists afterwards.
    pub async fn fetch(&self, request: &FetchRequest, progress: &dyn ProgressSink) -> bool {
        match self.try_fetch(request, progress).await {
            Ok(outcome) => {
                debug!(path = %request.target_path.display(), ?outcome, "Fetch finished");
                true
            }
            Err(e) => {
                error!(
                    url = %request.url,
                    path = %request.target_path.display(),
                    error = %e,
                    "Download failed"
                );
                false
            }
        }
    }

    /// Fetch `request`, returning the error instead of logging it.
    ///
    /// On failure the partial file is kept for the next attempt unless it is
    /// smaller than [`DownloaderConfig::min_partial_size`].
    #[instrument(skip(self, request, progress), fields(path = %request.target_path.display()))]
    pub async fn try_fetch(
        &self,
        request: &FetchRequest,
        progress: &dyn ProgressSink,
    ) -> Result<FetchOutcome, DownloadError> {
        let target = request.target_path.as_path();
        let partial = partial_path(target);

        if fs::try_exists(target)
            .await
            .map_err(|e| DownloadError::io_path("checking", target, e))?
        {
            info!(path = %target.display(), "File already exists, skipping download");
            return Ok(FetchOutcome::AlreadyComplete);
        }

        let partial_size = match fs::metadata(&partial).await {
            Ok(meta) => Some(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(DownloadError::io_path("inspecting", &partial, e)),
        };

        if let (Some(size), Some(expected)) = (partial_size, request.expected_size)
            && size >= expected
        {
            info!(
                path = %partial.display(),
                size,
                expected,
                "Partial file is already complete"
            );
            promote(&partial, target).await?;
            return Ok(FetchOutcome::PromotedPartial);
        }

        let mut start_offset = partial_size.unwrap_or(0);
        if start_offset > 0 && request.decryption_key.is_some() {
            // The CBC chain cannot be rebuilt from plaintext already on disk.
            warn!(path = %partial.display(), "Encrypted transfer cannot resume, restarting");
            start_offset = 0;
        }

        match self
            .transfer(request, &partial, start_offset, progress)
            .await
        {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.discard_small_partial(&partial).await;
                Err(e)
            }
        }
    }

    async fn send_range(&self, url: &str, start_offset: u64) -> Result<Response, DownloadError> {
        let mut builder = self
            .client
            .get(url)
            .header(RANGE, format!("bytes={start_offset}-"));
        if let Some(referer) = &self.config.referer {
            builder = builder.header(REFERER, referer);
        }
        if let Some(origin) = &self.config.origin {
            builder = builder.header(ORIGIN, origin);
        }
        debug!(url = %url, start_offset, "Sending range request");
        Ok(builder.send().await?)
    }

    async fn transfer(
        &self,
        request: &FetchRequest,
        partial: &Path,
        mut start_offset: u64,
        progress: &dyn ProgressSink,
    ) -> Result<FetchOutcome, DownloadError> {
        let target = request.target_path.as_path();
        let mut response = self.send_range(&request.url, start_offset).await?;
        let mut status = response.status();

        if start_offset > 0 && status == StatusCode::RANGE_NOT_SATISFIABLE {
            match request.expected_size {
                // A short partial is never promoted.
                Some(expected) if start_offset < expected => {
                    warn!(
                        path = %partial.display(),
                        size = start_offset,
                        expected,
                        "Server rejected the resume range of a short partial, restarting"
                    );
                    start_offset = 0;
                    response = self.send_range(&request.url, 0).await?;
                    status = response.status();
                }
                _ => {
                    info!(path = %partial.display(), "Server reports nothing left to fetch");
                    promote(partial, target).await?;
                    return Ok(FetchOutcome::PromotedPartial);
                }
            }
        }
        if !status.is_success() {
            return Err(DownloadError::http_status(
                status,
                request.url.as_str(),
                "range request",
            ));
        }
        if start_offset > 0 && status != StatusCode::PARTIAL_CONTENT {
            warn!(
                url = %request.url,
                status = %status,
                "Server ignored the range request, restarting from the beginning"
            );
            start_offset = 0;
        }

        let total_expected = request
            .expected_size
            .or_else(|| response.content_length().map(|len| len + start_offset));

        let file = if start_offset > 0 {
            fs::OpenOptions::new().append(true).open(partial).await
        } else {
            fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(partial)
                .await
        }
        .map_err(|e| DownloadError::io_path("opening", partial, e))?;
        let mut writer = BufWriter::with_capacity(self.config.buffer_size, file);

        let mut decryptor = request
            .decryption_key
            .as_ref()
            .map(StreamDecryptor::new)
            .transpose()?;

        let mut state = TransferState::new(target, start_offset, total_expected);
        info!(
            url = %request.url,
            path = %target.display(),
            resumed_from = start_offset,
            total = ?total_expected,
            "Transfer started"
        );
        progress.on_start(&state);

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            match decryptor.as_mut() {
                Some(decryptor) => writer.write_all(&decryptor.update(&chunk)).await,
                None => writer.write_all(&chunk).await,
            }
            .map_err(|e| DownloadError::io_path("writing", partial, e))?;

            state.bytes_written += chunk.len() as u64;
            progress.on_progress(&state);
        }

        writer
            .flush()
            .await
            .map_err(|e| DownloadError::io_path("flushing", partial, e))?;
        let file = writer.into_inner();
        file.sync_all()
            .await
            .map_err(|e| DownloadError::io_path("syncing", partial, e))?;
        drop(file);

        if let Some(decryptor) = decryptor {
            decryptor.finish()?;
        }

        if let Some(expected) = total_expected
            && state.bytes_written < expected
        {
            return Err(DownloadError::Incomplete {
                expected,
                received: state.bytes_written,
            });
        }

        promote(partial, target).await?;
        progress.on_finish(&state);
        info!(path = %target.display(), bytes = state.bytes_written, "Transfer complete");

        Ok(FetchOutcome::Completed {
            bytes: state.bytes_written,
        })
    }

    async fn discard_small_partial(&self, partial: &Path) {
        let Ok(meta) = fs::metadata(partial).await else {
            return;
        };
        if meta.len() < self.config.min_partial_size {
            debug!(
                path = %partial.display(),
                size = meta.len(),
                "Removing partial file too small to resume from"
            );
            if let Err(e) = fs::remove_file(partial).await {
                warn!(path = %partial.display(), error = %e, "Failed to remove partial file");
            }
        } else {
            info!(
                path = %partial.display(),
                size = meta.len(),
                "Keeping partial file for a later resume"
            );
        }
    }
}

async fn promote(partial: &Path, target: &Path) -> Result<(), DownloadError> {
    fs::rename(partial, target)
        .await
        .map_err(|e| DownloadError::io_path("renaming", partial, e))
}
