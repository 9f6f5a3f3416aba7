//! The download pipeline for a single video.
//!
//! ```text
//! resolve metadata -> check auth -> resolve streams -> decide
//!     -> skip | fetch single | fetch dash pair -> [mux] -> cleanup
//! ```
//!
//! Any failing stage aborts the pipeline; the error carries the stage it
//! was raised in. There are no automatic retries, an interrupted transfer is
//! resumed from its `.part` file on the next run.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mesio::{FetchOutcome, FetchRequest, ResumableFetcher};
use platforms_parser::extractor::platform_extractor::PlatformExtractor;
use platforms_parser::{
    ContentIdentifier, FlvSegment, MediaStream, MetadataResolver, QualityCode, StreamDescriptor,
    StreamKind, VideoMetadata,
};
use tracing::{debug, error, info, instrument, warn};

use super::existing::{ExistingOutputRecord, find_existing};
use super::muxer::Muxer;
use super::policy::{Decision, OverwritePolicy, SkipReason, decide};
use crate::error::StageExt;
use crate::progress::ProgressReporter;
use crate::utils::filename::sanitize_filename;
use crate::utils::fs::{ensure_dir_all, io_error, remove_file_if_exists};
use crate::{Error, Result};

/// Pipeline step, attached to errors for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ResolveMetadata,
    CheckAuth,
    ResolveStreams,
    Decide,
    FetchSingle,
    FetchDashPair,
    Mux,
    Cleanup,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ResolveMetadata => "resolve metadata",
            Self::CheckAuth => "check auth",
            Self::ResolveStreams => "resolve streams",
            Self::Decide => "decide",
            Self::FetchSingle => "fetch",
            Self::FetchDashPair => "fetch dash pair",
            Self::Mux => "mux",
            Self::Cleanup => "cleanup",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DownloadOptions {
    /// Root under which per-uploader directories are created.
    pub base_dir: PathBuf,
    pub policy: OverwritePolicy,
    /// Fetch DASH video and audio at the same time.
    pub concurrent_dash: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Skipped {
        existing: ExistingOutputRecord,
        reason: SkipReason,
    },
    Downloaded {
        output: PathBuf,
        quality: QualityCode,
        /// Earlier download that this one superseded.
        replaced: Option<PathBuf>,
    },
}

/// Best video representation by resolution, then bandwidth.
pub fn select_best_video(streams: &[MediaStream]) -> Option<&MediaStream> {
    streams.iter().max_by_key(|s| s.video_rank())
}

/// Best audio representation by bandwidth.
pub fn select_best_audio(streams: &[MediaStream]) -> Option<&MediaStream> {
    streams.iter().max_by_key(|s| s.bandwidth)
}

/// Directory for an uploader's videos: `<sanitized name>_<uid>`.
pub fn uploader_dir(base: &Path, metadata: &VideoMetadata) -> PathBuf {
    base.join(format!(
        "{}_{}",
        sanitize_filename(&metadata.uploader_name),
        metadata.uploader_id
    ))
}

/// Where a replacement is fetched before it takes over `output`.
fn staging_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(".new");
    PathBuf::from(name)
}

/// Drives one download from identifier to finished file.
pub struct Downloader {
    platform: Arc<dyn PlatformExtractor>,
    metadata: Arc<dyn MetadataResolver>,
    fetcher: ResumableFetcher,
    muxer: Arc<dyn Muxer>,
    progress: Arc<dyn ProgressReporter>,
    options: DownloadOptions,
}

impl Downloader {
    pub fn new(
        platform: Arc<dyn PlatformExtractor>,
        metadata: Arc<dyn MetadataResolver>,
        fetcher: ResumableFetcher,
        muxer: Arc<dyn Muxer>,
        progress: Arc<dyn ProgressReporter>,
        options: DownloadOptions,
    ) -> Self {
        Self {
            platform,
            metadata,
            fetcher,
            muxer,
            progress,
            options,
        }
    }

    pub fn options(&self) -> &DownloadOptions {
        &self.options
    }

    /// Run the pipeline, logging any failure instead of returning it.
    pub async fn run(&self, id: &ContentIdentifier) -> Option<DownloadOutcome> {
        match self.download(id).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                match e.stage() {
                    Some(stage) => error!(%id, %stage, error = %e, "Download failed"),
                    None => error!(%id, error = %e, "Download failed"),
                }
                if e.is_resumable() {
                    info!(%id, "Run again to resume the interrupted transfer");
                }
                None
            }
        }
    }

    #[instrument(skip(self, id), fields(id = %id))]
    pub async fn download(&self, id: &ContentIdentifier) -> Result<DownloadOutcome> {
        let metadata = self
            .metadata
            .resolve(id)
            .await
            .at(Stage::ResolveMetadata)?;
        info!(
            title = %metadata.title,
            cid = metadata.cid,
            uploader = %metadata.uploader_name,
            "Resolved video metadata"
        );

        let login = self.platform.check_login().await;
        debug!(stage = %Stage::CheckAuth, logged_in = login.is_logged_in(), "Session checked");

        let streams = self
            .platform
            .resolve_streams(id, metadata.cid)
            .await
            .at(Stage::ResolveStreams)?;
        info!(qn = streams.quality, streams = %streams, "Resolved streams");

        let catalog = self.platform.quality_catalog();
        let dir = uploader_dir(&self.options.base_dir, &metadata);
        ensure_dir_all(&dir).await.at(Stage::Decide)?;

        let title = sanitize_filename(&metadata.title);
        let output = dir.join(format!(
            "{title}_{}_{id}.mp4",
            catalog.label_token(streams.quality)
        ));

        let existing = find_existing(&dir, &metadata.title, id, catalog)
            .await
            .at(Stage::Decide)?;
        let decision = decide(
            existing.as_ref().map(|e| catalog.priority_of(e.quality)),
            catalog.priority_of(streams.quality),
            self.options.policy,
        );
        debug!(stage = %Stage::Decide, ?decision, ?existing, "Decided");

        let replaced = match (decision, existing) {
            (Decision::Skip(reason), Some(existing)) => {
                info!(
                    path = %existing.path.display(),
                    existing = %catalog.label_of(existing.quality),
                    new = %catalog.label_of(streams.quality),
                    ?reason,
                    "Skipping, already downloaded"
                );
                return Ok(DownloadOutcome::Skipped { existing, reason });
            }
            (Decision::Replace, Some(existing)) => {
                info!(
                    path = %existing.path.display(),
                    existing = %catalog.label_of(existing.quality),
                    new = %catalog.label_of(streams.quality),
                    "Replacing existing download"
                );
                Some(existing.path)
            }
            _ => None,
        };

        match &streams.kind {
            StreamKind::Dash { video, audio } => {
                self.fetch_dash(&streams, video, audio, &dir, &title, id, &output)
                    .await?
            }
            StreamKind::Flv {
                segments,
                format_name,
            } => {
                let in_place = replaced.as_deref() == Some(output.as_path());
                self.fetch_flv(segments, format_name, &output, in_place)
                    .await?
            }
        }

        if let Some(old) = &replaced
            && *old != output
        {
            remove_file_if_exists(old).await.at(Stage::Cleanup)?;
            info!(path = %old.display(), "Removed superseded download");
        }

        info!(path = %output.display(), quality = %catalog.label_of(streams.quality), "Download complete");
        Ok(DownloadOutcome::Downloaded {
            output,
            quality: streams.quality,
            replaced,
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn fetch_dash(
        &self,
        streams: &StreamDescriptor,
        video: &[MediaStream],
        audio: &[MediaStream],
        dir: &Path,
        title: &str,
        id: &ContentIdentifier,
        output: &Path,
    ) -> Result<()> {
        let best_video = select_best_video(video)
            .ok_or_else(|| Error::stream("no video representation"))
            .at(Stage::FetchDashPair)?;
        let best_audio = select_best_audio(audio)
            .ok_or_else(|| Error::stream("no audio representation"))
            .at(Stage::FetchDashPair)?;
        debug!(
            qn = streams.quality,
            width = best_video.width,
            height = best_video.height,
            video_bandwidth = best_video.bandwidth,
            audio_bandwidth = best_audio.bandwidth,
            "Selected DASH representations"
        );

        let video_path = dir.join(format!("{title}_video_{id}.m4s"));
        let audio_path = dir.join(format!("{title}_audio_{id}.m4s"));
        let video_request = FetchRequest::new(&best_video.url, &video_path)
            .with_expected_size(best_video.byte_length);
        let audio_request = FetchRequest::new(&best_audio.url, &audio_path)
            .with_expected_size(best_audio.byte_length);

        if self.options.concurrent_dash {
            tokio::try_join!(
                self.fetch_one(&video_request, "video"),
                self.fetch_one(&audio_request, "audio"),
            )
            .at(Stage::FetchDashPair)?;
        } else {
            self.fetch_one(&video_request, "video")
                .await
                .at(Stage::FetchDashPair)?;
            self.fetch_one(&audio_request, "audio")
                .await
                .at(Stage::FetchDashPair)?;
        }

        self.muxer
            .mux(&video_path, &audio_path, output)
            .await
            .at(Stage::Mux)
    }

    /// Fetch the first segment to `output`. When `in_place` the current
    /// output stays untouched until the new file is complete.
    async fn fetch_flv(
        &self,
        segments: &[FlvSegment],
        format_name: &str,
        output: &Path,
        in_place: bool,
    ) -> Result<()> {
        let first = segments
            .first()
            .ok_or_else(|| Error::stream("empty segment list"))
            .at(Stage::FetchSingle)?;
        if segments.len() > 1 {
            warn!(
                format = format_name,
                segments = segments.len(),
                "Only the first segment is downloaded"
            );
        }

        let target = if in_place {
            staging_path(output)
        } else {
            output.to_path_buf()
        };
        let request = FetchRequest::new(&first.url, &target).with_expected_size(first.byte_length);
        self.fetch_one(&request, format_name)
            .await
            .at(Stage::FetchSingle)?;

        if in_place {
            tokio::fs::rename(&target, output)
                .await
                .map_err(|e| io_error("renaming", &target, e))
                .at(Stage::FetchSingle)?;
        }
        Ok(())
    }

    async fn fetch_one(&self, request: &FetchRequest, label: &str) -> Result<FetchOutcome> {
        let sink = self.progress.transfer(label);
        let outcome = self.fetcher.try_fetch(request, sink.as_ref()).await?;
        debug!(label, path = %request.target_path.display(), ?outcome, "Transfer done");
        Ok(outcome)
    }
}
