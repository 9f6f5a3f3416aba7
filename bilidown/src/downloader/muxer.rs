//! Muxing of DASH video/audio sidecars into a single MP4 with ffmpeg.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors raised while locating or running the muxer.
#[derive(Error, Debug)]
pub enum MuxError {
    #[error("failed to spawn `{}`: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        source: std::io::Error,
    },

    #[error("ffmpeg exited with {status}: {stderr}")]
    Failed { status: ExitStatus, stderr: String },

    #[error("IO error while {op} `{}`: {source}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("ffmpeg not found: configure `[ffmpeg] path` or add it to PATH")]
    NotFound,
}

/// Combines a video and an audio file into `output`.
///
/// On success the inputs are deleted; on failure they are left in place so
/// the download does not have to be repeated.
#[async_trait]
pub trait Muxer: Send + Sync {
    async fn mux(&self, video: &Path, audio: &Path, output: &Path) -> Result<(), MuxError>;
}

/// Where a usable ffmpeg was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FfmpegLocation {
    pub program: PathBuf,
    pub version: String,
    /// The configured location was unusable and `program` came from `PATH`.
    pub auto_configured: bool,
}

#[derive(Debug, Clone)]
pub struct FfmpegMuxer {
    program: PathBuf,
}

impl FfmpegMuxer {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Find a working ffmpeg, preferring the configured file or directory
    /// over `PATH`.
    pub fn locate(configured: Option<&Path>) -> Result<FfmpegLocation, MuxError> {
        if let Some(configured) = configured {
            match process_utils::resolve_configured("ffmpeg", configured) {
                Some(program) => {
                    if let Some(version) = process_utils::probe_version(&program) {
                        return Ok(FfmpegLocation {
                            program,
                            version,
                            auto_configured: false,
                        });
                    }
                    warn!(path = %program.display(), "Configured ffmpeg does not run");
                }
                None => warn!(path = %configured.display(), "Configured ffmpeg path is unusable"),
            }
        }

        let program = process_utils::find_on_path("ffmpeg").ok_or(MuxError::NotFound)?;
        let version = process_utils::probe_version(&program).ok_or(MuxError::NotFound)?;
        Ok(FfmpegLocation {
            program,
            version,
            auto_configured: configured.is_some(),
        })
    }

    /// Stream-copy arguments for muxing `video` and `audio` into `output`.
    pub fn build_args(video: &Path, audio: &Path, output: &Path) -> Vec<String> {
        let mut args: Vec<String> = ["-y", "-hide_banner", "-loglevel", "error"]
            .into_iter()
            .map(String::from)
            .collect();
        args.push("-i".to_string());
        args.push(video.to_string_lossy().into_owned());
        args.push("-i".to_string());
        args.push(audio.to_string_lossy().into_owned());
        args.extend(["-c:v", "copy", "-c:a", "copy"].map(String::from));
        args.push(output.to_string_lossy().into_owned());
        args
    }
}

async fn remove_quietly(path: &Path) -> Result<(), MuxError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(MuxError::Io {
            op: "removing",
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[async_trait]
impl Muxer for FfmpegMuxer {
    async fn mux(&self, video: &Path, audio: &Path, output: &Path) -> Result<(), MuxError> {
        remove_quietly(output).await?;

        let args = Self::build_args(video, audio, output);
        debug!(program = %self.program.display(), ?args, "Running ffmpeg");

        let result = process_utils::tokio_command(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| MuxError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !result.status.success() {
            return Err(MuxError::Failed {
                status: result.status,
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        info!(path = %output.display(), "Muxed video and audio");
        for sidecar in [video, audio] {
            if let Err(e) = remove_quietly(sidecar).await {
                warn!(error = %e, "Failed to delete intermediate file");
            }
        }
        Ok(())
    }
}
