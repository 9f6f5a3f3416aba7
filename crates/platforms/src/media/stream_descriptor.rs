use serde::{Deserialize, Serialize};
use std::fmt;

/// One DASH representation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MediaStream {
    pub url: String,
    // Mirror URLs reported alongside the primary one
    pub backup_urls: Vec<String>,
    // Content length in bytes, when the API reports it
    pub byte_length: Option<u64>,
    pub width: u32,
    pub height: u32,
    // Bits per second
    pub bandwidth: u64,
    pub codecs: Option<String>,
}

impl MediaStream {
    /// Ordering key for picking the best video representation.
    pub fn video_rank(&self) -> (u32, u32, u64) {
        (self.width, self.height, self.bandwidth)
    }
}

/// One piece of a progressive (FLV/MP4) manifest.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FlvSegment {
    pub url: String,
    pub byte_length: Option<u64>,
    pub order: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum StreamKind {
    /// Separate audio and video tracks that need muxing.
    Dash {
        video: Vec<MediaStream>,
        audio: Vec<MediaStream>,
    },
    /// Audio and video already combined, ordered by `order`.
    Flv {
        segments: Vec<FlvSegment>,
        format_name: String,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct StreamDescriptor {
    pub kind: StreamKind,
    /// Quality code that was requested.
    pub quality: u32,
    pub quality_label: String,
    /// Quality code the API reports it actually served, if any.
    pub served_quality: Option<u32>,
}

impl StreamDescriptor {
    pub fn is_dash(&self) -> bool {
        matches!(self.kind, StreamKind::Dash { .. })
    }
}

impl fmt::Display for StreamDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            StreamKind::Dash { video, audio } => write!(
                f,
                "DASH {} ({} video, {} audio)",
                self.quality_label,
                video.len(),
                audio.len()
            ),
            StreamKind::Flv {
                segments,
                format_name,
            } => write!(
                f,
                "{} {} ({} segments)",
                format_name,
                self.quality_label,
                segments.len()
            ),
        }
    }
}
