//! Bilibili video extraction: identifier parsing, page metadata, quality
//! negotiation and playurl stream resolution.

pub mod extractor;
pub mod media;

pub use extractor::error::ExtractorError;
pub use extractor::platforms::bilibili::{
    Bilibili, ContentIdentifier, LoginStatus, MetadataResolver, PageMetadataResolver,
    QualityCatalog, QualityCode, VideoMetadata,
};
pub use media::{FlvSegment, MediaStream, StreamDescriptor, StreamKind};
