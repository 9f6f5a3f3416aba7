mod builder;
pub mod content_id;
pub mod metadata;
pub mod models;
pub mod quality;

pub use builder::{Bilibili, LoginStatus};
pub use content_id::ContentIdentifier;
pub use metadata::{MetadataResolver, PageMetadataResolver, VideoMetadata, parse_video_page};
pub use quality::{FALLBACK_QUALITY, QualityCatalog, QualityCode};
