pub mod stream_descriptor;

pub use stream_descriptor::{FlvSegment, MediaStream, StreamDescriptor, StreamKind};
