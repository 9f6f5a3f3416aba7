pub mod filename;
pub mod fs;

pub use filename::sanitize_filename;
