mod default;
pub mod error;
pub mod platform_extractor;
pub mod platforms;
pub mod utils;

pub use default::{DEFAULT_TIMEOUT, DEFAULT_UA, client_with_timeout};
