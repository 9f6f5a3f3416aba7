use std::time::Duration;

use reqwest::Client;

use super::error::ExtractorError;

pub const DEFAULT_UA: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36";

/// Per-request timeout used for API and page requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub fn client_with_timeout(timeout: Duration) -> Result<Client, ExtractorError> {
    Ok(Client::builder()
        .user_agent(DEFAULT_UA)
        .timeout(timeout)
        .build()?)
}
