use std::time::Duration;

use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue};

use crate::DownloadError;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36";

/// Partial files smaller than this are discarded after a failed transfer.
pub const DEFAULT_MIN_PARTIAL_SIZE: u64 = 1024;

/// Size of the write buffer sitting between the network stream and the file.
pub const DEFAULT_BUFFER_SIZE: usize = 16 * 1024;

/// Configurable options for the downloader
#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    /// Overall timeout for a request, zero disables it.
    ///
    /// Media transfers can run for a long time, so the default only bounds
    /// connection setup and idle reads.
    pub timeout: Duration,

    /// Connection timeout (time to establish initial connection)
    pub connect_timeout: Duration,

    /// Read timeout (maximum time between receiving data chunks)
    pub read_timeout: Duration,

    /// Whether to follow redirects
    pub follow_redirects: bool,

    /// User agent string
    pub user_agent: String,

    /// Custom HTTP headers sent with every request made by the client
    pub headers: HeaderMap,

    /// `Referer` sent with range requests, media CDNs reject requests without it
    pub referer: Option<String>,

    /// `Origin` sent with range requests
    pub origin: Option<String>,

    /// Write buffer size in bytes
    pub buffer_size: usize,

    /// Failed transfers leaving less than this many bytes delete their partial file
    pub min_partial_size: u64,

    /// Maximum idle connections to keep per host
    pub pool_max_idle_per_host: usize,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::ZERO,
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            follow_redirects: true,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            headers: DownloaderConfig::get_default_headers(),
            referer: None,
            origin: None,
            buffer_size: DEFAULT_BUFFER_SIZE,
            min_partial_size: DEFAULT_MIN_PARTIAL_SIZE,
            pool_max_idle_per_host: 5,
        }
    }
}

impl DownloaderConfig {
    pub fn get_default_headers() -> HeaderMap {
        let mut default_headers = HeaderMap::new();

        default_headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static("*/*"),
        );

        default_headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("zh-CN,zh;q=0.9"),
        );
        default_headers
    }

    /// Set both `Referer` and `Origin` for range requests.
    pub fn with_site(mut self, referer: impl Into<String>, origin: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self.origin = Some(origin.into());
        self
    }
}

/// Create a reqwest Client with the provided configuration
pub fn create_client(config: &DownloaderConfig) -> Result<Client, DownloadError> {
    let mut client_builder = Client::builder()
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .user_agent(&config.user_agent)
        .default_headers(config.headers.clone())
        .redirect(if config.follow_redirects {
            reqwest::redirect::Policy::limited(10)
        } else {
            reqwest::redirect::Policy::none()
        });

    if !config.timeout.is_zero() {
        client_builder = client_builder.timeout(config.timeout);
    }

    if !config.connect_timeout.is_zero() {
        client_builder = client_builder.connect_timeout(config.connect_timeout);
    }

    if !config.read_timeout.is_zero() {
        client_builder = client_builder.read_timeout(config.read_timeout);
    }

    client_builder.build().map_err(DownloadError::from)
}
