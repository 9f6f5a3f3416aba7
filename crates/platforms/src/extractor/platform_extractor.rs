use crate::extractor::default::DEFAULT_UA;
use crate::extractor::platforms::bilibili::{
    ContentIdentifier, LoginStatus, QualityCatalog, QualityCode,
};
use crate::media::StreamDescriptor;

use super::error::ExtractorError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, RequestBuilder};
use rustc_hash::FxHashMap;
use tracing::debug;

/// Shared HTTP context for a platform: client, default headers and cookies.
///
/// Every request built through [`Extractor::request`] carries the platform
/// headers plus a `Cookie` header assembled from the stored cookies.
///
/// ```rust,no_run
/// # use reqwest::Client;
/// # use platforms_parser::extractor::platform_extractor::Extractor;
/// let mut extractor = Extractor::new("Bilibili", Client::new());
/// extractor.set_cookies_from_string("SESSDATA=abc123; bili_jct=xyz789");
/// assert!(extractor.has_cookie("SESSDATA"));
/// ```
#[derive(Debug, Clone)]
pub struct Extractor {
    // name of the platform, e.g. "Bilibili"
    pub platform_name: String,
    pub client: Client,
    platform_headers: HeaderMap,
    /// Cookies sent with every request.
    pub cookies: FxHashMap<String, String>,
}

impl Extractor {
    pub fn new<S: Into<String>>(platform_name: S, client: Client) -> Self {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            reqwest::header::USER_AGENT,
            HeaderValue::from_static(DEFAULT_UA),
        );
        default_headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("zh-CN,zh;q=0.9"),
        );
        // Accept-Encoding is left to reqwest so it can decompress transparently.

        Self {
            platform_name: platform_name.into(),
            client,
            platform_headers: default_headers,
            cookies: FxHashMap::default(),
        }
    }

    #[inline]
    pub fn set_referer_static(&mut self, referer: &'static str) {
        self.add_header_owned(reqwest::header::REFERER, HeaderValue::from_static(referer));
    }

    pub fn set_user_agent(&mut self, user_agent: &str) {
        self.add_header_typed(reqwest::header::USER_AGENT, user_agent);
    }

    pub fn add_header_owned<K: Into<HeaderName>, V: Into<HeaderValue>>(
        &mut self,
        key: K,
        value: V,
    ) {
        self.platform_headers.insert(key.into(), value.into());
    }

    pub fn add_header_typed<K: Into<HeaderName>, V: AsRef<str>>(&mut self, key: K, value: V) {
        match HeaderValue::from_str(value.as_ref()) {
            Ok(value) => {
                self.platform_headers.insert(key.into(), value);
            }
            Err(e) => {
                debug!(error = %e, "Invalid header value; skipping");
            }
        }
    }

    pub fn add_cookie<N: Into<String>, V: Into<String>>(&mut self, name: N, value: V) {
        self.cookies.insert(name.into(), value.into());
    }

    /// Set cookies from a cookie string (format: "name1=value1; name2=value2").
    pub fn set_cookies_from_string(&mut self, cookie_string: &str) {
        // Accept common separators: ';' from Cookie headers and '\n' from copy/paste.
        for part in cookie_string.split(&[';', '\n'][..]).map(str::trim) {
            if part.is_empty() {
                continue;
            }

            let Some((name, value)) = part.split_once('=') else {
                continue;
            };
            let name = name.trim();
            let value = value.trim();
            if name.is_empty() || value.is_empty() {
                continue;
            }

            self.cookies.insert(name.to_owned(), value.to_owned());
        }
    }

    pub fn has_cookie(&self, name: &str) -> bool {
        self.cookies.contains_key(name)
    }

    pub fn get_cookie(&self, name: &str) -> Option<&String> {
        self.cookies.get(name)
    }

    fn build_cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }

        let mut cookie_string = String::with_capacity(
            self.cookies
                .iter()
                .map(|(k, v)| k.len() + 1 + v.len() + 2)
                .sum(),
        );

        for (name, value) in &self.cookies {
            if !cookie_string.is_empty() {
                cookie_string.push_str("; ");
            }
            cookie_string.push_str(name);
            cookie_string.push('=');
            cookie_string.push_str(value);
        }

        Some(cookie_string)
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.request(Method::GET, url)
    }

    /// Create a request carrying the platform headers and stored cookies.
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let mut headers = self.platform_headers.clone();

        if let Some(cookie_header) = self.build_cookie_header() {
            match HeaderValue::from_str(&cookie_header) {
                Ok(value) => {
                    headers.insert(reqwest::header::COOKIE, value);
                }
                Err(e) => {
                    // Malformed cookies are dropped rather than sent half-encoded.
                    debug!(error = %e, "Failed to build Cookie header");
                }
            }
        }

        self.client.request(method, url).headers(headers)
    }
}

/// Resolves streams for a video on one platform.
#[async_trait]
pub trait PlatformExtractor: Send + Sync {
    fn quality_catalog(&self) -> &QualityCatalog;

    /// Whether the configured session is logged in. Never fails.
    async fn check_login(&self) -> LoginStatus;

    /// Best quality code the API agrees to serve.
    async fn probe_best_servable(&self, id: &ContentIdentifier, cid: u64) -> QualityCode;

    async fn resolve_streams(
        &self,
        id: &ContentIdentifier,
        cid: u64,
    ) -> Result<StreamDescriptor, ExtractorError>;
}
