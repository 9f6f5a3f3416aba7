//! Video page scraping.
//!
//! The watch page embeds everything needed to request streams: the title in
//! its `<head>`, the `cid` of the first part in inline scripts and the
//! uploader in the `window.__INITIAL_STATE__` JSON blob. Extraction is a set
//! of regular expressions tried in order; fields other than `cid` fall back
//! to placeholders when nothing matches.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::extractor::{
    error::ExtractorError,
    platform_extractor::Extractor,
    platforms::bilibili::content_id::ContentIdentifier,
    utils::{capture_group_1, first_capture, unescape_html},
};

pub const UNKNOWN_UPLOADER: &str = "unknown_uploader";
pub const UNKNOWN_UPLOADER_ID: &str = "unknown_id";

static TITLE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#"<h1[^>]*class="video-title[^"]*"[^>]*title="([^"]+)""#,
        r#"<h1[^>]*class="video-title[^"]*"[^>]*>\s*([^<]+?)\s*</h1>"#,
        r#"<meta[^>]*property="og:title"[^>]*content="([^"]*)""#,
        r"<title[^>]*>([^<]*)</title>",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static CID_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [r#""cid":(\d+),"#, r"cid=(\d+)", r#"\{"cid":(\d+)\}"#]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
});

static UPLOADER_NAME_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#"<a[^>]*class="up-name[^"]*"[^>]*>\s*([^<]+?)\s*<"#,
        r#"<meta[^>]*name="author"[^>]*content="([^"]*)""#,
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static UPLOADER_ID_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [r#"data-user-id="(\d+)""#, r"up_uid=(\d+)", r#"data-mid="(\d+)""#]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
});

static INITIAL_STATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)window\.__INITIAL_STATE__=(.*?);\(function\(\)").unwrap()
});

static TITLE_CLEANUP: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"_哔哩哔哩.*").unwrap(),
        Regex::new(r"【.*?】").unwrap(),
        Regex::new(r"\|.*").unwrap(),
    ]
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoMetadata {
    pub title: String,
    pub cid: u64,
    pub uploader_name: String,
    pub uploader_id: String,
}

#[async_trait]
pub trait MetadataResolver: Send + Sync {
    async fn resolve(&self, id: &ContentIdentifier) -> Result<VideoMetadata, ExtractorError>;
}

/// Fetches `{web_base}/video/<id>` and scrapes it.
#[derive(Debug, Clone)]
pub struct PageMetadataResolver {
    extractor: Extractor,
    web_base: String,
}

impl PageMetadataResolver {
    pub fn new(extractor: Extractor, web_base: &str) -> Self {
        Self {
            extractor,
            web_base: web_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn page_url(&self, id: &ContentIdentifier) -> String {
        format!("{}/video/{}", self.web_base, id)
    }
}

#[async_trait]
impl MetadataResolver for PageMetadataResolver {
    #[instrument(skip(self), fields(id = %id))]
    async fn resolve(&self, id: &ContentIdentifier) -> Result<VideoMetadata, ExtractorError> {
        let url = self.page_url(id);
        debug!(url = %url, "Fetching video page");

        let html = self
            .extractor
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_video_page(&html, id)
    }
}

/// Extract metadata from the watch page of `id`.
pub fn parse_video_page(
    html: &str,
    id: &ContentIdentifier,
) -> Result<VideoMetadata, ExtractorError> {
    let cid = first_capture(&CID_PATTERNS, html)
        .and_then(|cid| cid.parse::<u64>().ok())
        .ok_or_else(|| ExtractorError::MissingCid(id.to_string()))?;

    let title = first_capture(&TITLE_PATTERNS, html)
        .map(|raw| clean_title(&unescape_html(raw)))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| format!("video_{id}"));

    let (state_name, state_id) = uploader_from_initial_state(html);

    let uploader_name = state_name
        .or_else(|| first_capture(&UPLOADER_NAME_PATTERNS, html).map(unescape_html))
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| UNKNOWN_UPLOADER.to_string());

    let uploader_id = state_id
        .or_else(|| first_capture(&UPLOADER_ID_PATTERNS, html).map(ToOwned::to_owned))
        .unwrap_or_else(|| UNKNOWN_UPLOADER_ID.to_string());

    Ok(VideoMetadata {
        title,
        cid,
        uploader_name,
        uploader_id,
    })
}

fn clean_title(raw: &str) -> String {
    let mut title = raw.trim().to_string();
    for re in TITLE_CLEANUP.iter() {
        title = re.replace_all(&title, "").into_owned();
    }
    title.trim().to_string()
}

fn uploader_from_initial_state(html: &str) -> (Option<String>, Option<String>) {
    let Some(state) = capture_group_1(&INITIAL_STATE_REGEX, html)
        .and_then(|raw| serde_json::from_str::<Value>(raw).ok())
    else {
        return (None, None);
    };

    let owner = state
        .get("upData")
        .or_else(|| state.get("videoData").and_then(|v| v.get("owner")));
    let Some(owner) = owner else {
        return (None, None);
    };

    let name = owner
        .get("name")
        .and_then(Value::as_str)
        .map(ToOwned::to_owned);
    let mid = owner.get("mid").and_then(|mid| match mid {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    });
    (name, mid)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html><html><head>
        <title data-vue-meta="true">【4K】Rust 入门教程_哔哩哔哩_bilibili</title>
        <meta data-vue-meta="true" property="og:title" content="Rust &amp; Tokio 入门教程_哔哩哔哩_bilibili">
        </head><body>
        <script>window.__INITIAL_STATE__={"videoData":{"bvid":"BV1xx411c7mD","cid":2233,"owner":{"mid":546195,"name":"老番茄"}}};(function(){var s;}());</script>
        <script>window.__playinfo__={"cid":2233,"quality":80}</script>
        </body></html>"#;

    fn bv() -> ContentIdentifier {
        ContentIdentifier::Bv("BV1xx411c7mD".to_string())
    }

    #[test]
    fn test_parse_full_page() {
        let meta = parse_video_page(PAGE, &bv()).unwrap();
        assert_eq!(meta.cid, 2233);
        assert_eq!(meta.title, "Rust & Tokio 入门教程");
        assert_eq!(meta.uploader_name, "老番茄");
        assert_eq!(meta.uploader_id, "546195");
    }

    #[test]
    fn test_up_data_takes_precedence() {
        let page = r#"<title>标题</title><script>window.__INITIAL_STATE__={"upData":{"mid":"99","name":"UP"},"videoData":{"owner":{"mid":1,"name":"other"}}};(function(){}())</script>cid=5"#;
        let meta = parse_video_page(page, &bv()).unwrap();
        assert_eq!(meta.uploader_name, "UP");
        assert_eq!(meta.uploader_id, "99");
        assert_eq!(meta.cid, 5);
    }

    #[test]
    fn test_placeholders_when_fields_missing() {
        let meta = parse_video_page(r#"{"cid":77,"page":1}"#, &ContentIdentifier::Av("10".to_string())).unwrap();
        assert_eq!(meta.title, "video_av10");
        assert_eq!(meta.uploader_name, UNKNOWN_UPLOADER);
        assert_eq!(meta.uploader_id, UNKNOWN_UPLOADER_ID);
    }

    #[test]
    fn test_fallback_uploader_patterns() {
        let page = r#"<title>T</title><meta name="author" content="作者"> <div data-mid="123"></div> cid=1"#;
        let meta = parse_video_page(page, &bv()).unwrap();
        assert_eq!(meta.uploader_name, "作者");
        assert_eq!(meta.uploader_id, "123");
    }

    #[test]
    fn test_missing_cid_is_an_error() {
        let err = parse_video_page("<title>no cid here</title>", &bv()).unwrap_err();
        assert!(matches!(err, ExtractorError::MissingCid(id) if id == "BV1xx411c7mD"));
    }

    #[test]
    fn test_clean_title() {
        assert_eq!(clean_title("【官方】新番 | 第1集_哔哩哔哩_bilibili"), "新番");
        assert_eq!(clean_title("  plain  "), "plain");
    }
}
