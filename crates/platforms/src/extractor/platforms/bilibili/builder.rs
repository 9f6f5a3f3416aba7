use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::{
    extractor::{
        error::ExtractorError,
        platform_extractor::{Extractor, PlatformExtractor},
        platforms::bilibili::{
            content_id::ContentIdentifier,
            metadata::PageMetadataResolver,
            models::{ApiResponse, ApiStatus, DashStream, NavData, PlayUrlData},
            quality::{FALLBACK_QUALITY, QualityCatalog, QualityCode, needs_fourk},
        },
    },
    media::{FlvSegment, MediaStream, StreamDescriptor, StreamKind},
};

/// Result of the login check against the nav endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginStatus {
    LoggedIn { user_name: String },
    Anonymous,
}

impl LoginStatus {
    pub fn is_logged_in(&self) -> bool {
        matches!(self, LoginStatus::LoggedIn { .. })
    }
}

/// Client context for the Bilibili web API.
///
/// Owns the HTTP session (headers and the `SESSDATA` cookie), the quality
/// catalog used for negotiation and the API base URLs.
pub struct Bilibili {
    pub extractor: Extractor,
    catalog: QualityCatalog,
    api_base: String,
    web_base: String,
    logged_in: AtomicBool,
}

impl Bilibili {
    pub const BASE_URL: &str = "https://www.bilibili.com";

    pub const API_BASE_URL: &str = "https://api.bilibili.com";

    const REFERER: &str = "https://www.bilibili.com/";

    const PLAY_URL_PATH: &str = "/x/player/playurl";

    const NAV_PATH: &str = "/x/web-interface/nav";

    /// `session` is either a bare `SESSDATA` value or a full cookie string.
    pub fn new(client: Client, session: Option<String>) -> Self {
        let mut extractor = Extractor::new("Bilibili", client);

        if let Some(session) = session.as_deref().map(str::trim)
            && !session.is_empty()
        {
            if session.contains('=') {
                extractor.set_cookies_from_string(session);
            } else {
                extractor.add_cookie("SESSDATA", session);
            }
        }
        extractor.set_referer_static(Self::REFERER);

        Self {
            extractor,
            catalog: QualityCatalog::default(),
            api_base: Self::API_BASE_URL.to_string(),
            web_base: Self::BASE_URL.to_string(),
            logged_in: AtomicBool::new(false),
        }
    }

    pub fn with_catalog(mut self, catalog: QualityCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_web_base(mut self, web_base: impl Into<String>) -> Self {
        self.web_base = web_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.extractor.set_user_agent(user_agent);
        self
    }

    pub fn has_session(&self) -> bool {
        self.extractor.has_cookie("SESSDATA")
    }

    /// Page scraper sharing this client's session.
    pub fn metadata_resolver(&self) -> PageMetadataResolver {
        PageMetadataResolver::new(self.extractor.clone(), &self.web_base)
    }

    fn playurl_params(
        id: &ContentIdentifier,
        cid: u64,
        qn: QualityCode,
        resolve: bool,
    ) -> Vec<(&'static str, String)> {
        let (id_key, id_value) = id.api_param();
        let mut params = vec![
            (id_key, id_value),
            ("cid", cid.to_string()),
            ("qn", qn.to_string()),
            ("otype", "json".to_string()),
            ("fnval", "16".to_string()),
            ("fourk", if needs_fourk(qn) { "1" } else { "0" }.to_string()),
        ];
        if resolve {
            params.push(("fnver", "0".to_string()));
        }
        params
    }

    async fn get_bilibili_api<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, ExtractorError> {
        let api_url = format!("{}{}", self.api_base, path);
        debug!(url = %api_url, ?params, "Calling Bilibili API");

        let response = self.extractor.get(&api_url).query(params).send().await?;

        let json = response.json::<T>().await?;

        Ok(json)
    }
}

/// Turn a playurl response into a stream descriptor for quality `qn`.
pub(crate) fn classify_play_url(
    json: ApiResponse<PlayUrlData>,
    qn: QualityCode,
    catalog: &QualityCatalog,
    logged_in: bool,
) -> Result<StreamDescriptor, ExtractorError> {
    match json.code {
        0 => {}
        -101 => {
            return Err(ExtractorError::AuthRequired {
                message: json.message,
                logged_in,
            });
        }
        -403 => {
            return Err(ExtractorError::Forbidden {
                message: json.message,
            });
        }
        code => {
            return Err(ExtractorError::Api {
                code,
                message: json.message,
            });
        }
    }

    let data = json.data.ok_or(ExtractorError::NoPlayableStream)?;

    if let Some(served) = data.quality
        && served != qn
    {
        warn!(
            requested = qn,
            served, "API served a different quality than requested"
        );
    }

    let kind = if let Some(dash) = data.dash {
        let video = collect_streams(dash.video);
        let audio = collect_streams(dash.audio);
        if video.is_empty() || audio.is_empty() {
            return Err(ExtractorError::NoPlayableStream);
        }
        StreamKind::Dash { video, audio }
    } else if let Some(mut durl) = data.durl
        && !durl.is_empty()
    {
        durl.sort_by_key(|d| d.order);
        let segments = durl
            .into_iter()
            .map(|d| FlvSegment {
                url: d.url,
                byte_length: d.size,
                order: d.order,
            })
            .collect();
        StreamKind::Flv {
            segments,
            format_name: data.format.unwrap_or_else(|| "flv".to_string()),
        }
    } else {
        return Err(ExtractorError::NoPlayableStream);
    };

    Ok(StreamDescriptor {
        kind,
        quality: qn,
        quality_label: catalog.label_of(qn),
        served_quality: data.quality,
    })
}

fn collect_streams(streams: Option<Vec<DashStream>>) -> Vec<MediaStream> {
    streams
        .unwrap_or_default()
        .into_iter()
        .filter_map(|s| {
            let url = s.url()?.to_string();
            Some(MediaStream {
                backup_urls: s.backup_urls(),
                url,
                byte_length: s.size,
                width: s.width,
                height: s.height,
                bandwidth: s.bandwidth,
                codecs: s.codecs,
            })
        })
        .collect()
}

#[async_trait]
impl PlatformExtractor for Bilibili {
    fn quality_catalog(&self) -> &QualityCatalog {
        &self.catalog
    }

    async fn check_login(&self) -> LoginStatus {
        let status = match self
            .get_bilibili_api::<ApiResponse<NavData>>(Self::NAV_PATH, &[])
            .await
        {
            Ok(json) if json.code == 0 => match json.data {
                Some(NavData {
                    is_login: true,
                    uname,
                }) => LoginStatus::LoggedIn {
                    user_name: uname.unwrap_or_default(),
                },
                _ => LoginStatus::Anonymous,
            },
            Ok(json) => {
                debug!(code = json.code, message = %json.message, "Session is not logged in");
                LoginStatus::Anonymous
            }
            Err(e) => {
                warn!(error = %e, "Failed to check login status");
                LoginStatus::Anonymous
            }
        };

        match &status {
            LoginStatus::LoggedIn { user_name } => info!(user = %user_name, "Logged in"),
            LoginStatus::Anonymous if self.has_session() => {
                warn!("SESSDATA is expired or invalid, higher qualities may be unavailable")
            }
            LoginStatus::Anonymous => {
                info!("Not logged in, higher qualities may be unavailable")
            }
        }

        self.logged_in
            .store(status.is_logged_in(), Ordering::Relaxed);
        status
    }

    async fn probe_best_servable(&self, id: &ContentIdentifier, cid: u64) -> QualityCode {
        for qn in self.catalog.by_priority_desc() {
            let params = Self::playurl_params(id, cid, qn, false);
            match self
                .get_bilibili_api::<ApiStatus>(Self::PLAY_URL_PATH, &params)
                .await
            {
                Ok(status) if status.code == 0 => {
                    debug!(qn, "Quality is servable");
                    return qn;
                }
                Ok(status) => debug!(qn, code = status.code, "Quality rejected"),
                Err(e) => debug!(qn, error = %e, "Quality probe failed"),
            }
        }

        warn!(
            fallback = FALLBACK_QUALITY,
            "No quality probe succeeded, using fallback quality"
        );
        FALLBACK_QUALITY
    }

    async fn resolve_streams(
        &self,
        id: &ContentIdentifier,
        cid: u64,
    ) -> Result<StreamDescriptor, ExtractorError> {
        let qn = self.probe_best_servable(id, cid).await;
        info!(%id, qn, label = %self.catalog.label_of(qn), "Selected best servable quality");

        let params = Self::playurl_params(id, cid, qn, true);
        let json: ApiResponse<PlayUrlData> = self
            .get_bilibili_api(Self::PLAY_URL_PATH, &params)
            .await?;

        classify_play_url(
            json,
            qn,
            &self.catalog,
            self.logged_in.load(Ordering::Relaxed),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> ApiResponse<PlayUrlData> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_classify_dash() {
        let json = parse(
            r#"{"code":0,"message":"0","data":{"quality":80,"format":"flv",
            "dash":{
              "video":[
                {"baseUrl":"https://v/1.m4s","bandwidth":1000,"width":1280,"height":720},
                {"base_url":"https://v/2.m4s","bandwidth":900,"width":1920,"height":1080,"size":4096}
              ],
              "audio":[{"baseUrl":"https://a/1.m4s","bandwidth":128000}]
            }}}"#,
        );
        let descriptor = classify_play_url(json, 80, &QualityCatalog::default(), false).unwrap();
        assert_eq!(descriptor.quality, 80);
        assert_eq!(descriptor.quality_label, "1080P 高清");
        let StreamKind::Dash { video, audio } = descriptor.kind else {
            panic!("expected DASH");
        };
        assert_eq!(video.len(), 2);
        assert_eq!(video[1].url, "https://v/2.m4s");
        assert_eq!(video[1].byte_length, Some(4096));
        assert_eq!(audio[0].bandwidth, 128000);
    }

    #[test]
    fn test_classify_flv_orders_segments() {
        let json = parse(
            r#"{"code":0,"data":{"format":"flv480","durl":[
              {"order":2,"url":"https://f/2.flv","length":1000,"size":20},
              {"order":1,"url":"https://f/1.flv","length":1000,"size":10}
            ]}}"#,
        );
        let descriptor = classify_play_url(json, 32, &QualityCatalog::default(), false).unwrap();
        let StreamKind::Flv {
            segments,
            format_name,
        } = descriptor.kind
        else {
            panic!("expected FLV");
        };
        assert_eq!(format_name, "flv480");
        assert_eq!(segments[0].url, "https://f/1.flv");
        assert_eq!(segments[0].byte_length, Some(10));
    }

    #[test]
    fn test_classify_errors() {
        let catalog = QualityCatalog::default();

        let err = classify_play_url(
            parse(r#"{"code":-101,"message":"账号未登录"}"#),
            80,
            &catalog,
            false,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ExtractorError::AuthRequired {
                logged_in: false,
                ..
            }
        ));

        let err = classify_play_url(
            parse(r#"{"code":-403,"message":"访问权限不足"}"#),
            120,
            &catalog,
            true,
        )
        .unwrap_err();
        assert!(matches!(err, ExtractorError::Forbidden { .. }));

        let err = classify_play_url(
            parse(r#"{"code":-404,"message":"啥都木有"}"#),
            80,
            &catalog,
            true,
        )
        .unwrap_err();
        assert!(matches!(err, ExtractorError::Api { code: -404, .. }));

        let err = classify_play_url(parse(r#"{"code":0,"data":{"quality":80}}"#), 80, &catalog, true)
            .unwrap_err();
        assert!(matches!(err, ExtractorError::NoPlayableStream));
    }

    #[test]
    fn test_playurl_params() {
        let params = Bilibili::playurl_params(&ContentIdentifier::Av("42".to_string()), 7, 120, true);
        assert!(params.contains(&("avid", "42".to_string())));
        assert!(params.contains(&("fourk", "1".to_string())));
        assert!(params.contains(&("fnver", "0".to_string())));

        let params =
            Bilibili::playurl_params(&ContentIdentifier::Bv("BV1x".to_string()), 7, 80, false);
        assert!(params.contains(&("bvid", "BV1x".to_string())));
        assert!(params.contains(&("fourk", "0".to_string())));
        assert!(!params.iter().any(|(k, _)| *k == "fnver"));
    }

    #[test]
    fn test_bare_sessdata_becomes_cookie() {
        let bilibili = Bilibili::new(Client::new(), Some(" token123 ".to_string()));
        assert_eq!(
            bilibili.extractor.get_cookie("SESSDATA").map(String::as_str),
            Some("token123")
        );

        let bilibili = Bilibili::new(Client::new(), Some("SESSDATA=abc; bili_jct=x".to_string()));
        assert!(bilibili.has_session());
        assert!(bilibili.extractor.has_cookie("bili_jct"));

        assert!(!Bilibili::new(Client::new(), Some(String::new())).has_session());
    }
}
