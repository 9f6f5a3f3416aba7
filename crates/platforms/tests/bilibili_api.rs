//! Bilibili API behaviour against a mocked `api.bilibili.com`.

use platforms_parser::extractor::platform_extractor::PlatformExtractor;
use platforms_parser::{
    Bilibili, ContentIdentifier, ExtractorError, LoginStatus, MetadataResolver, StreamKind,
};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PLAY_URL: &str = "/x/player/playurl";

fn bilibili(server: &MockServer, session: Option<&str>) -> Bilibili {
    Bilibili::new(reqwest::Client::new(), session.map(ToOwned::to_owned))
        .with_api_base(server.uri())
        .with_web_base(server.uri())
}

fn bv() -> ContentIdentifier {
    ContentIdentifier::Bv("BV1xx411c7mD".to_string())
}

async fn reject_everything_else(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(PLAY_URL))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": -404,
            "message": "啥都木有"
        })))
        .with_priority(10)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_probe_returns_first_servable_quality() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(PLAY_URL))
        .and(query_param("qn", "116"))
        .and(query_param("bvid", "BV1xx411c7mD"))
        .and(query_param("cid", "2233"))
        .and(query_param("fnval", "16"))
        .and(query_param("fourk", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 0, "data": {}})))
        .with_priority(1)
        .mount(&server)
        .await;
    reject_everything_else(&server).await;

    let qn = bilibili(&server, None).probe_best_servable(&bv(), 2233).await;
    assert_eq!(qn, 116);
}

#[tokio::test]
async fn test_probe_falls_back_to_1080p() {
    let server = MockServer::start().await;
    reject_everything_else(&server).await;

    let qn = bilibili(&server, None).probe_best_servable(&bv(), 1).await;
    assert_eq!(qn, 80);
}

#[tokio::test]
async fn test_probe_survives_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PLAY_URL))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let qn = bilibili(&server, None)
        .probe_best_servable(&ContentIdentifier::Av("170001".to_string()), 1)
        .await;
    assert_eq!(qn, 80);
}

#[tokio::test]
async fn test_resolve_dash_streams() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(PLAY_URL))
        .and(query_param("qn", "64"))
        .and(query_param("fnver", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": {
                "quality": 64,
                "dash": {
                    "video": [
                        {"baseUrl": "https://cdn/v720.m4s", "base_url": "https://cdn/v720.m4s",
                         "bandwidth": 900000, "width": 1280, "height": 720, "codecs": "avc1"}
                    ],
                    "audio": [
                        {"baseUrl": "https://cdn/a.m4s", "bandwidth": 132000}
                    ]
                }
            }
        })))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(PLAY_URL))
        .and(query_param("qn", "64"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 0, "data": {}})))
        .with_priority(2)
        .mount(&server)
        .await;
    reject_everything_else(&server).await;

    let descriptor = bilibili(&server, None)
        .resolve_streams(&bv(), 2233)
        .await
        .unwrap();

    assert_eq!(descriptor.quality, 64);
    assert_eq!(descriptor.quality_label, "720P 准高清");
    let StreamKind::Dash { video, audio } = descriptor.kind else {
        panic!("expected DASH streams");
    };
    assert_eq!(video[0].url, "https://cdn/v720.m4s");
    assert_eq!((video[0].width, video[0].height), (1280, 720));
    assert_eq!(audio[0].url, "https://cdn/a.m4s");
}

#[tokio::test]
async fn test_resolve_reports_auth_required() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(PLAY_URL))
        .and(query_param("fnver", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": -101,
            "message": "账号未登录"
        })))
        .with_priority(1)
        .mount(&server)
        .await;
    reject_everything_else(&server).await;

    let err = bilibili(&server, None)
        .resolve_streams(&bv(), 1)
        .await
        .unwrap_err();
    match err {
        ExtractorError::AuthRequired { message, logged_in } => {
            assert_eq!(message, "账号未登录");
            assert!(!logged_in);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_check_login_sends_session_cookie() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/x/web-interface/nav"))
        .and(header("Cookie", "SESSDATA=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": {"isLogin": true, "uname": "测试用户"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let status = bilibili(&server, Some("abc123")).check_login().await;
    assert_eq!(
        status,
        LoginStatus::LoggedIn {
            user_name: "测试用户".to_string()
        }
    );
}

#[tokio::test]
async fn test_check_login_never_fails() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/x/web-interface/nav"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": -101,
            "message": "账号未登录",
            "data": {"isLogin": false}
        })))
        .mount(&server)
        .await;
    assert_eq!(
        bilibili(&server, None).check_login().await,
        LoginStatus::Anonymous
    );

    let unreachable = Bilibili::new(reqwest::Client::new(), None).with_api_base("http://127.0.0.1:9");
    assert_eq!(unreachable.check_login().await, LoginStatus::Anonymous);
}

#[tokio::test]
async fn test_page_metadata_resolver() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/video/BV1xx411c7mD"))
        .and(header("Referer", "https://www.bilibili.com/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><head><meta property="og:title" content="标题_哔哩哔哩_bilibili"></head>
            <script>window.__INITIAL_STATE__={"videoData":{"owner":{"mid":7,"name":"UP主"}}};(function(){}())</script>
            <script>{"cid":2233,"page":1}</script></html>"#,
        ))
        .mount(&server)
        .await;

    let meta = bilibili(&server, None)
        .metadata_resolver()
        .resolve(&bv())
        .await
        .unwrap();
    assert_eq!(meta.title, "标题");
    assert_eq!(meta.cid, 2233);
    assert_eq!(meta.uploader_name, "UP主");
    assert_eq!(meta.uploader_id, "7");
}

#[tokio::test]
async fn test_page_metadata_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = bilibili(&server, None)
        .metadata_resolver()
        .resolve(&bv())
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractorError::HttpError(_)));
}
