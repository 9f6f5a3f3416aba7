use serde::Deserialize;

/// Envelope shared by all `api.bilibili.com` JSON responses.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

/// Envelope with the payload ignored, used when only `code` matters.
#[derive(Debug, Deserialize)]
pub struct ApiStatus {
    pub code: i64,
}

#[derive(Debug, Deserialize)]
pub struct PlayUrlData {
    pub quality: Option<u32>,
    pub format: Option<String>,
    pub dash: Option<DashInfo>,
    pub durl: Option<Vec<Durl>>,
}

#[derive(Debug, Deserialize)]
pub struct DashInfo {
    #[serde(default)]
    pub video: Option<Vec<DashStream>>,
    #[serde(default)]
    pub audio: Option<Vec<DashStream>>,
}

// The API sends both camelCase and snake_case copies of the URL fields, so
// they are kept apart instead of aliased.
#[derive(Debug, Deserialize)]
pub struct DashStream {
    #[serde(rename = "baseUrl")]
    pub base_url_camel: Option<String>,
    #[serde(rename = "base_url")]
    pub base_url_snake: Option<String>,
    #[serde(rename = "backupUrl")]
    pub backup_url_camel: Option<Vec<String>>,
    #[serde(rename = "backup_url")]
    pub backup_url_snake: Option<Vec<String>>,
    #[serde(default)]
    pub bandwidth: u64,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    pub codecs: Option<String>,
    pub size: Option<u64>,
}

impl DashStream {
    pub fn url(&self) -> Option<&str> {
        self.base_url_camel
            .as_deref()
            .or(self.base_url_snake.as_deref())
    }

    pub fn backup_urls(&self) -> Vec<String> {
        self.backup_url_camel
            .clone()
            .or_else(|| self.backup_url_snake.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
pub struct Durl {
    pub url: String,
    #[serde(default)]
    pub order: u32,
    // Duration in milliseconds
    pub length: Option<u64>,
    // Bytes
    pub size: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct NavData {
    #[serde(rename = "isLogin", default)]
    pub is_login: bool,
    pub uname: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dash_stream_with_both_url_spellings() {
        let json = r#"{
            "id": 80,
            "baseUrl": "https://upos.example/v.m4s",
            "base_url": "https://upos.example/v.m4s",
            "backupUrl": ["https://backup.example/v.m4s"],
            "backup_url": ["https://backup.example/v.m4s"],
            "bandwidth": 2000000,
            "width": 1920,
            "height": 1080,
            "codecs": "avc1.640032"
        }"#;
        let stream: DashStream = serde_json::from_str(json).unwrap();
        assert_eq!(stream.url(), Some("https://upos.example/v.m4s"));
        assert_eq!(stream.backup_urls().len(), 1);
        assert_eq!(stream.size, None);
    }

    #[test]
    fn test_error_envelope_without_data() {
        let json = r#"{"code":-101,"message":"账号未登录","ttl":1}"#;
        let resp: ApiResponse<PlayUrlData> = serde_json::from_str(json).unwrap();
        assert_eq!(resp.code, -101);
        assert!(resp.data.is_none());
    }
}
