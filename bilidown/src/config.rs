//! Application configuration stored as TOML.
//!
//! The file is created with defaults on first run. Keys missing from an
//! existing file take their defaults and the completed file is written back;
//! a file that fails to parse is reported and ignored.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use mesio::DownloaderConfig;
use platforms_parser::extractor::DEFAULT_TIMEOUT;
use platforms_parser::{Bilibili, QualityCatalog};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::downloader::OverwritePolicy;
use crate::utils::fs::{ensure_parent_dir, io_error};
use crate::{Error, Result};

/// Keys the written file always carries; their absence triggers a rewrite.
const REQUIRED_KEYS: &[&str] = &["base_download_dir", "overwrite_strategy", "network"];
const OVERWRITE_KEYS: &[&str] = &["overwrite_existing", "higher_quality_replace"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FfmpegConfig {
    /// The ffmpeg executable or the directory containing it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Timeout for API and page requests, and for connecting to media hosts.
    pub timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            user_agent: None,
        }
    }
}

impl NetworkConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_download_dir: PathBuf,
    /// Pre-rename spelling of `base_download_dir`.
    #[serde(rename = "download_dir", skip_serializing)]
    legacy_download_dir: Option<PathBuf>,
    /// `SESSDATA` cookie value, or a full cookie string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sessdata: Option<String>,
    /// Fetch DASH video and audio concurrently.
    pub concurrent_dash: bool,
    // Tables go after plain values.
    pub ffmpeg: FfmpegConfig,
    pub overwrite_strategy: OverwritePolicy,
    pub network: NetworkConfig,
    /// Overrides of the quality ranking, keyed by quality code.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub quality_priority: BTreeMap<String, i32>,
    /// Overrides of the quality labels, keyed by quality code.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub quality_labels: BTreeMap<String, String>,
    #[serde(skip)]
    source: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_download_dir: default_download_dir(),
            legacy_download_dir: None,
            ffmpeg: FfmpegConfig::default(),
            overwrite_strategy: OverwritePolicy::default(),
            sessdata: None,
            concurrent_dash: false,
            network: NetworkConfig::default(),
            quality_priority: BTreeMap::new(),
            quality_labels: BTreeMap::new(),
            source: None,
        }
    }
}

fn default_download_dir() -> PathBuf {
    dirs::download_dir()
        .map(|dir| dir.join("bilidown"))
        .unwrap_or_else(|| PathBuf::from("downloads"))
}

impl AppConfig {
    /// `<config dir>/bilidown/config.toml`, or `config.toml` when the platform
    /// has no config directory.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join("bilidown").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Load the configuration at `path`, creating or completing it as needed.
    pub async fn load(path: &Path) -> Result<Self> {
        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "Config file not found, writing defaults");
                let config = Self::default().with_source(path);
                config.save().await?;
                return Ok(config);
            }
            Err(e) => return Err(io_error("reading", path, e)),
        };

        let (mut config, missing) = match Self::parse(&text) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to parse config file, using defaults");
                return Ok(Self::default().with_source(path));
            }
        };
        config.source = Some(path.to_path_buf());

        let migrated = config.migrate_legacy();
        if !missing.is_empty() || migrated {
            for key in &missing {
                info!(key = %key, "Config is missing a key, added default");
            }
            config.save().await?;
            info!(path = %path.display(), "Config file updated");
        }
        Ok(config)
    }

    /// Parse `text`, also returning the expected keys it does not set.
    pub fn parse(text: &str) -> std::result::Result<(Self, Vec<String>), toml::de::Error> {
        let table: toml::Table = toml::from_str(text)?;
        let config: Self = toml::from_str(text)?;

        let mut missing: Vec<String> = REQUIRED_KEYS
            .iter()
            .filter(|key| !table.contains_key(**key))
            .filter(|key| !(**key == "base_download_dir" && table.contains_key("download_dir")))
            .map(|key| key.to_string())
            .collect();
        if let Some(toml::Value::Table(strategy)) = table.get("overwrite_strategy") {
            missing.extend(
                OVERWRITE_KEYS
                    .iter()
                    .filter(|key| !strategy.contains_key(**key))
                    .map(|key| format!("overwrite_strategy.{key}")),
            );
        }
        Ok((config, missing))
    }

    /// Move a legacy `download_dir` into `base_download_dir`.
    fn migrate_legacy(&mut self) -> bool {
        let Some(legacy) = self.legacy_download_dir.take() else {
            return false;
        };
        if self.base_download_dir == default_download_dir() {
            info!(path = %legacy.display(), "Renamed download_dir to base_download_dir");
            self.base_download_dir = legacy;
        }
        true
    }

    fn with_source(mut self, path: &Path) -> Self {
        self.source = Some(path.to_path_buf());
        self
    }

    /// File this configuration was loaded from and is saved to.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub async fn save(&self) -> Result<()> {
        let Some(path) = self.source.as_deref() else {
            return Err(Error::config("configuration has no file to save to"));
        };
        let text = toml::to_string_pretty(self)
            .map_err(|e| Error::config(format!("failed to serialize config: {e}")))?;
        ensure_parent_dir(path).await?;
        tokio::fs::write(path, text)
            .await
            .map_err(|e| io_error("writing", path, e))
    }

    /// Session token, ignoring blank values.
    pub fn session(&self) -> Option<&str> {
        self.sessdata
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Default quality table with the configured overrides applied.
    pub fn quality_catalog(&self) -> QualityCatalog {
        fn parse_code(key: &str) -> Option<u32> {
            match key.trim().parse() {
                Ok(code) => Some(code),
                Err(_) => {
                    warn!(key, "Ignoring quality override with a non-numeric code");
                    None
                }
            }
        }

        QualityCatalog::with_overrides(
            self.quality_priority
                .iter()
                .filter_map(|(k, v)| parse_code(k).map(|code| (code, *v))),
            self.quality_labels
                .iter()
                .filter_map(|(k, v)| parse_code(k).map(|code| (code, v.clone()))),
        )
    }

    /// Transfer settings for media downloads.
    pub fn downloader_config(&self) -> DownloaderConfig {
        let mut config = DownloaderConfig {
            connect_timeout: self.network.timeout(),
            ..DownloaderConfig::default()
        };
        if let Some(user_agent) = &self.network.user_agent {
            config.user_agent = user_agent.clone();
        }
        config.with_site(
            format!("{}/", Bilibili::BASE_URL),
            Bilibili::BASE_URL.to_string(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert!(!config.overwrite_strategy.overwrite_existing);
        assert!(config.overwrite_strategy.higher_quality_replace);
        assert_eq!(config.network.timeout_secs, 10);
        assert!(!config.concurrent_dash);
        assert_eq!(config.session(), None);
    }

    #[test]
    fn test_parse_reports_missing_keys() {
        let (config, missing) = AppConfig::parse(
            r#"
            sessdata = "abc"
            [overwrite_strategy]
            overwrite_existing = true
            "#,
        )
        .unwrap();
        assert_eq!(config.session(), Some("abc"));
        assert!(config.overwrite_strategy.overwrite_existing);
        assert!(config.overwrite_strategy.higher_quality_replace);
        assert_eq!(
            missing,
            [
                "base_download_dir",
                "network",
                "overwrite_strategy.higher_quality_replace"
            ]
        );
    }

    #[test]
    fn test_blank_session_is_none() {
        let (config, _) = AppConfig::parse("sessdata = '  '").unwrap();
        assert_eq!(config.session(), None);
    }

    #[test]
    fn test_quality_overrides() {
        let (config, _) = AppConfig::parse(
            r#"
            [quality_priority]
            64 = 10
            bogus = 3
            [quality_labels]
            64 = "720P 自定义"
            "#,
        )
        .unwrap();
        let catalog = config.quality_catalog();
        assert_eq!(catalog.priority_of(64), 10);
        assert_eq!(catalog.label_of(64), "720P 自定义");
        assert_eq!(catalog.priority_of(80), 4);
    }

    #[test]
    fn test_downloader_config() {
        let (config, _) = AppConfig::parse(
            r#"
            [network]
            timeout_secs = 3
            user_agent = "test-agent"
            "#,
        )
        .unwrap();
        let downloader = config.downloader_config();
        assert_eq!(downloader.connect_timeout, Duration::from_secs(3));
        assert_eq!(downloader.user_agent, "test-agent");
        assert_eq!(downloader.referer.as_deref(), Some("https://www.bilibili.com/"));
    }

    #[tokio::test]
    async fn test_load_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = AppConfig::load(&path).await.unwrap();
        assert_eq!(config.source(), Some(path.as_path()));
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("base_download_dir"));
        assert!(written.contains("higher_quality_replace = true"));

        let (_, missing) = AppConfig::parse(&written).unwrap();
        assert!(missing.is_empty(), "missing: {missing:?}");
    }

    #[tokio::test]
    async fn test_load_migrates_legacy_download_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "download_dir = '/data/bili'\n").unwrap();

        let config = AppConfig::load(&path).await.unwrap();
        assert_eq!(config.base_download_dir, PathBuf::from("/data/bili"));

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("base_download_dir = \"/data/bili\""));
        assert!(!written.contains("\ndownload_dir"));
    }

    #[tokio::test]
    async fn test_load_invalid_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is = = not toml").unwrap();

        let config = AppConfig::load(&path).await.unwrap();
        assert_eq!(config.network.timeout_secs, 10);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "this is = = not toml"
        );
    }
}
