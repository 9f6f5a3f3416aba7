//! Detection of a previous download of the same video.
//!
//! Output files are named `<title>_<quality token>_<id>.mp4`, so an earlier
//! download is found by matching the title and id and then looking for a
//! quality label token inside the name. Labels are checked in ascending code
//! order and the first token contained in the name wins; labels that share a
//! token (`720P 高码率` / `720P 准高清`) or whose token is a substring of another
//! (`1080P` in `1080P60`) resolve to the lowest matching code.

use std::path::{Path, PathBuf};

use platforms_parser::{ContentIdentifier, QualityCatalog, QualityCode};
use regex::Regex;
use tracing::debug;

use crate::utils::{filename::sanitize_filename, fs::io_error};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingOutputRecord {
    pub quality: QualityCode,
    pub path: PathBuf,
}

/// Pattern matching any output name for `title` and `id`.
pub fn output_pattern(title: &str, id: &ContentIdentifier) -> Result<Regex> {
    let pattern = format!(
        r"^{}.+?{}\.mp4$",
        regex::escape(&sanitize_filename(title)),
        regex::escape(&id.to_string())
    );
    Regex::new(&pattern).map_err(|e| Error::config(format!("invalid output pattern: {e}")))
}

/// Quality code whose label token appears in `file_name`.
pub fn quality_from_file_name(file_name: &str, catalog: &QualityCatalog) -> Option<QualityCode> {
    catalog
        .labelled_codes()
        .into_iter()
        .find(|(code, _)| file_name.contains(&catalog.label_token(*code)))
        .map(|(code, _)| code)
}

/// Look for an earlier download of `id` in `dir`. A missing directory means
/// nothing was downloaded yet.
pub async fn find_existing(
    dir: &Path,
    title: &str,
    id: &ContentIdentifier,
    catalog: &QualityCatalog,
) -> Result<Option<ExistingOutputRecord>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_error("reading directory", dir, e)),
    };

    let pattern = output_pattern(title, id)?;
    let mut names = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| io_error("reading directory", dir, e))?
    {
        if let Some(name) = entry.file_name().to_str()
            && pattern.is_match(name)
        {
            names.push(name.to_string());
        }
    }
    names.sort();

    for name in names {
        if let Some(quality) = quality_from_file_name(&name, catalog) {
            debug!(file = %name, quality, "Found existing download");
            return Ok(Some(ExistingOutputRecord {
                quality,
                path: dir.join(name),
            }));
        }
        debug!(file = %name, "Existing file carries no known quality label");
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bv() -> ContentIdentifier {
        ContentIdentifier::Bv("BV1xx411c7mD".to_string())
    }

    #[tokio::test]
    async fn test_missing_directory_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let found = find_existing(
            &dir.path().join("nope"),
            "标题",
            &bv(),
            &QualityCatalog::default(),
        )
        .await
        .unwrap();
        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn test_finds_quality_of_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("标题_720P_BV1xx411c7mD.mp4");
        std::fs::write(&path, b"x").unwrap();
        std::fs::write(dir.path().join("标题_video_BV1xx411c7mD.m4s"), b"x").unwrap();
        std::fs::write(dir.path().join("其他_1080P_BV1xx411c7mD.mp4"), b"x").unwrap();

        let found = find_existing(dir.path(), "标题", &bv(), &QualityCatalog::default())
            .await
            .unwrap();
        assert_eq!(
            found,
            Some(ExistingOutputRecord {
                quality: 64,
                path
            })
        );
    }

    #[tokio::test]
    async fn test_ignores_other_ids_and_partials() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("标题_1080P_BV1other.mp4"), b"x").unwrap();
        std::fs::write(dir.path().join("标题_1080P_BV1xx411c7mD.mp4.part"), b"x").unwrap();

        let found = find_existing(dir.path(), "标题", &bv(), &QualityCatalog::default())
            .await
            .unwrap();
        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn test_title_is_sanitized_before_matching() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a_b_480P_av170001.mp4"), b"x").unwrap();

        let found = find_existing(
            dir.path(),
            "a?b",
            &ContentIdentifier::Av("170001".to_string()),
            &QualityCatalog::default(),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(found.quality, 32);
    }

    #[test]
    fn test_shared_tokens_resolve_to_lowest_code() {
        let catalog = QualityCatalog::default();
        assert_eq!(quality_from_file_name("t_1080P60_BV1.mp4", &catalog), Some(80));
        assert_eq!(quality_from_file_name("t_720P_BV1.mp4", &catalog), Some(64));
        assert_eq!(quality_from_file_name("t_4K_BV1.mp4", &catalog), Some(120));
        assert_eq!(quality_from_file_name("t_BV1.mp4", &catalog), None);
    }
}
