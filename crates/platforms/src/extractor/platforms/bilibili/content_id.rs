use std::{fmt, str::FromStr, sync::LazyLock};

use regex::Regex;

use crate::extractor::{error::ExtractorError, utils::capture_group_1};

pub static ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(av\d+|BV[0-9A-Za-z]+)").unwrap());

/// A Bilibili video identifier, either a legacy `av` number or a `BV` id.
///
/// Both keep the text exactly as matched, so `av` digits are not normalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContentIdentifier {
    /// Digits following `av`.
    Av(String),
    Bv(String),
}

impl ContentIdentifier {
    /// Find the first `av<digits>` or `BV<alnum>` in `input`, which may be a
    /// bare id or a full video link.
    pub fn extract(input: &str) -> Result<Self, ExtractorError> {
        let input = input.trim();
        let id = capture_group_1(&ID_REGEX, input)
            .ok_or_else(|| ExtractorError::InvalidIdentifier(input.to_string()))?;

        Ok(match id.strip_prefix("av") {
            Some(digits) => Self::Av(digits.to_string()),
            None => Self::Bv(id.to_string()),
        })
    }

    /// Query parameter identifying the video in playurl requests.
    pub fn api_param(&self) -> (&'static str, String) {
        match self {
            Self::Av(aid) => ("avid", aid.clone()),
            Self::Bv(bvid) => ("bvid", bvid.clone()),
        }
    }
}

impl fmt::Display for ContentIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Av(aid) => write!(f, "av{aid}"),
            Self::Bv(bvid) => f.write_str(bvid),
        }
    }
}

impl FromStr for ContentIdentifier {
    type Err = ExtractorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::extract(s)
    }
}
