//! Bilibili `qn` quality codes and their preference order.
//!
//! Every decision about which quality is better (probing, replacing an
//! existing download) goes through [`QualityCatalog::priority_of`]. Codes
//! with equal priority are equally acceptable.

use std::cmp::Ordering;

use rustc_hash::FxHashMap;

pub type QualityCode = u32;

/// Requested when every probe fails ("1080P 高清").
pub const FALLBACK_QUALITY: QualityCode = 80;

/// Codes that need the `fourk=1` request flag.
pub const FOURK_QUALITIES: [QualityCode; 3] = [120, 126, 127];

const DEFAULT_QUALITIES: [(QualityCode, i32, &str); 10] = [
    (126, 9, "8K 超高清"),
    (125, 8, "HDR 真彩"),
    (120, 7, "4K 超清"),
    (116, 6, "1080P60 高码率"),
    (112, 5, "1080P 高码率"),
    (80, 4, "1080P 高清"),
    (74, 3, "720P 高码率"),
    (64, 2, "720P 准高清"),
    (32, 1, "480P 清晰"),
    (16, 0, "360P 流畅"),
];

pub fn needs_fourk(code: QualityCode) -> bool {
    FOURK_QUALITIES.contains(&code)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityCatalog {
    priorities: FxHashMap<QualityCode, i32>,
    labels: FxHashMap<QualityCode, String>,
}

impl Default for QualityCatalog {
    fn default() -> Self {
        let mut priorities = FxHashMap::default();
        let mut labels = FxHashMap::default();
        for (code, priority, label) in DEFAULT_QUALITIES {
            priorities.insert(code, priority);
            labels.insert(code, label.to_string());
        }
        Self { priorities, labels }
    }
}

impl QualityCatalog {
    /// Default table with user-provided entries merged over it.
    pub fn with_overrides(
        priorities: impl IntoIterator<Item = (QualityCode, i32)>,
        labels: impl IntoIterator<Item = (QualityCode, String)>,
    ) -> Self {
        let mut catalog = Self::default();
        catalog.priorities.extend(priorities);
        catalog.labels.extend(labels);
        catalog
    }

    /// Priority rank of `code`, 0 when unknown.
    pub fn priority_of(&self, code: QualityCode) -> i32 {
        self.priorities.get(&code).copied().unwrap_or(0)
    }

    pub fn label_of(&self, code: QualityCode) -> String {
        self.labels
            .get(&code)
            .cloned()
            .unwrap_or_else(|| format!("unknown({code})"))
    }

    /// First whitespace-separated token of the label, e.g. `1080P`.
    pub fn label_token(&self, code: QualityCode) -> String {
        let label = self.label_of(code);
        label
            .split_whitespace()
            .next()
            .map(ToOwned::to_owned)
            .unwrap_or(label)
    }

    pub fn compare(&self, a: QualityCode, b: QualityCode) -> Ordering {
        self.priority_of(a).cmp(&self.priority_of(b))
    }

    /// Ranked codes, most preferred first.
    pub fn by_priority_desc(&self) -> Vec<QualityCode> {
        let mut codes: Vec<_> = self.priorities.keys().copied().collect();
        codes.sort_by(|a, b| self.compare(*b, *a).then(b.cmp(a)));
        codes
    }

    /// Labelled codes in ascending numeric order.
    pub fn labelled_codes(&self) -> Vec<(QualityCode, &str)> {
        let mut entries: Vec<_> = self
            .labels
            .iter()
            .map(|(code, label)| (*code, label.as_str()))
            .collect();
        entries.sort_by_key(|(code, _)| *code);
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let catalog = QualityCatalog::default();
        assert_eq!(catalog.priority_of(126), 9);
        assert_eq!(catalog.priority_of(80), 4);
        assert_eq!(catalog.priority_of(16), 0);
        assert_eq!(catalog.label_of(64), "720P 准高清");
        assert_eq!(catalog.label_token(116), "1080P60");
    }

    #[test]
    fn test_unknown_code() {
        let catalog = QualityCatalog::default();
        assert_eq!(catalog.priority_of(127), 0);
        assert_eq!(catalog.label_of(127), "unknown(127)");
        assert_eq!(catalog.label_token(127), "unknown(127)");
    }

    #[test]
    fn test_priority_order() {
        let catalog = QualityCatalog::default();
        assert_eq!(
            catalog.by_priority_desc(),
            vec![126, 125, 120, 116, 112, 80, 74, 64, 32, 16]
        );
        assert_eq!(catalog.compare(80, 64), Ordering::Greater);
        assert_eq!(catalog.compare(32, 64), Ordering::Less);
        assert_eq!(catalog.compare(80, 80), Ordering::Equal);
    }

    #[test]
    fn test_overrides_merge_over_defaults() {
        let catalog = QualityCatalog::with_overrides([(64, 10)], [(64, "720P custom".to_string())]);
        assert_eq!(catalog.priority_of(64), 10);
        assert_eq!(catalog.label_of(64), "720P custom");
        assert_eq!(catalog.priority_of(126), 9);
        assert_eq!(catalog.by_priority_desc()[0], 64);
    }

    #[test]
    fn test_fourk_flag() {
        assert!(needs_fourk(120));
        assert!(needs_fourk(127));
        assert!(!needs_fourk(116));
    }
}
