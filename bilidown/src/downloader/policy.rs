//! Skip/replace decision for a video that may already be on disk.

use serde::{Deserialize, Serialize};

/// What to do when an earlier download of the same video exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverwritePolicy {
    /// Replace an existing file regardless of its quality.
    pub overwrite_existing: bool,
    /// Replace an existing file only with a strictly better quality, and
    /// skip otherwise.
    pub higher_quality_replace: bool,
}

impl Default for OverwritePolicy {
    fn default() -> Self {
        Self {
            overwrite_existing: false,
            higher_quality_replace: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Overwriting is disabled altogether.
    AlreadyExists,
    /// The existing file is of the same or a better quality.
    NotBetter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Fetch,
    Replace,
    Skip(SkipReason),
}

/// Decide from the priority of the existing file (if any) and of the quality
/// about to be downloaded.
///
/// `higher_quality_replace` wins over `overwrite_existing`: with both set a
/// file is only replaced by a better one.
pub fn decide(existing_priority: Option<i32>, new_priority: i32, policy: OverwritePolicy) -> Decision {
    let Some(existing_priority) = existing_priority else {
        return Decision::Fetch;
    };

    if policy.higher_quality_replace {
        if new_priority > existing_priority {
            Decision::Replace
        } else {
            Decision::Skip(SkipReason::NotBetter)
        }
    } else if policy.overwrite_existing {
        Decision::Replace
    } else {
        Decision::Skip(SkipReason::AlreadyExists)
    }
}
