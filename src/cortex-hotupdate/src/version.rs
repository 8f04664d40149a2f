//! Version comparison for asset bundle manifests.
//!
//! Bundle versions are dot-separated numeric strings ("1.2.3"). The engine
//! receives [`compare_versions`] as its comparator, so the result keeps the
//! engine's convention: negative when `a` is older, zero when equal, positive
//! when newer, and the magnitude is the difference of the first unequal
//! segment.

use std::cmp::Ordering;

/// Comparator signature handed to the asset update engine.
pub type VersionCompareFn = fn(&str, &str) -> i64;

/// Result of comparing two versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionComparison {
    /// First version is older than the second
    Older,
    /// Versions are equal
    Equal,
    /// First version is newer than the second
    Newer,
}

impl From<i64> for VersionComparison {
    fn from(diff: i64) -> Self {
        match diff.cmp(&0) {
            Ordering::Less => Self::Older,
            Ordering::Equal => Self::Equal,
            Ordering::Greater => Self::Newer,
        }
    }
}

/// Compare two bundle versions.
///
/// Only the segments of `a` are walked; a segment missing from `b` counts as
/// zero. When every walked segment matches and `b` is longer, `a` is older.
pub fn compare_versions(a: &str, b: &str) -> i64 {
    let va: Vec<&str> = a.split('.').collect();
    let vb: Vec<&str> = b.split('.').collect();

    for (i, seg) in va.iter().enumerate() {
        let x = parse_segment(seg);
        let y = vb.get(i).map(|s| parse_segment(s)).unwrap_or(0);
        if x != y {
            return x - y;
        }
    }

    if vb.len() > va.len() { -1 } else { 0 }
}

/// Classify the relation between two versions.
pub fn classify(a: &str, b: &str) -> VersionComparison {
    compare_versions(a, b).into()
}

/// Check if `remote` should replace `local`.
pub fn is_newer(local: &str, remote: &str) -> bool {
    classify(local, remote) == VersionComparison::Older
}

/// Parse one segment, reading leading digits the way a permissive integer
/// parser does. Anything without a leading digit is zero.
fn parse_segment(segment: &str) -> i64 {
    let trimmed = segment.trim_start();
    let digits: String = trimmed.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}
