//! Text and index normalization for scraped fragments.
//!
//! Everything here is total: no input makes these functions fail, and a value
//! that cannot be read is reported as absent instead of being guessed.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Display token for an absent index value
pub const ABSENT_MARKER: &str = "無";

/// Encoded "index not yet computed" placeholder used by the CPU page
const ENCODED_ABSENT: &str = "1000";

/// Cells that mean "no information"
const MISSING_MARKERS: [&str; 6] = ["－", "-", "—", "―", "‐", ""];

/// Dash variants that make an index cell unreadable
const DASHES: [char; 6] = ['－', '-', '—', '―', '‐', 'ー'];

/// Markers for an index that is not available yet
const NOT_YET_MARKERS: [&str; 2] = ["未", ABSENT_MARKER];

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static DIGITS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]+").unwrap());

/// Replace full-width spaces, collapse whitespace runs and trim.
pub fn clean(s: &str) -> String {
    if s.is_empty() {
        return String::new();
    }
    let s = s.replace(['\u{3000}', '\u{a0}'], " ");
    WHITESPACE_RE.replace_all(&s, " ").trim().to_string()
}

/// True when the cleaned text is one of the "no information" sentinels.
pub fn is_missing_marker(s: &str) -> bool {
    let t = clean(s);
    MISSING_MARKERS.contains(&t.as_str())
}

/// Keep only ASCII digits (full-width digits are folded first).
pub fn digits_only(s: &str) -> String {
    fold_digits(s).chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Map full-width digits (０-９) to ASCII.
fn fold_digits(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '０'..='９' => char::from_u32(c as u32 - '０' as u32 + '0' as u32).unwrap_or(c),
            _ => c,
        })
        .collect()
}

/// Normalized index cell: up to three digits, or explicitly absent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum IndexToken {
    Digits(String),
    #[default]
    Absent,
}

impl IndexToken {
    pub fn is_absent(&self) -> bool {
        matches!(self, IndexToken::Absent)
    }

    /// Numeric value, `None` when absent
    pub fn value(&self) -> Option<u32> {
        match self {
            IndexToken::Digits(d) => d.parse().ok(),
            IndexToken::Absent => None,
        }
    }

    /// Build a token from a computed value (e.g. a rounded average)
    pub fn from_value(v: u32) -> Self {
        normalize_index(&v.to_string())
    }
}

impl fmt::Display for IndexToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexToken::Digits(d) => f.write_str(d),
            IndexToken::Absent => f.write_str(ABSENT_MARKER),
        }
    }
}

/// Normalize a noisy index cell.
///
/// `1000` is the site's placeholder for "not computed yet". When it shares the
/// cell with a real value the last short digit run wins, otherwise the cell is
/// absent. Applying this to its own output returns the same token.
pub fn normalize_index(raw: &str) -> IndexToken {
    let text = fold_digits(raw.replace('\u{a0}', " ").trim());

    if NOT_YET_MARKERS.iter().any(|m| text.contains(m)) || text.contains(DASHES) {
        return IndexToken::Absent;
    }

    let runs: Vec<&str> = DIGITS_RE.find_iter(&text).map(|m| m.as_str()).collect();
    let last_short = |runs: &[&str]| {
        runs.iter()
            .rev()
            .find(|r| r.len() <= 3)
            .map(|r| IndexToken::Digits(r.to_string()))
    };

    if runs.contains(&ENCODED_ABSENT) {
        let others: Vec<&str> = runs.iter().copied().filter(|r| *r != ENCODED_ABSENT).collect();
        return last_short(&others).unwrap_or(IndexToken::Absent);
    }

    last_short(&runs).unwrap_or(IndexToken::Absent)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digits(s: &str) -> IndexToken {
        IndexToken::Digits(s.to_string())
    }

    #[test]
    fn test_clean() {
        assert_eq!(clean("  ドウ\u{3000}デュース \n 好調  "), "ドウ デュース 好調");
        assert_eq!(clean(""), "");
        assert_eq!(clean("\u{3000}\u{3000}"), "");
    }

    #[test]
    fn test_missing_markers() {
        for s in ["－", "-", " — ", "―", "‐", "", "\u{3000}"] {
            assert!(is_missing_marker(s), "{s:?} should be missing");
        }
        assert!(!is_missing_marker("0"));
        assert!(!is_missing_marker("上積み"));
    }

    #[test]
    fn test_encoded_absent_with_real_value() {
        assert_eq!(normalize_index("1000 85"), digits("85"));
        assert_eq!(normalize_index("92\n1000"), digits("92"));
        assert_eq!(normalize_index("1000/78/81"), digits("81"));
    }

    #[test]
    fn test_encoded_absent_alone() {
        assert_eq!(normalize_index("1000"), IndexToken::Absent);
        assert_eq!(normalize_index(" 1000 "), IndexToken::Absent);
    }

    #[test]
    fn test_absent_inputs() {
        for s in ["", "  ", "-", "－", "—", "未", "未算出", "無", "85-"] {
            assert_eq!(normalize_index(s), IndexToken::Absent, "{s:?}");
        }
    }

    #[test]
    fn test_prefers_last_short_run() {
        assert_eq!(normalize_index("前走 72 (12345) 88"), digits("88"));
        assert_eq!(normalize_index("12345"), IndexToken::Absent);
        assert_eq!(normalize_index("\u{a0}０７６\u{a0}"), digits("076"));
    }

    #[test]
    fn test_zero_is_a_value() {
        assert_eq!(normalize_index("0"), digits("0"));
        assert_eq!(normalize_index("0").value(), Some(0));
    }

    #[test]
    fn test_idempotent() {
        for s in ["1000 85", "1000", "", "－", "72", "abc", "１２", "9999 5"] {
            let once = normalize_index(s);
            let twice = normalize_index(&once.to_string());
            assert_eq!(once, twice, "{s:?}");
        }
    }

    #[test]
    fn test_digits_only() {
        assert_eq!(digits_only(" 1 "), "1");
        assert_eq!(digits_only("枠１２"), "12");
        assert_eq!(digits_only("－"), "");
    }
}
