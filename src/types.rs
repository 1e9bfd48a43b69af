//! Records produced by the page extractors.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::normalize::IndexToken;

/// Extraction output: program number (or horse name) to record
pub type HorseMap<T> = HashMap<String, T>;

/// Records that know which horse they belong to, for name-based joins.
pub trait Named {
    fn horse_name(&self) -> Option<&str>;
}

impl Named for String {
    fn horse_name(&self) -> Option<&str> {
        None
    }
}

fn non_empty(s: &str) -> Option<&str> {
    (!s.is_empty()).then_some(s)
}

/// Race header
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RaceInfo {
    /// e.g. "1回中山3日 2026年1月10日(土)"
    pub meeting: String,
    pub race_name: String,
    /// e.g. "天候:晴 芝:良"
    pub track_condition: String,
    /// e.g. "芝・外 1600m"
    pub course: String,
    /// Every header line, in page order
    pub lines: Vec<String>,
}

impl RaceInfo {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn header_text(&self) -> String {
        self.lines.join("\n")
    }

    /// Debut races (新馬 / メイクデビュー) use a different factor set
    pub fn is_debut(&self) -> bool {
        self.lines
            .iter()
            .any(|l| l.contains("新馬") || l.contains("メイクデビュー"))
    }
}

/// Trainer comment (厩舎の話)
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CommentRecord {
    pub name: String,
    pub comment: String,
}

impl Named for CommentRecord {
    fn horse_name(&self) -> Option<&str> {
        non_empty(&self.name)
    }
}

/// Workout report (調教)
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct WorkoutRecord {
    pub name: String,
    /// Short evaluation tag (短評)
    pub evaluation: String,
    pub detail: String,
}

impl Named for WorkoutRecord {
    fn horse_name(&self) -> Option<&str> {
        non_empty(&self.name)
    }
}

/// Race card entry (出馬表)
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CardEntry {
    pub name: String,
    pub gate: Option<u8>,
    pub jockey: String,
    /// Jockey change marker (乗り替わり) present
    pub substituted: bool,
    pub previous_jockey: Option<String>,
}

impl CardEntry {
    /// "current ← previous" for a substituted jockey, "current(替)" when the
    /// previous jockey is unknown
    pub fn jockey_display(&self) -> String {
        match (self.substituted, &self.previous_jockey) {
            (true, Some(prev)) => format!("{} ← {}", self.jockey, prev),
            (true, None) => format!("{}(替)", self.jockey),
            _ => self.jockey.clone(),
        }
    }
}

impl Named for CardEntry {
    fn horse_name(&self) -> Option<&str> {
        non_empty(&self.name)
    }
}

/// A factor mark from the CPU page, e.g. ("コ", "◎")
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Factor {
    pub label: String,
    pub mark: String,
}

/// CPU page speed indices and factors
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CpuRecord {
    pub name: String,
    pub last: IndexToken,
    pub two_back: IndexToken,
    pub three_back: IndexToken,
    pub average: IndexToken,
    pub factors: Vec<Factor>,
}

impl Named for CpuRecord {
    fn horse_name(&self) -> Option<&str> {
        non_empty(&self.name)
    }
}

/// Labeled index cells of the past-performance page
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct IndexCells {
    pub last: IndexToken,
    pub back2: IndexToken,
    pub back3: IndexToken,
    pub course_best: IndexToken,
    pub avg5: IndexToken,
}

impl IndexCells {
    pub fn is_empty(&self) -> bool {
        [&self.last, &self.back2, &self.back3, &self.course_best, &self.avg5]
            .iter()
            .all(|t| t.is_absent())
    }
}

/// One past race
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PastRace {
    /// e.g. "2025.12.28 中山"
    pub date_venue: String,
    pub race_name: String,
    /// Course, distance, time and track condition
    pub course: String,
    /// Field size, post, popularity, jockey and weight
    pub entry: String,
    /// Passing order, e.g. "3-3-2-1"
    pub passing: String,
    pub rank: String,
    /// Winner (or runner-up when this horse won) and odds
    pub winner: String,
}

impl PastRace {
    /// One-line summary used in the prompt
    pub fn summary(&self) -> String {
        let rank = if self.rank.is_empty() { "?" } else { &self.rank };
        let result = if self.passing.is_empty() {
            format!("{}着", rank)
        } else {
            format!("{}→{}着", self.passing, rank)
        };

        let body = [
            self.date_venue.as_str(),
            self.race_name.as_str(),
            self.entry.as_str(),
            self.course.as_str(),
        ]
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ");

        if self.winner.is_empty() {
            format!("[{} ({})]", body, result)
        } else {
            format!("[{} ({}) 勝ち馬:{}]", body, result, self.winner)
        }
    }
}

/// Row of the past-performance page
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PastPerformance {
    pub name: String,
    pub gate: Option<u8>,
    pub jockey: String,
    pub indices: IndexCells,
    /// At most 3, most recent first
    pub races: Vec<PastRace>,
    /// Present only when the horse returns from a layoff
    pub rest: Option<String>,
}

impl Named for PastPerformance {
    fn horse_name(&self) -> Option<&str> {
        non_empty(&self.name)
    }
}
