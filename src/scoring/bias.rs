//! Post-position bias from lookup tables loaded from a JSON file.
//!
//! Two components are summed: an early-meeting turf bonus by gate (meeting
//! days 1 and 2 only) and a course bias looked up by
//! `venue + surface + distance [+ variant]`. Anything unknown scores 0.

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use crate::types::RaceInfo;

static COURSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(芝|ダ|障)[^\d]*?(\d{3,4})").unwrap());

/// Track surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Surface {
    Turf,
    Dirt,
    Jump,
}

impl Surface {
    fn label(&self) -> &'static str {
        match self {
            Surface::Turf => "芝",
            Surface::Dirt => "ダ",
            Surface::Jump => "障",
        }
    }
}

/// Course identity used as the bias table key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseKey {
    pub venue: String,
    pub surface: Surface,
    pub distance: u32,
    /// Inner/outer course variant (内 / 外)
    pub variant: Option<char>,
}

impl CourseKey {
    /// Read the course from a line such as `芝・外 1600m`.
    pub fn parse(venue: &str, course: &str) -> Option<Self> {
        let caps = COURSE_RE.captures(course)?;
        let surface = match &caps[1] {
            "芝" => Surface::Turf,
            "ダ" => Surface::Dirt,
            _ => Surface::Jump,
        };
        let distance = caps[2].parse().ok()?;

        // Variant marker sits between the surface and the distance, or in a 外回り note
        let head = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
        let variant = if head.contains('外') || course.contains("外回り") {
            Some('外')
        } else if head.contains('内') || course.contains("内回り") {
            Some('内')
        } else {
            None
        };

        Some(Self {
            venue: venue.to_string(),
            surface,
            distance,
            variant,
        })
    }

    pub fn from_race(venue: &str, info: &RaceInfo) -> Option<Self> {
        Self::parse(venue, &info.course)
    }

    /// Key without the variant
    pub fn base_key(&self) -> String {
        format!("{}{}{}", self.venue, self.surface.label(), self.distance)
    }
}

impl fmt::Display for CourseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base_key())?;
        if let Some(v) = self.variant {
            write!(f, "{}", v)?;
        }
        Ok(())
    }
}

/// One bonus level of a course entry and the gates that receive it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasLevel {
    pub bonus: i32,
    pub gates: Vec<u8>,
}

/// Post-position bias tables.
///
/// Empty by default: bias figures come only from a table file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BiasTable {
    /// Turf bonus by gate on meeting days 1 and 2
    #[serde(default)]
    pub early_turf: BTreeMap<u8, i32>,
    /// Course key to bonus levels
    #[serde(default)]
    pub courses: BTreeMap<String, Vec<BiasLevel>>,
}

impl BiasTable {
    /// True when the table holds no rule at all
    pub fn is_empty(&self) -> bool {
        self.early_turf.is_empty() && self.courses.is_empty()
    }

    /// Load bias table from JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading bias table {}", path.display()))?;
        let table: BiasTable = serde_json::from_str(&content)
            .with_context(|| format!("parsing bias table {}", path.display()))?;
        Ok(table)
    }

    /// Early-meeting turf component
    pub fn early_bonus(&self, course: &CourseKey, meeting_day: u8, gate: u8) -> i32 {
        if course.surface != Surface::Turf || !(1..=2).contains(&meeting_day) {
            return 0;
        }
        self.early_turf.get(&gate).copied().unwrap_or(0)
    }

    /// Course component: the variant key is tried first, then the base key.
    /// Levels are checked from the highest bonus down.
    pub fn course_bonus(&self, course: &CourseKey, gate: u8) -> i32 {
        let entry = self
            .courses
            .get(&course.to_string())
            .or_else(|| self.courses.get(&course.base_key()));
        let Some(levels) = entry else {
            return 0;
        };

        let mut ordered: Vec<&BiasLevel> = levels.iter().collect();
        ordered.sort_by(|a, b| b.bonus.cmp(&a.bonus));
        ordered
            .into_iter()
            .find(|level| level.gates.contains(&gate))
            .map(|level| level.bonus)
            .unwrap_or(0)
    }

    /// Total bias for a gate, clamped to `±cap`.
    pub fn total(&self, course: &CourseKey, meeting_day: u8, gate: u8, cap: i32) -> i32 {
        let cap = cap.abs();
        (self.early_bonus(course, meeting_day, gate) + self.course_bonus(course, gate))
            .clamp(-cap, cap)
    }
}
