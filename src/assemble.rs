//! Merge per-page records into one record per horse and render the prompt.
//!
//! Program number is the join key. A source without numbering is joined by
//! exact name key, then by whitespace-insensitive name; never by row position.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use crate::config::ScoringConfig;
use crate::normalize::{IndexToken, ABSENT_MARKER};
use crate::race::RaceConfig;
use crate::scoring::{compute_speed_scores, BiasTable, CourseKey, SpeedScore, SpeedSettings};
use crate::types::{
    CardEntry, CommentRecord, CpuRecord, HorseMap, IndexCells, Named, PastPerformance, PastRace,
    RaceInfo, WorkoutRecord,
};

/// Placeholder for missing text
pub const NO_INFO: &str = "情報なし";
/// Placeholder for a missing name or jockey
pub const UNKNOWN: &str = "不明";

const REGULAR_FACTOR_LABELS: [&str; 3] = ["コ", "距", "前"];
const DEBUT_FACTOR_LABELS: [&str; 3] = ["出脚", "血統", "動き"];

/// How absent index values appear in the data line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingIndexPolicy {
    /// Keep the slot and print `無`
    #[default]
    Marker,
    /// Leave absent values out
    Drop,
}

/// Everything extracted for one race
#[derive(Debug, Clone, Default)]
pub struct RaceSources {
    pub info: RaceInfo,
    pub comments: HorseMap<CommentRecord>,
    pub interviews: HorseMap<String>,
    pub workouts: HorseMap<WorkoutRecord>,
    pub card: HorseMap<CardEntry>,
    pub cpu: HorseMap<CpuRecord>,
    pub past: HorseMap<PastPerformance>,
}

impl RaceSources {
    /// True when no page produced any horse
    pub fn has_no_horses(&self) -> bool {
        self.comments.is_empty()
            && self.interviews.is_empty()
            && self.workouts.is_empty()
            && self.card.is_empty()
            && self.cpu.is_empty()
            && self.past.is_empty()
    }
}

/// Scoring inputs for assembly
#[derive(Debug, Clone)]
pub struct AssemblySettings {
    pub speed: SpeedSettings,
    pub bias: BiasTable,
    pub bias_cap: i32,
    pub missing_index: MissingIndexPolicy,
}

impl Default for AssemblySettings {
    fn default() -> Self {
        Self::from_config(&ScoringConfig::default())
    }
}

impl AssemblySettings {
    /// Build from config. Without a readable bias table file no bias is reported.
    pub fn from_config(scoring: &ScoringConfig) -> Self {
        let bias = match &scoring.bias_table {
            Some(path) => match BiasTable::from_file(path) {
                Ok(table) => {
                    info!("Loaded bias table: {} courses", table.courses.len());
                    table
                }
                Err(e) => {
                    warn!("Failed to load bias table: {:#}, bias disabled", e);
                    BiasTable::default()
                }
            },
            None => {
                debug!("No bias table configured, bias disabled");
                BiasTable::default()
            }
        };

        Self {
            speed: scoring.speed.clone(),
            bias,
            bias_cap: scoring.bias_cap,
            missing_index: scoring.missing_index,
        }
    }
}

/// One horse after the merge
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HorseRecord {
    pub number: String,
    pub name: String,
    pub gate: Option<u8>,
    /// Rendered jockey, `current ← previous` after a change
    pub jockey: String,
    pub comment: Option<String>,
    pub interview: Option<String>,
    pub workout: Option<WorkoutRecord>,
    pub cpu: Option<CpuRecord>,
    pub indices: Option<IndexCells>,
    pub speed: Option<SpeedScore>,
    pub bias: Option<i32>,
    pub races: Vec<PastRace>,
    pub rest: Option<String>,
}

/// Assembly output
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AssembledRace {
    pub horses: Vec<HorseRecord>,
    pub blocks: Vec<String>,
    pub prompt: String,
}

fn loose(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

fn is_number(key: &str) -> bool {
    !key.is_empty() && key.chars().all(|c| c.is_ascii_digit())
}

/// Entry for a horse: by number, then exact name key, then loose name.
fn find_entry<'a, T: Named>(
    map: &'a HorseMap<T>,
    number: &str,
    name: &str,
) -> Option<(&'a String, &'a T)> {
    if let Some(entry) = map.get_key_value(number) {
        return Some(entry);
    }
    if name.is_empty() {
        return None;
    }
    if let Some(entry) = map.get_key_value(name) {
        return Some(entry);
    }

    let wanted = loose(name);
    map.iter().find(|(key, record)| {
        (!is_number(key) && loose(key) == wanted)
            || record.horse_name().map(loose).as_deref() == Some(wanted.as_str())
    })
}

fn lookup<'a, T: Named>(map: &'a HorseMap<T>, number: &str, name: &str) -> Option<&'a T> {
    find_entry(map, number, name).map(|(_, record)| record)
}

/// Numbers ascending, then names
fn sort_keys(keys: &mut [String]) {
    keys.sort_by(|a, b| match (a.parse::<u32>(), b.parse::<u32>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => std::cmp::Ordering::Less,
        (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    });
}

impl RaceSources {
    /// Card keys when the card has rows, else every source's keys. A name key
    /// naming a numbered horse is folded into that horse.
    pub fn horse_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = if !self.card.is_empty() {
            self.card.keys().cloned().collect()
        } else {
            let all: BTreeSet<&String> = self
                .comments
                .keys()
                .chain(self.interviews.keys())
                .chain(self.workouts.keys())
                .chain(self.cpu.keys())
                .chain(self.past.keys())
                .collect();

            let numbered_names: BTreeSet<String> = all
                .iter()
                .filter(|k| is_number(k))
                .map(|k| loose(&self.name_for(k)))
                .filter(|n| !n.is_empty())
                .collect();

            all.into_iter()
                .filter(|k| is_number(k) || !numbered_names.contains(&loose(k)))
                .cloned()
                .collect()
        };
        sort_keys(&mut keys);
        keys
    }

    /// Display name from the first source that has one
    fn name_for(&self, key: &str) -> String {
        let candidates = [
            self.card.get(key).and_then(Named::horse_name),
            self.comments.get(key).and_then(Named::horse_name),
            self.past.get(key).and_then(Named::horse_name),
            self.cpu.get(key).and_then(Named::horse_name),
            self.workouts.get(key).and_then(Named::horse_name),
        ];
        candidates
            .into_iter()
            .flatten()
            .next()
            .map(str::to_string)
            .unwrap_or_else(|| if is_number(key) { String::new() } else { key.to_string() })
    }
}

/// Merge all sources, derive scores and render the prompt.
pub fn assemble(
    config: &RaceConfig,
    sources: &RaceSources,
    settings: &AssemblySettings,
) -> AssembledRace {
    let speed = compute_speed_scores(&sources.cpu, &settings.speed);
    let course = CourseKey::from_race(config.venue_name(), &sources.info);
    let debut = sources.info.is_debut();

    let horses: Vec<HorseRecord> = sources
        .horse_keys()
        .into_iter()
        .map(|key| {
            let name = sources.name_for(&key);
            let card = lookup(&sources.card, &key, &name);
            let past = lookup(&sources.past, &key, &name);
            let cpu_entry = find_entry(&sources.cpu, &key, &name);
            let cpu = cpu_entry.map(|(_, record)| record);

            let gate = card.and_then(|c| c.gate).or_else(|| past.and_then(|p| p.gate));
            let jockey = card
                .filter(|c| !c.jockey.is_empty())
                .map(CardEntry::jockey_display)
                .or_else(|| past.map(|p| p.jockey.clone()).filter(|j| !j.is_empty()))
                .unwrap_or_else(|| UNKNOWN.to_string());

            let bias = gate
                .filter(|_| !settings.bias.is_empty())
                .map(|g| match &course {
                    Some(course) => {
                        settings
                            .bias
                            .total(course, config.day_number(), g, settings.bias_cap)
                    }
                    None => 0,
                });

            let speed_score = cpu_entry.and_then(|(cpu_key, _)| speed.get(cpu_key).copied());
            let comment = lookup(&sources.comments, &key, &name)
                .map(|c| c.comment.clone())
                .filter(|c| !c.is_empty());
            let interview = lookup(&sources.interviews, &key, &name).cloned();
            let workout = lookup(&sources.workouts, &key, &name).cloned();

            HorseRecord {
                number: if is_number(&key) { key.clone() } else { String::new() },
                name,
                gate,
                jockey,
                comment,
                interview,
                workout,
                cpu: cpu.cloned(),
                indices: past.map(|p| p.indices.clone()).filter(|i| !i.is_empty()),
                speed: speed_score,
                bias,
                races: past.map(|p| p.races.clone()).unwrap_or_default(),
                rest: past.and_then(|p| p.rest.clone()),
            }
        })
        .collect();

    let blocks: Vec<String> = horses
        .iter()
        .map(|h| render_block(h, debut, settings.missing_index))
        .collect();

    let header = sources.info.header_text();
    let mut prompt = format!(
        "■レース情報\n{}\n\n■各馬詳細\n",
        if header.is_empty() { NO_INFO } else { header.as_str() }
    );
    for block in &blocks {
        prompt.push_str(block);
        prompt.push('\n');
    }

    AssembledRace {
        horses,
        blocks,
        prompt,
    }
}

/// Text block for one horse; every line ends with a newline.
pub fn render_block(horse: &HorseRecord, debut: bool, policy: MissingIndexPolicy) -> String {
    let number = if horse.number.is_empty() { "?" } else { horse.number.as_str() };
    let name = if horse.name.is_empty() { UNKNOWN } else { horse.name.as_str() };
    let gate = horse.gate.map(|g| format!(" {}枠", g)).unwrap_or_default();

    let mut lines = vec![
        format!("▼馬番{} {}{} (騎手:{})", number, name, gate, horse.jockey),
        format!("【厩舎の話】{}", horse.comment.as_deref().unwrap_or(NO_INFO)),
        format!("【前走インタビュー】{}", horse.interview.as_deref().unwrap_or(NO_INFO)),
    ];

    let races = if horse.races.is_empty() {
        NO_INFO.to_string()
    } else {
        horse
            .races
            .iter()
            .map(PastRace::summary)
            .collect::<Vec<_>>()
            .join(" / ")
    };
    lines.push(format!("【近走】{}", races));

    if let Some(rest) = &horse.rest {
        lines.push(format!("【休養】{}", rest));
    }

    lines.push(format!("【データ】{}", data_line(horse, debut, policy)));

    let workout = horse
        .workout
        .as_ref()
        .map(|w| format!("短評:{} / 詳細:{}", w.evaluation, w.detail))
        .unwrap_or_else(|| NO_INFO.to_string());
    lines.push(format!("【調教】{}", workout));

    let mut block = lines.join("\n");
    block.push('\n');
    block
}

/// `label(a/b/c):x/y/z` with markers, or `label a:x c:z` without absent values
fn index_segment(label: &str, cells: &[(&str, &IndexToken)], policy: MissingIndexPolicy) -> Option<String> {
    match policy {
        MissingIndexPolicy::Marker => {
            let labels: Vec<&str> = cells.iter().map(|(l, _)| *l).collect();
            let values: Vec<String> = cells.iter().map(|(_, v)| v.to_string()).collect();
            Some(format!("{}({}):{}", label, labels.join("/"), values.join("/")))
        }
        MissingIndexPolicy::Drop => {
            let present: Vec<String> = cells
                .iter()
                .filter(|(_, v)| !v.is_absent())
                .map(|(l, v)| format!("{}:{}", l, v))
                .collect();
            (!present.is_empty()).then(|| format!("{} {}", label, present.join(" ")))
        }
    }
}

/// Under `Marker` every segment is present, so all blocks share one shape.
fn data_line(horse: &HorseRecord, debut: bool, policy: MissingIndexPolicy) -> String {
    let mut parts = Vec::new();

    let no_cpu = CpuRecord::default();
    let cpu = horse.cpu.as_ref().unwrap_or(&no_cpu);
    parts.extend(index_segment(
        "指数",
        &[
            ("前", &cpu.last),
            ("2", &cpu.two_back),
            ("3", &cpu.three_back),
            ("平", &cpu.average),
        ],
        policy,
    ));

    match (&horse.speed, policy) {
        (Some(s), _) => parts.push(format!(
            "スピード指数:{:.1} 偏差値:{:.1} 基礎値:{:.2}",
            s.score, s.dev, s.raw
        )),
        (None, MissingIndexPolicy::Marker) => parts.push(format!(
            "スピード指数:{m} 偏差値:{m} 基礎値:{m}",
            m = ABSENT_MARKER
        )),
        (None, MissingIndexPolicy::Drop) => {}
    }

    let no_indices = IndexCells::default();
    let indices = horse.indices.as_ref().unwrap_or(&no_indices);
    parts.extend(index_segment(
        "NK指数",
        &[
            ("前", &indices.last),
            ("2", &indices.back2),
            ("3", &indices.back3),
            ("コース最高", &indices.course_best),
            ("5走平均", &indices.avg5),
        ],
        policy,
    ));

    match (horse.bias, policy) {
        (Some(bias), _) => parts.push(format!("枠バイアス:{:+}", bias)),
        (None, MissingIndexPolicy::Marker) => parts.push(format!("枠バイアス:{}", ABSENT_MARKER)),
        (None, MissingIndexPolicy::Drop) => {}
    }

    let (labels, marks): (Vec<&str>, Vec<&str>) = match Some(&cpu.factors).filter(|f| !f.is_empty()) {
        Some(factors) => factors.iter().map(|f| (f.label.as_str(), f.mark.as_str())).unzip(),
        None => {
            let labels = if debut { DEBUT_FACTOR_LABELS } else { REGULAR_FACTOR_LABELS };
            labels.iter().map(|l| (*l, "-")).unzip()
        }
    };
    parts.push(format!("F({}):{}", labels.join("/"), marks.join("/")));

    parts.join(" ")
}
