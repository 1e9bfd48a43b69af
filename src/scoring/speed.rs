//! Speed index: per-horse ability from recent CPU indices, normalized within the race.

use serde::{Deserialize, Serialize};

use crate::types::{CpuRecord, HorseMap};

/// Speed index weights and emphasis curve.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpeedSettings {
    /// Weight of the best recent index
    #[serde(default = "default_weight_max")]
    pub weight_max: f64,
    /// Weight of the most recent index
    #[serde(default = "default_weight_last")]
    pub weight_last: f64,
    /// Weight of the recent average
    #[serde(default = "default_weight_avg")]
    pub weight_avg: f64,
    /// Deviation where the emphasis curve crosses 50
    #[serde(default = "default_emphasis_center")]
    pub emphasis_center: f64,
    /// Steepness of the emphasis curve (smaller is sharper)
    #[serde(default = "default_emphasis_scale")]
    pub emphasis_scale: f64,
}

fn default_weight_max() -> f64 {
    3.0
}

fn default_weight_last() -> f64 {
    1.0
}

fn default_weight_avg() -> f64 {
    1.0
}

fn default_emphasis_center() -> f64 {
    55.0
}

fn default_emphasis_scale() -> f64 {
    4.0
}

impl Default for SpeedSettings {
    fn default() -> Self {
        Self {
            weight_max: default_weight_max(),
            weight_last: default_weight_last(),
            weight_avg: default_weight_avg(),
            emphasis_center: default_emphasis_center(),
            emphasis_scale: default_emphasis_scale(),
        }
    }
}

/// Derived speed figures for one horse
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedScore {
    /// Weighted ability, 2 decimals
    pub raw: f64,
    /// In-race deviation (mean 50, sd 10), clipped to 0..=100, 1 decimal
    pub dev: f64,
    /// Emphasis score 0..=100, 1 decimal
    pub score: f64,
}

/// Weighted ability of one horse, `None` without any valid index.
///
/// An absent most-recent index counts as 0; the divisor is always the weight sum.
pub fn raw_ability(record: &CpuRecord, settings: &SpeedSettings) -> Option<f64> {
    let values: Vec<f64> = [&record.last, &record.two_back, &record.three_back]
        .iter()
        .filter_map(|t| t.value())
        .map(f64::from)
        .collect();
    if values.is_empty() {
        return None;
    }

    let max = values.iter().cloned().fold(f64::MIN, f64::max);
    let avg = values.iter().sum::<f64>() / values.len() as f64;
    let last = record.last.value().map(f64::from).unwrap_or(0.0);

    let weight = settings.weight_max + settings.weight_last + settings.weight_avg;
    let sum = max * settings.weight_max + last * settings.weight_last + avg * settings.weight_avg;

    (weight > 0.0).then(|| sum / weight)
}

/// Speed scores for every horse with at least one valid index.
pub fn compute_speed_scores(
    records: &HorseMap<CpuRecord>,
    settings: &SpeedSettings,
) -> HorseMap<SpeedScore> {
    let raws: Vec<(&String, f64)> = records
        .iter()
        .filter_map(|(key, record)| raw_ability(record, settings).map(|raw| (key, raw)))
        .collect();

    if raws.is_empty() {
        return HorseMap::new();
    }

    let n = raws.len() as f64;
    let mean = raws.iter().map(|(_, r)| r).sum::<f64>() / n;
    let std = (raws.iter().map(|(_, r)| (r - mean).powi(2)).sum::<f64>() / n).sqrt();

    raws.into_iter()
        .map(|(key, raw)| {
            let dev = if std == 0.0 {
                50.0
            } else {
                50.0 + 10.0 * (raw - mean) / std
            };
            let x = (dev - settings.emphasis_center) / settings.emphasis_scale;
            let score = 100.0 / (1.0 + (-x).exp());

            (
                key.clone(),
                SpeedScore {
                    raw: round_to(raw, 2),
                    dev: round_to(dev, 1).clamp(0.0, 100.0),
                    score: round_to(score, 1).clamp(0.0, 100.0),
                },
            )
        })
        .collect()
}

fn round_to(v: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (v * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::IndexToken;

    fn record(last: Option<u32>, two: Option<u32>, three: Option<u32>) -> CpuRecord {
        let token = |v: Option<u32>| v.map(IndexToken::from_value).unwrap_or_default();
        CpuRecord {
            last: token(last),
            two_back: token(two),
            three_back: token(three),
            ..Default::default()
        }
    }

    #[test]
    fn test_raw_ability() {
        let settings = SpeedSettings::default();

        // (90*3 + 80 + 80) / 5
        let r = raw_ability(&record(Some(80), Some(90), Some(70)), &settings).unwrap();
        assert!((r - 86.0).abs() < 1e-9);

        // Most recent absent counts as 0: (80*3 + 0 + 75) / 5
        let r = raw_ability(&record(None, Some(80), Some(70)), &settings).unwrap();
        assert!((r - 63.0).abs() < 1e-9);

        assert_eq!(raw_ability(&record(None, None, None), &settings), None);
    }

    #[test]
    fn test_single_horse_is_midpoint() {
        let mut records = HorseMap::new();
        records.insert("1".to_string(), record(Some(88), None, None));

        let scores = compute_speed_scores(&records, &SpeedSettings::default());
        let s = scores["1"];
        assert_eq!(s.dev, 50.0);
        assert_eq!(s.raw, 88.0);
        // 100 / (1 + e^(5/4))
        assert_eq!(s.score, 22.3);
    }

    #[test]
    fn test_two_horse_deviation() {
        let mut records = HorseMap::new();
        records.insert("1".to_string(), record(Some(90), None, None));
        records.insert("2".to_string(), record(Some(80), None, None));

        let scores = compute_speed_scores(&records, &SpeedSettings::default());
        assert_eq!(scores["1"].dev, 60.0);
        assert_eq!(scores["2"].dev, 40.0);
        assert_eq!(scores["1"].score, 77.7);
        assert_eq!(scores["2"].score, 2.3);
    }

    #[test]
    fn test_absent_last_and_missing_values() {
        let mut records = HorseMap::new();
        records.insert("1".to_string(), record(Some(75), None, None));
        records.insert("2".to_string(), record(None, Some(75), None));
        records.insert("3".to_string(), record(None, None, None));

        let scores = compute_speed_scores(&records, &SpeedSettings::default());
        assert_eq!(scores.len(), 2);
        // Same index, but horse 2 has no most-recent race: 75 vs 60
        assert_eq!(scores["1"].raw, 75.0);
        assert_eq!(scores["2"].raw, 60.0);
        assert_eq!(scores["1"].dev, 60.0);
        assert_eq!(scores["2"].dev, 40.0);
        assert!(!scores.contains_key("3"));
    }

    #[test]
    fn test_dev_is_clipped() {
        let mut records = HorseMap::new();
        records.insert("1".to_string(), record(Some(999), None, None));
        for i in 2..=40 {
            records.insert(i.to_string(), record(Some(10), None, None));
        }

        let scores = compute_speed_scores(&records, &SpeedSettings::default());
        assert_eq!(scores["1"].dev, 100.0);
        assert_eq!(scores["1"].score, 100.0);
    }
}
