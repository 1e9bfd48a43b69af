//! CPU prediction page parser for keibabook: speed indices and factor marks.

use scraper::{ElementRef, Html, Selector};

use super::{body_rows, horse_name, row_key, select_first, text_of, Extractor};
use crate::normalize::{normalize_index, IndexToken};
use crate::scraper::PageKind;
use crate::types::{CpuRecord, Factor, HorseMap};

/// Factor columns for regular races: (header label, display label)
const REGULAR_FACTORS: [(&str, &str); 3] = [("コース", "コ"), ("距離", "距"), ("前走", "前")];
/// Factor columns for debut races
const DEBUT_FACTORS: [(&str, &str); 3] = [("出脚", "出脚"), ("血統", "血統"), ("動き", "動き")];
/// Column positions of the regular factors when the header is unreadable
const REGULAR_FALLBACK_COLUMNS: [usize; 3] = [5, 6, 7];

const MIN_SPEED_CELLS: usize = 8;
const MIN_FACTOR_CELLS: usize = 6;

/// Parser for the CPU page.
pub struct CpuExtractor;

impl Extractor for CpuExtractor {
    type Record = CpuRecord;

    const PAGE: PageKind = PageKind::Cpu;

    fn extract(html: &str) -> HorseMap<CpuRecord> {
        let document = Html::parse_document(html);
        let mut data = HorseMap::new();

        Self::parse_speed_table(&document, &mut data);
        Self::parse_factor_table(&document, &mut data);

        data
    }
}

impl CpuExtractor {
    fn parse_speed_table(document: &Html, data: &mut HorseMap<CpuRecord>) {
        let Some(table) = select_first(document.root_element(), "table#cpu_speed_sort_table")
        else {
            return;
        };
        let td_selector = Selector::parse("td").unwrap();

        for tr in body_rows(table) {
            let Some(umaban) = select_first(tr, "td.umaban") else {
                continue;
            };
            let cells: Vec<_> = tr.select(&td_selector).collect();
            if cells.len() < MIN_SPEED_CELLS {
                continue;
            }
            let name = horse_name(tr);
            let Some(key) = row_key(&text_of(umaban, ""), &name) else {
                continue;
            };

            // Oldest to newest in the last three columns
            let n = cells.len();
            let three_back = normalize_index(&Self::cell_value(cells[n - 3]));
            let two_back = normalize_index(&Self::cell_value(cells[n - 2]));
            let last = normalize_index(&Self::cell_value(cells[n - 1]));

            let values: Vec<u32> = [&last, &two_back, &three_back]
                .iter()
                .filter_map(|t| t.value())
                .collect();
            let average = if values.is_empty() {
                IndexToken::Absent
            } else {
                let mean = values.iter().sum::<u32>() as f64 / values.len() as f64;
                IndexToken::from_value(mean.round() as u32)
            };

            let record = data.entry(key).or_default();
            record.name = name;
            record.last = last;
            record.two_back = two_back;
            record.three_back = three_back;
            record.average = average;
        }
    }

    fn parse_factor_table(document: &Html, data: &mut HorseMap<CpuRecord>) {
        let table_selector = Selector::parse("table").unwrap();
        let th_selector = Selector::parse("th").unwrap();
        let td_selector = Selector::parse("td").unwrap();

        let Some(table) = document.select(&table_selector).find(|t| {
            select_first(*t, "caption")
                .map(|c| text_of(c, "").contains("ファクター"))
                .unwrap_or(false)
        }) else {
            return;
        };

        let labels: Vec<String> = select_first(table, "thead tr")
            .or_else(|| select_first(table, "tr"))
            .map(|row| row.select(&th_selector).map(|th| text_of(th, "")).collect())
            .unwrap_or_default();

        let columns = Self::factor_columns(&labels);

        for tr in body_rows(table) {
            let Some(umaban) = select_first(tr, "td.umaban") else {
                continue;
            };
            let cells: Vec<_> = tr.select(&td_selector).collect();
            if cells.len() < MIN_FACTOR_CELLS {
                continue;
            }
            let name = horse_name(tr);
            let Some(key) = row_key(&text_of(umaban, ""), &name) else {
                continue;
            };

            let factors = columns
                .iter()
                .map(|(label, idx)| {
                    let mark = cells
                        .get(*idx)
                        .map(|c| Self::cell_value(*c))
                        .filter(|m| !m.is_empty())
                        .unwrap_or_else(|| "-".to_string());
                    Factor {
                        label: label.to_string(),
                        mark,
                    }
                })
                .collect();

            let record = data.entry(key).or_default();
            if record.name.is_empty() {
                record.name = name;
            }
            record.factors = factors;
        }
    }

    /// Map factor display labels to column positions using the header.
    fn factor_columns(labels: &[String]) -> Vec<(&'static str, usize)> {
        let find = |wanted: &str| labels.iter().position(|l| l.contains(wanted));

        let is_debut = DEBUT_FACTORS.iter().any(|(full, _)| find(full).is_some());
        let set = if is_debut { DEBUT_FACTORS } else { REGULAR_FACTORS };

        let mapped: Vec<_> = set
            .iter()
            .filter_map(|(full, short)| find(full).map(|idx| (*short, idx)))
            .collect();

        if mapped.is_empty() && !is_debut {
            return REGULAR_FACTORS
                .iter()
                .zip(REGULAR_FALLBACK_COLUMNS)
                .map(|((_, short), idx)| (*short, idx))
                .collect();
        }
        mapped
    }

    /// Value in a `<p>` when present, else the cell text
    fn cell_value(cell: ElementRef) -> String {
        select_first(cell, "p")
            .map(|p| text_of(p, ""))
            .unwrap_or_else(|| text_of(cell, ""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_HTML: &str = r#"<!DOCTYPE html>
<html><body><div class="main">
<table id="cpu_speed_sort_table">
  <thead><tr><th>枠</th><th>馬番</th><th>馬名</th><th>性齢</th><th>騎手</th><th>3走前</th><th>2走前</th><th>前走</th></tr></thead>
  <tbody>
    <tr>
      <td>1</td><td class="umaban">1</td><td class="left"><a>ドウデュース</a></td><td>牡5</td><td>武豊</td>
      <td><p>80</p></td><td><p>1000</p></td><td><p>90</p></td>
    </tr>
    <tr>
      <td>2</td><td class="umaban">2</td><td class="left"><a>ジャスティンパレス</a></td><td>牡5</td><td>戸崎</td>
      <td><p>－</p></td><td><p>1000 77</p></td><td><p>未</p></td>
    </tr>
    <tr>
      <td>3</td><td class="umaban">3</td><td class="left"><a>新馬</a></td><td>牡2</td><td>松山</td>
      <td><p></p></td><td><p>1000</p></td><td><p></p></td>
    </tr>
    <tr><td class="umaban">4</td><td>短い</td></tr>
  </tbody>
</table>
<table>
  <caption>ファクター</caption>
  <thead><tr><th>枠</th><th>馬番</th><th>馬名</th><th>性齢</th><th>騎手</th><th>コース</th><th>距離</th><th>前走</th></tr></thead>
  <tbody>
    <tr>
      <td>1</td><td class="umaban">1</td><td class="left">ドウデュース</td><td>牡5</td><td>武豊</td>
      <td><p>◎</p></td><td><p>○</p></td><td><p></p></td>
    </tr>
  </tbody>
</table>
</div></body></html>"#;

    fn digits(s: &str) -> IndexToken {
        IndexToken::Digits(s.to_string())
    }

    #[test]
    fn test_parse_speed_indices() {
        let data = CpuExtractor::extract(SAMPLE_HTML);

        let first = &data["1"];
        assert_eq!(first.name, "ドウデュース");
        assert_eq!(first.last, digits("90"));
        assert_eq!(first.two_back, IndexToken::Absent);
        assert_eq!(first.three_back, digits("80"));
        assert_eq!(first.average, digits("85"));

        let second = &data["2"];
        assert_eq!(second.last, IndexToken::Absent);
        assert_eq!(second.two_back, digits("77"));
        assert_eq!(second.three_back, IndexToken::Absent);
        assert_eq!(second.average, digits("77"));
    }

    #[test]
    fn test_all_absent_average() {
        let data = CpuExtractor::extract(SAMPLE_HTML);
        assert_eq!(data["3"].average, IndexToken::Absent);
        assert!(!data.contains_key("4"));
    }

    #[test]
    fn test_parse_factors_by_header() {
        let data = CpuExtractor::extract(SAMPLE_HTML);
        let factors = &data["1"].factors;

        assert_eq!(factors.len(), 3);
        assert_eq!((factors[0].label.as_str(), factors[0].mark.as_str()), ("コ", "◎"));
        assert_eq!((factors[1].label.as_str(), factors[1].mark.as_str()), ("距", "○"));
        assert_eq!((factors[2].label.as_str(), factors[2].mark.as_str()), ("前", "-"));
    }

    #[test]
    fn test_debut_factor_columns() {
        let labels: Vec<String> = ["枠", "馬番", "馬名", "性齢", "騎手", "出脚", "血統", "ローテ", "動き"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            CpuExtractor::factor_columns(&labels),
            vec![("出脚", 5), ("血統", 6), ("動き", 8)]
        );
    }

    #[test]
    fn test_unlabeled_factor_columns_fall_back() {
        assert_eq!(
            CpuExtractor::factor_columns(&[]),
            vec![("コ", 5), ("距", 6), ("前", 7)]
        );
    }

    #[test]
    fn test_missing_tables() {
        assert!(CpuExtractor::extract("<html></html>").is_empty());
    }
}
