//! Workout report (調教) parser for keibabook.

use scraper::{ElementRef, Html, Selector};

use super::{
    child_elements, has_class, horse_name, row_key, select_any, select_first, text_of, Extractor,
};
use crate::normalize::clean;
use crate::scraper::PageKind;
use crate::types::{HorseMap, WorkoutRecord};

/// Evaluation shown when the page has no short evaluation
pub const NO_EVALUATION: &str = "なし";
/// Detail shown when the detail cell yields nothing
pub const NO_DETAIL: &str = "詳細なし";

const COMMENTARY_LABEL: &str = "[攻め解説]";

/// Parser for workout pages: one `table.cyokyo` per horse.
pub struct CyokyoExtractor;

impl Extractor for CyokyoExtractor {
    type Record = WorkoutRecord;

    const PAGE: PageKind = PageKind::Cyokyo;

    fn extract(html: &str) -> HorseMap<WorkoutRecord> {
        let document = Html::parse_document(html);
        let mut data = HorseMap::new();

        let table_selector = Selector::parse("table.cyokyo").unwrap();

        for table in document.select(&table_selector) {
            let Some(umaban) = select_first(table, "td.umaban") else {
                continue;
            };
            let name = select_any(table, &["td.kyoumei a", "td.kyoumei"])
                .map(|e| text_of(e, ""))
                .unwrap_or_else(|| horse_name(table));
            let Some(key) = row_key(&text_of(umaban, ""), &name) else {
                continue;
            };

            let evaluation = select_first(table, "td.tanpyo")
                .map(|e| text_of(e, ""))
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| NO_EVALUATION.to_string());

            let detail = select_first(table, r#"td[colspan="5"]"#)
                .map(Self::parse_detail)
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| NO_DETAIL.to_string());

            data.insert(
                key,
                WorkoutRecord {
                    name,
                    evaluation,
                    detail,
                },
            );
        }

        data
    }
}

impl CyokyoExtractor {
    /// Walk the detail cell's children in order and join the fragments.
    fn parse_detail(cell: ElementRef) -> String {
        let mut parts: Vec<String> = Vec::new();
        let mut has_commentary = false;

        let label_selector = Selector::parse("dt, dd").unwrap();
        let td_selector = Selector::parse("td").unwrap();

        for child in child_elements(cell) {
            match child.value().name() {
                "dl" if has_class(child, "dl-table") => {
                    let labels: Vec<String> = child
                        .select(&label_selector)
                        .map(|e| text_of(e, ""))
                        .filter(|t| !t.is_empty())
                        .collect();
                    parts.push(labels.join(" "));
                }
                "table" if has_class(child, "cyokyodata") => {
                    if let Some(time_row) = select_first(child, "tr.time") {
                        let times: Vec<String> = time_row
                            .select(&td_selector)
                            .map(|e| text_of(e, ""))
                            .collect();
                        parts.push(times.join(" "));
                    }
                    if let Some(awase) = select_first(child, "tr.awase") {
                        parts.push(text_of(awase, ""));
                    }
                }
                "div" if has_class(child, "semekaisetu") => {
                    if let Some(text) = Self::commentary(child) {
                        parts.push(text);
                        has_commentary = true;
                    }
                }
                _ => {}
            }
        }

        // Commentary block nested deeper than the cell's direct children
        if !has_commentary {
            if let Some(text) = select_first(cell, "div.semekaisetu").and_then(Self::commentary) {
                parts.push(text);
            }
        }

        clean(&parts.join(" "))
    }

    fn commentary(block: ElementRef) -> Option<String> {
        let p = select_first(block, "p")?;
        let text = text_of(p, "");
        (!text.is_empty()).then(|| format!("{} {}", COMMENTARY_LABEL, text))
    }
}
