//! netkeiba past-performance (馬柱) parser: jockey, index cells, recent races.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

use super::{
    child_elements, has_class, row_key, select_any, select_first, text_excluding, text_of,
    Extractor,
};
use crate::normalize::{digits_only, normalize_index, IndexToken};
use crate::scraper::PageKind;
use crate::types::{HorseMap, IndexCells, PastPerformance, PastRace};

/// Past races kept per horse
pub const MAX_PAST_RACES: usize = 3;
/// Rest note when the rest cell has no readable lines
pub const DEFAULT_REST_NOTE: &str = "放牧/休養";

static PASSING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2}(?:-\d{1,2})+)").unwrap());
static SINGLE_PASSING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})\s").unwrap());

/// Parser for the shutuba_past table.
pub struct ShutubaPastExtractor;

impl Extractor for ShutubaPastExtractor {
    type Record = PastPerformance;

    const PAGE: PageKind = PageKind::ShutubaPast;

    fn extract(html: &str) -> HorseMap<PastPerformance> {
        let document = Html::parse_document(html);
        let mut data = HorseMap::new();

        let row_selector = Selector::parse("tr.HorseList").unwrap();
        let waku_selector = Selector::parse("td.Waku").unwrap();
        let past_selector = Selector::parse("td.Past").unwrap();

        for tr in document.select(&row_selector) {
            let waku: Vec<String> = tr
                .select(&waku_selector)
                .map(|td| digits_only(&text_of(td, "")))
                .collect();

            // Program number: dedicated cell, else the second Waku cell, else the first
            let number = select_first(tr, "td.Umaban")
                .map(|td| digits_only(&text_of(td, "")))
                .filter(|n| !n.is_empty())
                .or_else(|| waku.get(1).filter(|n| !n.is_empty()).cloned())
                .or_else(|| waku.first().cloned())
                .unwrap_or_default();

            let name = select_any(tr, &[".Horse02 a", ".HorseName a", ".Horse02", ".HorseName"])
                .map(|e| text_of(e, ""))
                .unwrap_or_default();

            let Some(key) = row_key(&number, &name) else {
                continue;
            };

            let jockey = select_first(tr, "td.Jockey")
                .map(|td| match select_first(td, "a") {
                    Some(link) => text_of(link, ""),
                    None => text_excluding(td, &["Barei"], ""),
                })
                .unwrap_or_default();

            let mut races = Vec::new();
            let mut rest = None;
            for td in tr.select(&past_selector) {
                if has_class(td, "Rest") {
                    rest.get_or_insert_with(|| Self::parse_rest(td));
                    continue;
                }
                if races.len() == MAX_PAST_RACES {
                    continue;
                }
                if let Some(race) = Self::parse_past_race(td) {
                    races.push(race);
                }
            }

            data.insert(
                key,
                PastPerformance {
                    name,
                    gate: waku.first().and_then(|g| g.parse().ok()),
                    jockey,
                    indices: Self::parse_indices(tr),
                    races,
                    rest,
                },
            );
        }

        data
    }
}

impl ShutubaPastExtractor {
    fn parse_indices(tr: ElementRef) -> IndexCells {
        let index = |class: &str| -> IndexToken {
            select_first(tr, &format!("td.Index.{}", class))
                .map(|td| normalize_index(&text_of(td, " ")))
                .unwrap_or_default()
        };

        IndexCells {
            last: index("Last"),
            back2: index("Back2"),
            back3: index("Back3"),
            course_best: index("CourseBest"),
            avg5: index("Avg5"),
        }
    }

    fn parse_rest(td: ElementRef) -> String {
        let lines: Vec<String> = child_elements(td)
            .map(|e| text_of(e, " "))
            .filter(|t| !t.is_empty())
            .collect();
        if lines.is_empty() {
            DEFAULT_REST_NOTE.to_string()
        } else {
            lines.join(" / ")
        }
    }

    /// One race cell; `None` when the date/venue line is unreadable.
    fn parse_past_race(td: ElementRef) -> Option<PastRace> {
        let div_text = |class: &str| {
            select_first(td, &format!("div.{}", class))
                .map(|e| text_of(e, " "))
                .unwrap_or_default()
        };

        let date_venue = select_first(td, "div.Data01")
            .map(|e| text_excluding(e, &["Num", "Rank", "Order"], " "))
            .unwrap_or_default();
        if date_venue.chars().count() < 2 {
            return None;
        }

        let rank = select_any(td, &["span.Num", ".Rank", "span.Order"])
            .map(|e| text_of(e, ""))
            .unwrap_or_default();

        let passing_text = div_text("Data06");
        let passing = PASSING_RE
            .captures(&passing_text)
            .or_else(|| SINGLE_PASSING_RE.captures(&passing_text))
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();

        Some(PastRace {
            date_venue,
            race_name: div_text("Data02"),
            course: div_text("Data05"),
            entry: div_text("Data03"),
            passing,
            rank,
            winner: div_text("Data07"),
        })
    }
}
