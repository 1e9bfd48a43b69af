//! HTML extractors for keibabook and netkeiba pages.
//!
//! Every extractor is total: a missing table gives an empty map, a short row
//! is skipped and a missing optional element reads as an empty string.

pub mod cpu;
pub mod cyokyo;
pub mod danwa;
pub mod header;
pub mod rows;
pub mod shutuba_past;
pub mod syoin;
pub mod syutuba;

pub use cpu::CpuExtractor;
pub use cyokyo::CyokyoExtractor;
pub use danwa::DanwaExtractor;
pub use header::parse_race_info;
pub use rows::{AfterDetail, AlternatingRows};
pub use shutuba_past::ShutubaPastExtractor;
pub use syoin::SyoinExtractor;
pub use syutuba::SyutubaExtractor;

use scraper::{ElementRef, Node, Selector};

use super::PageKind;
use crate::normalize::{clean, digits_only};
use crate::types::HorseMap;

/// One page type's extraction.
pub trait Extractor {
    type Record;

    /// Page this extractor reads
    const PAGE: PageKind;

    fn extract(html: &str) -> HorseMap<Self::Record>;
}

/// First descendant matching a CSS selector
pub(crate) fn select_first<'a>(elem: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    elem.select(&selector).next()
}

/// First match among several selectors, in priority order
pub(crate) fn select_any<'a>(elem: ElementRef<'a>, candidates: &[&str]) -> Option<ElementRef<'a>> {
    candidates.iter().find_map(|css| select_first(elem, css))
}

pub(crate) fn has_class(elem: ElementRef, class: &str) -> bool {
    elem.value().classes().any(|c| c == class)
}

pub(crate) fn child_elements<'a>(elem: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    elem.children().filter_map(ElementRef::wrap)
}

/// Direct `tr` children of the table body
pub(crate) fn body_rows(table: ElementRef) -> Vec<ElementRef> {
    let body = child_elements(table)
        .find(|e| e.value().name() == "tbody")
        .unwrap_or(table);
    child_elements(body)
        .filter(|e| e.value().name() == "tr")
        .collect()
}

pub(crate) fn is_spacer(row: ElementRef) -> bool {
    has_class(row, "spacer")
}

/// Text nodes joined with `sep`, then cleaned
pub(crate) fn text_of(elem: ElementRef, sep: &str) -> String {
    let parts: Vec<&str> = elem
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    clean(&parts.join(sep))
}

/// Like [`text_of`], skipping every element carrying one of `excluded` classes
pub(crate) fn text_excluding(elem: ElementRef, excluded: &[&str], sep: &str) -> String {
    let mut parts = Vec::new();
    collect_text(elem, excluded, &mut parts);
    clean(&parts.join(sep))
}

fn collect_text<'a>(elem: ElementRef<'a>, excluded: &[&str], parts: &mut Vec<&'a str>) {
    for child in elem.children() {
        match child.value() {
            Node::Text(text) => {
                let t = text.trim();
                if !t.is_empty() {
                    parts.push(t);
                }
            }
            Node::Element(_) => {
                if let Some(child_elem) = ElementRef::wrap(child) {
                    if !excluded.iter().any(|c| has_class(child_elem, c)) {
                        collect_text(child_elem, excluded, parts);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Join key for a row: program number digits, else the horse name
pub(crate) fn row_key(number_text: &str, name: &str) -> Option<String> {
    let digits = digits_only(number_text);
    if !digits.is_empty() {
        return Some(digits);
    }
    let name = clean(name);
    (!name.is_empty()).then_some(name)
}

/// Horse name from the usual name cells
pub(crate) fn horse_name(row: ElementRef) -> String {
    select_any(row, &["p.bamei a", "td.left a", "td.bamei a", ".bamei", "td.left"])
        .map(|e| text_of(e, ""))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn test_text_excluding() {
        let html = Html::parse_fragment(
            r#"<div id="x">前走は <span class="meta">1着 中山</span>よく<b>頑張った</b></div>"#,
        );
        let root = select_first(html.root_element(), "#x").unwrap();
        assert_eq!(text_excluding(root, &["meta"], " "), "前走は よく 頑張った");
        assert_eq!(text_of(root, " "), "前走は 1着 中山 よく 頑張った");
    }

    #[test]
    fn test_row_key() {
        assert_eq!(row_key(" 1 ", "ドウデュース"), Some("1".to_string()));
        assert_eq!(row_key("", " ドウデュース "), Some("ドウデュース".to_string()));
        assert_eq!(row_key("－", ""), None);
    }

    #[test]
    fn test_body_rows_only_direct_children() {
        let html = Html::parse_document(
            r#"<table id="t"><tbody>
                <tr><td><table><tr><td>inner</td></tr></table></td></tr>
                <tr class="spacer"><td></td></tr>
            </tbody></table>"#,
        );
        let table = select_first(html.root_element(), "#t").unwrap();
        let rows = body_rows(table);
        assert_eq!(rows.len(), 2);
        assert!(is_spacer(rows[1]));
    }
}
