//! Race card (出馬表) parser for keibabook: program number, gate, jockey.

use scraper::{Html, Selector};

use super::{
    body_rows, horse_name, is_spacer, row_key, select_first, text_excluding, text_of,
    Extractor,
};
use crate::normalize::digits_only;
use crate::scraper::PageKind;
use crate::types::{CardEntry, HorseMap};

/// Inline marker for a jockey change
const SUBSTITUTION_CLASS: &str = "norikawari";
/// Previous jockey shown next to the marker
const PREVIOUS_JOCKEY_CLASS: &str = "maekisyu";

/// Parser for the syutuba table.
pub struct SyutubaExtractor;

impl Extractor for SyutubaExtractor {
    type Record = CardEntry;

    const PAGE: PageKind = PageKind::Syutuba;

    fn extract(html: &str) -> HorseMap<CardEntry> {
        let document = Html::parse_document(html);
        let mut entries = HorseMap::new();

        let Some(table) = select_first(document.root_element(), "table.syutuba") else {
            return entries;
        };

        let td_selector = Selector::parse("td").unwrap();

        for tr in body_rows(table) {
            if is_spacer(tr) || tr.select(&td_selector).count() < 3 {
                continue;
            }
            let Some(umaban) = select_first(tr, "td.umaban") else {
                continue;
            };

            let name = horse_name(tr);
            let Some(key) = row_key(&text_of(umaban, ""), &name) else {
                continue;
            };

            let mut entry = CardEntry {
                name,
                gate: select_first(tr, "td.waku").and_then(|e| digits_only(&text_of(e, "")).parse().ok()),
                ..Default::default()
            };

            if let Some(cell) = select_first(tr, "td.kisyu") {
                entry.jockey = match select_first(cell, "a") {
                    Some(link) => text_of(link, ""),
                    None => text_excluding(cell, &[SUBSTITUTION_CLASS, PREVIOUS_JOCKEY_CLASS], ""),
                };
                entry.substituted =
                    select_first(cell, &format!(".{}", SUBSTITUTION_CLASS)).is_some();
                entry.previous_jockey = select_first(cell, &format!(".{}", PREVIOUS_JOCKEY_CLASS))
                    .map(|e| text_of(e, ""))
                    .map(|t| {
                        let t = t.trim_matches(|c: char| "()（）".contains(c));
                        let t = t.strip_prefix("前:").or_else(|| t.strip_prefix("前：")).unwrap_or(t);
                        t.trim().to_string()
                    })
                    .filter(|t| !t.is_empty());
            }

            entries.insert(key, entry);
        }

        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_HTML: &str = r#"<!DOCTYPE html>
<html><body>
<table class="syutuba">
  <thead><tr><th>枠</th><th>馬番</th><th>馬名</th><th>騎手</th></tr></thead>
  <tbody>
    <tr>
      <td class="waku">1</td>
      <td class="umaban">1</td>
      <td class="left"><p class="bamei"><a href="/db/uma/0001">ドウデュース</a></p></td>
      <td class="kisyu"><a href="/db/kisyu/01">武豊</a></td>
    </tr>
    <tr class="spacer"><td></td></tr>
    <tr>
      <td class="waku">2</td>
      <td class="umaban">3</td>
      <td class="left"><p class="bamei"><a href="/db/uma/0002">ジャスティンパレス</a></p></td>
      <td class="kisyu"><a href="/db/kisyu/02">戸崎圭太</a><span class="norikawari">替</span><span class="maekisyu">(ルメール)</span></td>
    </tr>
    <tr>
      <td class="waku">3</td>
      <td class="umaban">5</td>
      <td class="left">タスティエーラ</td>
      <td class="kisyu">松山弘平<span class="norikawari">替</span></td>
    </tr>
    <tr><td class="umaban">9</td></tr>
  </tbody>
</table>
</body></html>"#;

    #[test]
    fn test_parse_card() {
        let entries = SyutubaExtractor::extract(SAMPLE_HTML);

        assert_eq!(entries.len(), 3);
        let first = &entries["1"];
        assert_eq!(first.name, "ドウデュース");
        assert_eq!(first.gate, Some(1));
        assert_eq!(first.jockey, "武豊");
        assert!(!first.substituted);
        assert_eq!(first.jockey_display(), "武豊");
    }

    #[test]
    fn test_jockey_substitution() {
        let entries = SyutubaExtractor::extract(SAMPLE_HTML);

        let second = &entries["3"];
        assert!(second.substituted);
        assert_eq!(second.previous_jockey.as_deref(), Some("ルメール"));
        assert_eq!(second.jockey_display(), "戸崎圭太 ← ルメール");

        let third = &entries["5"];
        assert_eq!(third.jockey, "松山弘平");
        assert!(third.substituted);
        assert_eq!(third.previous_jockey, None);
        assert_eq!(third.jockey_display(), "松山弘平(替)");
    }

    #[test]
    fn test_short_row_skipped() {
        let entries = SyutubaExtractor::extract(SAMPLE_HTML);
        assert!(!entries.contains_key("9"));
    }

    #[test]
    fn test_missing_table() {
        assert!(SyutubaExtractor::extract("<html></html>").is_empty());
    }
}
