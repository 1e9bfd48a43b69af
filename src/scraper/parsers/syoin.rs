//! Prior-race interview (前走インタビュー) parser for keibabook.

use scraper::Html;

use super::{
    body_rows, horse_name, is_spacer, row_key, select_first, text_excluding, text_of,
    AfterDetail, AlternatingRows, Extractor,
};
use crate::normalize::is_missing_marker;
use crate::scraper::PageKind;
use crate::types::HorseMap;

/// Structured previous-race metadata rendered inside the interview cell
const METADATA_CLASS: &str = "syoindata";

/// Parser for the syoin table: identity row, then exactly one interview row.
pub struct SyoinExtractor;

impl Extractor for SyoinExtractor {
    type Record = String;

    const PAGE: PageKind = PageKind::Syoin;

    fn extract(html: &str) -> HorseMap<String> {
        let document = Html::parse_document(html);
        let mut interviews = HorseMap::new();

        let Some(table) = select_first(document.root_element(), "table.syoin") else {
            return interviews;
        };

        let mut rows = AlternatingRows::new(AfterDetail::Reset);

        for tr in body_rows(table) {
            if is_spacer(tr) {
                continue;
            }

            if let Some(umaban) = select_first(tr, "td.umaban") {
                rows.identity(row_key(&text_of(umaban, ""), &horse_name(tr)));
                continue;
            }

            let Some(cell) = select_first(tr, "td.syoin") else {
                continue;
            };
            let Some(key) = rows.detail() else {
                continue;
            };

            let text = text_excluding(cell, &[METADATA_CLASS], " ");
            if is_missing_marker(&text) || text.chars().count() <= 1 {
                continue;
            }
            interviews.insert(key, text);
        }

        interviews
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_HTML: &str = r#"<!DOCTYPE html>
<html><body>
<table class="default syoin">
  <tbody>
    <tr>
      <td class="umaban">1</td>
      <td class="left"><a href="/db/uma/0001">ドウデュース</a></td>
    </tr>
    <tr>
      <td class="syoin">
        <div class="syoindata"><p>12/28 中山 有馬記念 1着</p></div>
        <p>武豊騎手　「最後まで　よく伸びてくれました」</p>
      </td>
    </tr>
    <tr class="spacer"><td></td></tr>
    <tr>
      <td class="umaban">2</td>
      <td class="left">ジャスティンパレス</td>
    </tr>
    <tr>
      <td class="syoin">
        <div class="syoindata"><p>12/28 中山 有馬記念 2着</p></div>
        －
      </td>
    </tr>
    <tr><td class="syoin">前走は迷子の行</td></tr>
  </tbody>
</table>
</body></html>"#;

    #[test]
    fn test_parse_interviews() {
        let interviews = SyoinExtractor::extract(SAMPLE_HTML);

        assert_eq!(interviews.len(), 1);
        assert_eq!(interviews["1"], "武豊騎手 「最後まで よく伸びてくれました」");
    }

    #[test]
    fn test_lone_dash_is_omitted() {
        let interviews = SyoinExtractor::extract(SAMPLE_HTML);
        assert!(!interviews.contains_key("2"));
    }

    #[test]
    fn test_single_character_is_omitted() {
        let html = r#"<table class="syoin"><tbody>
            <tr><td class="umaban">4</td></tr>
            <tr><td class="syoin"><div class="syoindata">1着</div>A</td></tr>
        </tbody></table>"#;
        assert!(SyoinExtractor::extract(html).is_empty());
    }

    #[test]
    fn test_name_key_when_number_missing() {
        let html = r#"<table class="syoin"><tbody>
            <tr><td class="umaban"></td><td class="left">タスティエーラ</td></tr>
            <tr><td class="syoin">次も楽しみです</td></tr>
        </tbody></table>"#;
        let interviews = SyoinExtractor::extract(html);
        assert_eq!(interviews["タスティエーラ"], "次も楽しみです");
    }

    #[test]
    fn test_missing_table() {
        assert!(SyoinExtractor::extract("<html></html>").is_empty());
    }
}
