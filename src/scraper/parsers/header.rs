//! Race header parser (title block of the danwa page).

use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;

use super::{select_first, text_of};
use crate::types::RaceInfo;

static COURSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(芝|ダ|障).*?\d{3,4}\s*(m|ｍ|メートル)").unwrap());

/// Parse the race header. A page without a title block gives an empty header.
pub fn parse_race_info(html: &str) -> RaceInfo {
    let document = Html::parse_document(html);
    let mut info = RaceInfo::default();

    let Some(title) = select_first(document.root_element(), "div.racetitle") else {
        return info;
    };

    let p_selector = Selector::parse("p").unwrap();

    // Meeting line, then race name
    if let Some(racemei) = select_first(title, "div.racemei") {
        let lines: Vec<String> = racemei
            .select(&p_selector)
            .map(|p| text_of(p, ""))
            .filter(|l| !l.is_empty())
            .collect();

        if let Some((first, rest)) = lines.split_first() {
            info.meeting = first.clone();
            info.race_name = rest.join(" ");
        }
        info.lines.extend(lines);
    }

    // Track condition and course/distance
    if let Some(sub) = select_first(title, "div.racetitle_sub") {
        let lines: Vec<String> = sub
            .select(&p_selector)
            .map(|p| text_of(p, ""))
            .filter(|l| !l.is_empty())
            .collect();

        let mut conditions = Vec::new();
        for line in &lines {
            if info.course.is_empty() && COURSE_RE.is_match(line) {
                info.course = line.clone();
            } else {
                conditions.push(line.as_str());
            }
        }
        info.track_condition = conditions.join(" ");
        info.lines.extend(lines);
    }

    info
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_HTML: &str = r#"<!DOCTYPE html>
<html><body>
<div class="racetitle">
  <div class="racemei">
    <p>1回中山3日 2026年1月10日(土)</p>
    <p>11R　ニューイヤーステークス</p>
  </div>
  <div class="racetitle_sub">
    <p>天候:晴 芝:良</p>
    <p>芝・外 1600m (4歳以上オープン)</p>
  </div>
</div>
</body></html>"#;

    #[test]
    fn test_parse_race_info() {
        let info = parse_race_info(SAMPLE_HTML);

        assert_eq!(info.meeting, "1回中山3日 2026年1月10日(土)");
        assert_eq!(info.race_name, "11R ニューイヤーステークス");
        assert_eq!(info.track_condition, "天候:晴 芝:良");
        assert_eq!(info.course, "芝・外 1600m (4歳以上オープン)");
        assert_eq!(info.lines.len(), 4);
        assert!(info.header_text().starts_with("1回中山3日"));
    }

    #[test]
    fn test_missing_title_block() {
        let info = parse_race_info("<html><body><p>メンテナンス中</p></body></html>");
        assert!(info.is_empty());
        assert_eq!(info, RaceInfo::default());
    }

    #[test]
    fn test_title_without_sub_block() {
        let html = r#"<div class="racetitle"><div class="racemei"><p>2回東京1日</p></div></div>"#;
        let info = parse_race_info(html);
        assert_eq!(info.meeting, "2回東京1日");
        assert_eq!(info.race_name, "");
        assert_eq!(info.course, "");
    }
}
