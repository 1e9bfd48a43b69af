//! Trainer comment (厩舎の話) parser for keibabook.

use scraper::Html;

use super::{
    body_rows, horse_name, is_spacer, row_key, select_first, text_of, AfterDetail,
    AlternatingRows, Extractor,
};
use crate::scraper::PageKind;
use crate::types::{CommentRecord, HorseMap};

/// Parser for the danwa table: identity row, then one or more comment rows.
pub struct DanwaExtractor;

impl Extractor for DanwaExtractor {
    type Record = CommentRecord;

    const PAGE: PageKind = PageKind::Danwa;

    fn extract(html: &str) -> HorseMap<CommentRecord> {
        let document = Html::parse_document(html);
        let mut horses = HorseMap::new();

        let Some(table) = select_first(document.root_element(), "table.danwa") else {
            return horses;
        };

        let mut rows = AlternatingRows::new(AfterDetail::Stay);

        for tr in body_rows(table) {
            if is_spacer(tr) {
                continue;
            }

            let umaban = select_first(tr, "td.umaban");
            let name_cell = select_first(tr, "td.left");

            if let (Some(umaban), Some(_)) = (umaban, name_cell) {
                let name = horse_name(tr);
                let key = row_key(&text_of(umaban, ""), &name);
                if let Some(key) = &key {
                    horses.insert(
                        key.clone(),
                        CommentRecord {
                            name,
                            comment: String::new(),
                        },
                    );
                }
                rows.identity(key);
                continue;
            }

            let Some(cell) = select_first(tr, "td.danwa") else {
                continue;
            };
            let Some(key) = rows.detail() else {
                continue;
            };

            let text = text_of(cell, " ");
            if text.is_empty() {
                continue;
            }
            if let Some(record) = horses.get_mut(&key) {
                if record.comment.is_empty() {
                    record.comment = text;
                } else {
                    record.comment.push(' ');
                    record.comment.push_str(&text);
                }
            }
        }

        horses
    }
}
