//! Web scraper module for keibabook (smartphone site) and netkeiba.
//!
//! Provides page addressing, page sources (browser, saved files, cache) and
//! the per-page HTML extractors.

pub mod browser;
pub mod cache;
pub mod parsers;
pub mod source;

pub use browser::Browser;
pub use cache::{Cache, CachedSource};
pub use source::{FileSource, PageSource};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::race::RaceConfig;

/// Base URLs
pub const KEIBABOOK_URL: &str = "https://s.keibabook.co.jp";
pub const NETKEIBA_URL: &str = "https://race.netkeiba.com";

/// Build keibabook login URL
pub fn login_url() -> String {
    format!("{}/login/login", KEIBABOOK_URL)
}

/// The pages fetched for one race, in fetch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PageKind {
    /// Trainer comments; also carries the race header
    Danwa,
    /// Prior-race interviews
    Syoin,
    /// Workout reports
    Cyokyo,
    /// Race card with jockeys
    Syutuba,
    /// CPU speed indices and factors
    Cpu,
    /// netkeiba past-performance table
    ShutubaPast,
}

impl PageKind {
    pub const ALL: [PageKind; 6] = [
        PageKind::Danwa,
        PageKind::Syoin,
        PageKind::Cyokyo,
        PageKind::Syutuba,
        PageKind::Cpu,
        PageKind::ShutubaPast,
    ];

    /// Page URL for a race, `None` when the venue has no netkeiba code
    pub fn url(&self, config: &RaceConfig, race_num: u8) -> Option<String> {
        let id = config.race_id(race_num);
        let url = match self {
            PageKind::Danwa => format!("{}/cyuou/danwa/0/{}", KEIBABOOK_URL, id),
            PageKind::Syoin => format!("{}/cyuou/syoin/{}", KEIBABOOK_URL, id),
            PageKind::Cyokyo => format!("{}/cyuou/cyokyo/0/{}", KEIBABOOK_URL, id),
            PageKind::Syutuba => format!("{}/cyuou/syutuba/{}", KEIBABOOK_URL, id),
            PageKind::Cpu => format!("{}/cyuou/cpu/{}", KEIBABOOK_URL, id),
            PageKind::ShutubaPast => format!(
                "{}/race/shutuba_past.html?race_id={}&rf=shutuba_submenu",
                NETKEIBA_URL,
                config.netkeiba_race_id(race_num)?
            ),
        };
        Some(url)
    }

    /// Element that signals the page content has rendered
    pub fn ready_selector(&self) -> &'static str {
        match self {
            PageKind::Danwa => "table.default.danwa",
            PageKind::Syoin => "table.default.syoin",
            PageKind::Cyokyo => "table.cyokyo",
            PageKind::Syutuba => "table.syutuba",
            PageKind::Cpu => ".main",
            PageKind::ShutubaPast => ".Shutuba_Past5_Table",
        }
    }

    /// File stem used by the saved-page and cache layouts
    pub fn file_stem(&self) -> &'static str {
        match self {
            PageKind::Danwa => "danwa",
            PageKind::Syoin => "syoin",
            PageKind::Cyokyo => "cyokyo",
            PageKind::Syutuba => "syutuba",
            PageKind::Cpu => "cpu",
            PageKind::ShutubaPast => "shutuba_past",
        }
    }
}

impl fmt::Display for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_stem())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_urls() {
        let config = RaceConfig::new("2026", "01", "05", "03").unwrap();
        assert_eq!(
            PageKind::Danwa.url(&config, 1).as_deref(),
            Some("https://s.keibabook.co.jp/cyuou/danwa/0/202601050301")
        );
        assert_eq!(
            PageKind::Syoin.url(&config, 12).as_deref(),
            Some("https://s.keibabook.co.jp/cyuou/syoin/202601050312")
        );
        assert_eq!(
            PageKind::ShutubaPast.url(&config, 11).as_deref(),
            Some("https://race.netkeiba.com/race/shutuba_past.html?race_id=202606010311&rf=shutuba_submenu")
        );
    }

    #[test]
    fn test_file_stems_unique() {
        let mut stems: Vec<_> = PageKind::ALL.iter().map(|k| k.file_stem()).collect();
        stems.sort();
        stems.dedup();
        assert_eq!(stems.len(), PageKind::ALL.len());
    }
}
