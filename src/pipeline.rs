//! Per-race runner: fetch every page, extract, assemble.

use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::assemble::{assemble, AssembledRace, AssemblySettings, RaceSources};
use crate::race::RaceConfig;
use crate::scraper::parsers::{
    parse_race_info, CpuExtractor, CyokyoExtractor, DanwaExtractor, Extractor,
    ShutubaPastExtractor, SyoinExtractor, SyutubaExtractor,
};
use crate::scraper::{PageKind, PageSource};
use crate::types::HorseMap;

/// Raw markup per page; a page that failed to load is missing.
pub type Pages = HashMap<PageKind, String>;

/// Runs the fetch/extract/assemble sequence for races of one meeting day.
pub struct RaceRunner<S> {
    source: S,
    config: RaceConfig,
    settings: AssemblySettings,
}

impl<S: PageSource> RaceRunner<S> {
    pub fn new(source: S, config: RaceConfig, settings: AssemblySettings) -> Self {
        Self {
            source,
            config,
            settings,
        }
    }

    pub fn config(&self) -> &RaceConfig {
        &self.config
    }

    /// Give the page source back, e.g. to shut a browser down
    pub fn into_source(self) -> S {
        self.source
    }

    /// Fetch all pages in order. Failures are logged and leave the page out.
    pub async fn fetch_pages(&self, race_num: u8) -> Pages {
        let mut pages = Pages::new();

        for kind in PageKind::ALL {
            match self.source.fetch(kind, &self.config, race_num).await {
                Ok(html) => {
                    debug!(race = race_num, page = %kind, bytes = html.len(), "Fetched page");
                    pages.insert(kind, html);
                }
                Err(e) => {
                    warn!(race = race_num, page = %kind, "Page fetch failed: {:#}", e);
                }
            }
        }

        pages
    }

    /// Build one race. `None` when no page yielded any horse.
    pub async fn build(&self, race_num: u8) -> Option<AssembledRace> {
        info!("Collecting {} {}R", self.config, race_num);

        let pages = self.fetch_pages(race_num).await;
        let sources = extract_sources(&pages);

        if sources.has_no_horses() {
            warn!("No horse data found for {}R, skipping", race_num);
            return None;
        }
        if sources.info.is_empty() {
            debug!("No race header for {}R", race_num);
        } else if sources.info.is_debut() {
            info!("{}R is a debut race", race_num);
        }

        let race = assemble(&self.config, &sources, &self.settings);
        info!(horses = race.horses.len(), "Assembled {}R", race_num);
        Some(race)
    }
}

fn extract_page<E: Extractor>(pages: &Pages) -> HorseMap<E::Record> {
    pages
        .get(&E::PAGE)
        .map(|html| E::extract(html))
        .unwrap_or_default()
}

/// Run every extractor over the fetched pages.
pub fn extract_sources(pages: &Pages) -> RaceSources {
    RaceSources {
        info: pages
            .get(&PageKind::Danwa)
            .map(|html| parse_race_info(html))
            .unwrap_or_default(),
        comments: extract_page::<DanwaExtractor>(pages),
        interviews: extract_page::<SyoinExtractor>(pages),
        workouts: extract_page::<CyokyoExtractor>(pages),
        card: extract_page::<SyutubaExtractor>(pages),
        cpu: extract_page::<CpuExtractor>(pages),
        past: extract_page::<ShutubaPastExtractor>(pages),
    }
}

/// Concatenate per-race outputs under `--- {n}R ---` separators.
pub fn combine_outputs(outputs: &[(u8, String)]) -> String {
    outputs
        .iter()
        .map(|(race_num, text)| format!("\n\n--- {}R ---\n{}", race_num, text))
        .collect()
}
