//! CLI commands for umai.
//!
//! Builds race prompts from keibabook/netkeiba pages and optionally streams
//! them through the Dify workflow.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::Duration;
use clap::{Args, Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::assemble::AssemblySettings;
use crate::config::AppConfig;
use crate::dify::DifyClient;
use crate::pipeline::{combine_outputs, RaceRunner};
use crate::race::{RaceConfig, VENUES};
use crate::scraper::{Browser, Cache, CachedSource, FileSource, PageKind, PageSource};

#[derive(Parser)]
#[command(name = "umai")]
#[command(version, about = "Race-card scraper and LLM prediction prompt builder", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the per-race prompts without calling the AI
    Prompt {
        #[command(flatten)]
        race: RaceArgs,
    },

    /// Build the prompts and stream each one through the Dify workflow
    Predict {
        #[command(flatten)]
        race: RaceArgs,
    },

    /// List venue codes
    Venues,
}

/// Meeting selection and output flags shared by the race commands
#[derive(Args, Debug, Clone, Default)]
pub struct RaceArgs {
    /// Year (e.g. 2026)
    #[arg(long)]
    pub year: Option<String>,

    /// Meeting number (回)
    #[arg(long)]
    pub kai: Option<String>,

    /// keibabook venue code (see `umai venues`)
    #[arg(long)]
    pub place: Option<String>,

    /// Day of the meeting (日目)
    #[arg(long)]
    pub day: Option<String>,

    /// Races to process (e.g. 1,2,11)
    #[arg(short, long, value_delimiter = ',')]
    pub races: Vec<u8>,

    /// Write the combined output to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Read saved pages from `<DIR>/<NN>/<page>.html` instead of the browser
    #[arg(long, value_name = "DIR")]
    pub from_dir: Option<PathBuf>,
}

impl RaceArgs {
    /// Command-line values over configured defaults
    pub fn resolve(&self, config: &AppConfig) -> Result<(RaceConfig, Vec<u8>)> {
        let defaults = &config.race;
        let race = RaceConfig::new(
            self.year.as_deref().unwrap_or(&defaults.year),
            self.kai.as_deref().unwrap_or(&defaults.kai),
            self.place.as_deref().unwrap_or(&defaults.place),
            self.day.as_deref().unwrap_or(&defaults.day),
        )?;

        let mut races = if self.races.is_empty() {
            defaults.races.clone()
        } else {
            self.races.clone()
        };
        if let Some(bad) = races.iter().find(|r| !(1..=12).contains(*r)) {
            bail!("race number must be 1-12, got {}", bad);
        }
        let mut seen = Vec::new();
        races.retain(|r| {
            let first = !seen.contains(r);
            seen.push(*r);
            first
        });

        Ok((race, races))
    }
}

/// Where pages come from for this run.
enum Session {
    Saved(FileSource),
    Live(Browser),
    Cached(CachedSource<Browser>),
}

impl Session {
    async fn open(from_dir: Option<&Path>, config: &AppConfig) -> Result<Self> {
        if let Some(dir) = from_dir {
            info!("Reading saved pages from {}", dir.display());
            return Ok(Session::Saved(FileSource::new(dir)));
        }

        let browser = Browser::launch(&config.browser).await?;
        browser.login(&config.browser).await?;

        if config.cache.enabled {
            let cache = Cache::new(&config.cache.dir, Duration::hours(config.cache.ttl_hours));
            info!("Page cache enabled at {}", config.cache.dir);
            Ok(Session::Cached(CachedSource::new(browser, cache)))
        } else {
            Ok(Session::Live(browser))
        }
    }

    async fn close(self) -> Result<()> {
        match self {
            Session::Saved(_) => Ok(()),
            Session::Live(browser) => browser.close().await,
            Session::Cached(source) => source.into_inner().close().await,
        }
    }
}

#[async_trait]
impl PageSource for Session {
    async fn fetch(&self, kind: PageKind, config: &RaceConfig, race_num: u8) -> Result<String> {
        match self {
            Session::Saved(source) => source.fetch(kind, config, race_num).await,
            Session::Live(source) => source.fetch(kind, config, race_num).await,
            Session::Cached(source) => source.fetch(kind, config, race_num).await,
        }
    }
}

async fn open_runner(args: &RaceArgs, config: &AppConfig) -> Result<(RaceRunner<Session>, Vec<u8>)> {
    let (race, races) = args.resolve(config)?;
    let settings = AssemblySettings::from_config(&config.scoring);
    let session = Session::open(args.from_dir.as_deref(), config).await?;

    eprintln!("{} / races {:?}", race, races);
    Ok((RaceRunner::new(session, race, settings), races))
}

async fn write_output(path: Option<&Path>, text: &str) -> Result<()> {
    if let Some(path) = path {
        tokio::fs::write(path, text)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        eprintln!("Saved to {}", path.display());
    }
    Ok(())
}

/// Print the prompt of every selected race.
pub async fn run_prompt(args: RaceArgs) -> Result<()> {
    let config = AppConfig::load()?;
    let (runner, races) = open_runner(&args, &config).await?;

    let mut outputs = Vec::new();
    for race_num in races {
        let Some(race) = runner.build(race_num).await else {
            eprintln!("{}R: no horse data", race_num);
            continue;
        };
        let section = combine_outputs(&[(race_num, race.prompt)]);
        print!("{}", section);
        outputs.push((race_num, section));
    }
    println!();

    runner.into_source().close().await?;

    let combined: String = outputs.into_iter().map(|(_, s)| s).collect();
    write_output(args.output.as_deref(), &combined).await
}

/// Stream each race's prompt through Dify and print the prediction as it arrives.
pub async fn run_predict(args: RaceArgs) -> Result<()> {
    let config = AppConfig::load()?;
    let client = DifyClient::from_config(&config.dify).context("Dify client setup")?;
    let (runner, races) = open_runner(&args, &config).await?;

    let mut outputs = Vec::new();
    for race_num in races {
        let Some(race) = runner.build(race_num).await else {
            eprintln!("{}R: no horse data", race_num);
            continue;
        };

        println!("\n--- {} {}R ---", runner.config().venue_name(), race_num);
        let mut stdout = std::io::stdout();
        let result = client
            .run_workflow(&race.prompt, |chunk| {
                print!("{}", chunk);
                let _ = stdout.flush();
            })
            .await;
        println!();

        let text = match result {
            Ok(text) => text,
            Err(e) => {
                warn!("Dify workflow failed for {}R: {}", race_num, e);
                format!("Error: {}", e)
            }
        };
        outputs.push((race_num, text));
    }

    runner.into_source().close().await?;

    write_output(args.output.as_deref(), &combine_outputs(&outputs)).await
}

/// Print the venue table.
pub fn run_venues() -> Result<()> {
    println!("{:<6} {:<6} {}", "code", "venue", "netkeiba");
    for (code, name, netkeiba) in VENUES {
        println!("{:<6} {:<6} {}", code, name, netkeiba);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_race_args() {
        let cli = Cli::parse_from([
            "umai", "prompt", "--place", "04", "--races", "11,12", "--from-dir", "pages",
        ]);
        let Commands::Prompt { race } = cli.command else {
            panic!("expected prompt command");
        };
        assert_eq!(race.place.as_deref(), Some("04"));
        assert_eq!(race.races, vec![11, 12]);
        assert_eq!(race.from_dir, Some(PathBuf::from("pages")));
    }

    #[test]
    fn test_resolve_uses_config_defaults() {
        let config = AppConfig::default();
        let args = RaceArgs {
            day: Some("3".to_string()),
            ..Default::default()
        };
        let (race, races) = args.resolve(&config).unwrap();
        assert_eq!(race.race_id(1), "202601050301");
        assert_eq!(races, (1..=12).collect::<Vec<u8>>());
    }

    #[test]
    fn test_resolve_rejects_bad_races() {
        let config = AppConfig::default();
        let args = RaceArgs {
            races: vec![1, 13],
            ..Default::default()
        };
        assert!(args.resolve(&config).is_err());

        let args = RaceArgs {
            races: vec![11, 3, 11],
            ..Default::default()
        };
        let (_, races) = args.resolve(&config).unwrap();
        assert_eq!(races, vec![11, 3]);
    }
}
