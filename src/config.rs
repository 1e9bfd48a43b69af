//! Configuration for umai.

use serde::{Deserialize, Serialize};

use crate::assemble::MissingIndexPolicy;
use crate::scoring::SpeedSettings;

/// Default meeting and race selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceDefaults {
    #[serde(default = "default_year")]
    pub year: String,
    #[serde(default = "default_kai")]
    pub kai: String,
    /// keibabook venue code
    #[serde(default = "default_place")]
    pub place: String,
    #[serde(default = "default_day")]
    pub day: String,
    #[serde(default = "default_races")]
    pub races: Vec<u8>,
}

fn default_year() -> String {
    "2026".to_string()
}

fn default_kai() -> String {
    "01".to_string()
}

fn default_place() -> String {
    "05".to_string()
}

fn default_day() -> String {
    "01".to_string()
}

fn default_races() -> Vec<u8> {
    (1..=12).collect()
}

impl Default for RaceDefaults {
    fn default() -> Self {
        Self {
            year: default_year(),
            kai: default_kai(),
            place: default_place(),
            day: default_day(),
            races: default_races(),
        }
    }
}

/// Headless browser settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserSettings {
    /// Chrome executable; platform default when unset
    #[serde(default)]
    pub chrome_path: Option<String>,
    #[serde(default = "default_headless")]
    pub headless: bool,
    /// keibabook account; login is skipped without both
    #[serde(default)]
    pub login_id: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Upper bound on waiting for a page's content element
    #[serde(default = "default_page_wait_secs")]
    pub page_wait_secs: u64,
}

fn default_headless() -> bool {
    true
}

fn default_page_wait_secs() -> u64 {
    10
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            chrome_path: None,
            headless: default_headless(),
            login_id: None,
            password: None,
            page_wait_secs: default_page_wait_secs(),
        }
    }
}

impl BrowserSettings {
    /// Login id and password when both are set
    pub fn credentials(&self) -> Option<(&str, &str)> {
        self.login_id
            .as_deref()
            .zip(self.password.as_deref())
            .filter(|(id, pw)| !id.is_empty() && !pw.is_empty())
    }
}

/// Dify workflow API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DifyConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_dify_base_url")]
    pub base_url: String,
    #[serde(default = "default_dify_user")]
    pub user: String,
    #[serde(default = "default_dify_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_dify_base_url() -> String {
    "https://api.dify.ai".to_string()
}

fn default_dify_user() -> String {
    "keiba-bot".to_string()
}

fn default_dify_timeout_secs() -> u64 {
    90
}

impl Default for DifyConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_dify_base_url(),
            user: default_dify_user(),
            timeout_secs: default_dify_timeout_secs(),
        }
    }
}

/// Derived score settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub speed: SpeedSettings,
    /// Absolute limit on the total post-position bias
    #[serde(default = "default_bias_cap")]
    pub bias_cap: i32,
    /// JSON bias table; without one no bias is reported
    #[serde(default)]
    pub bias_table: Option<String>,
    #[serde(default)]
    pub missing_index: MissingIndexPolicy,
}

fn default_bias_cap() -> i32 {
    10
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            speed: SpeedSettings::default(),
            bias_cap: default_bias_cap(),
            bias_table: None,
            missing_index: MissingIndexPolicy::default(),
        }
    }
}

/// Page cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_cache_dir")]
    pub dir: String,
    #[serde(default = "default_cache_ttl_hours")]
    pub ttl_hours: i64,
}

fn default_cache_dir() -> String {
    "data/cache/pages".to_string()
}

fn default_cache_ttl_hours() -> i64 {
    6
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: default_cache_dir(),
            ttl_hours: default_cache_ttl_hours(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub race: RaceDefaults,
    #[serde(default)]
    pub browser: BrowserSettings,
    #[serde(default)]
    pub dify: DifyConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

impl AppConfig {
    /// Load configuration from environment and config file
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            // Start with defaults
            .add_source(config::Config::try_from(&AppConfig::default())?)
            // Add config file if exists
            .add_source(config::File::with_name("config").required(false))
            // Override with environment variables (UMAI_DIFY__API_KEY, UMAI_RACE__RACES=1,2,3, ...)
            .add_source(
                config::Environment::with_prefix("UMAI")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("race.races")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.race.races, (1..=12).collect::<Vec<u8>>());
        assert_eq!(config.dify.base_url, "https://api.dify.ai");
        assert_eq!(config.scoring.bias_cap, 10);
        assert_eq!(config.scoring.speed.weight_max, 3.0);
        assert!(!config.cache.enabled);
        assert_eq!(config.browser.credentials(), None);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: AppConfig = serde_json::from_str(
            r#"{"race": {"place": "04"}, "scoring": {"missing_index": "drop", "speed": {"emphasis_center": 60.0}}}"#,
        )
        .unwrap();
        assert_eq!(config.race.place, "04");
        assert_eq!(config.race.kai, "01");
        assert_eq!(config.scoring.missing_index, MissingIndexPolicy::Drop);
        assert_eq!(config.scoring.speed.emphasis_center, 60.0);
        assert_eq!(config.scoring.speed.emphasis_scale, 4.0);
    }

    #[test]
    fn test_credentials() {
        let settings = BrowserSettings {
            login_id: Some("user".to_string()),
            password: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(settings.credentials(), None);
    }
}
