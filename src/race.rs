//! Race addressing: the meeting tuple and the venue tables of both sites.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Venue code (keibabook), venue name, netkeiba venue code
pub const VENUES: [(&str, &str, &str); 10] = [
    ("00", "京都", "08"),
    ("01", "阪神", "09"),
    ("02", "中京", "07"),
    ("03", "小倉", "10"),
    ("04", "東京", "05"),
    ("05", "中山", "06"),
    ("06", "福島", "03"),
    ("07", "新潟", "04"),
    ("08", "札幌", "01"),
    ("09", "函館", "02"),
];

/// Venue name for a keibabook venue code
pub fn venue_name(code: &str) -> Option<&'static str> {
    VENUES.iter().find(|(c, _, _)| *c == code).map(|(_, name, _)| *name)
}

/// netkeiba venue code for a keibabook venue code
pub fn netkeiba_venue(code: &str) -> Option<&'static str> {
    VENUES.iter().find(|(c, _, _)| *c == code).map(|(_, _, nk)| *nk)
}

/// Identifies one meeting day: year, meeting number (kai), venue, day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceConfig {
    pub year: String,
    pub kai: String,
    pub place: String,
    pub day: String,
}

impl RaceConfig {
    /// Validate and zero-pad a meeting tuple.
    pub fn new(year: &str, kai: &str, place: &str, day: &str) -> Result<Self> {
        let year = year.trim();
        if year.len() != 4 || !year.chars().all(|c| c.is_ascii_digit()) {
            bail!("year must be 4 digits, got {:?}", year);
        }

        let kai = pad2("kai", kai)?;
        let place = pad2("place", place)?;
        let day = pad2("day", day)?;

        if venue_name(&place).is_none() {
            bail!("unknown venue code {}", place);
        }

        Ok(Self {
            year: year.to_string(),
            kai,
            place,
            day,
        })
    }

    pub fn venue_name(&self) -> &'static str {
        venue_name(&self.place).unwrap_or("不明")
    }

    /// keibabook race id: YYYY KK PP DD RR
    pub fn race_id(&self, race_num: u8) -> String {
        format!("{}{}{}{}{:02}", self.year, self.kai, self.place, self.day, race_num)
    }

    /// netkeiba race id: YYYY PP KK DD RR, with the venue translated
    pub fn netkeiba_race_id(&self, race_num: u8) -> Option<String> {
        let nk_place = netkeiba_venue(&self.place)?;
        Some(format!(
            "{}{}{}{}{:02}",
            self.year, nk_place, self.kai, self.day, race_num
        ))
    }

    /// Meeting day as a number (for the early-meeting bias)
    pub fn day_number(&self) -> u8 {
        self.day.parse().unwrap_or(0)
    }
}

impl fmt::Display for RaceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}年 {}回 {} {}日目",
            self.year,
            self.kai,
            self.venue_name(),
            self.day
        )
    }
}

fn pad2(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    match value.parse::<u8>() {
        Ok(n) if n < 100 && !value.is_empty() => Ok(format!("{:02}", n)),
        _ => bail!("{} must be a number below 100, got {:?}", field, value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_race_ids() {
        let config = RaceConfig::new("2026", "1", "05", "3").unwrap();
        assert_eq!(config.race_id(11), "202601050311");
        assert_eq!(config.netkeiba_race_id(11).as_deref(), Some("202606010311"));
        assert_eq!(config.venue_name(), "中山");
        assert_eq!(config.day_number(), 3);
    }

    #[test]
    fn test_netkeiba_table_covers_all_venues() {
        for (code, _, _) in VENUES {
            assert!(netkeiba_venue(code).is_some());
        }
        assert_eq!(netkeiba_venue("00"), Some("08"));
        assert_eq!(netkeiba_venue("10"), None);
    }

    #[test]
    fn test_invalid_config() {
        assert!(RaceConfig::new("26", "01", "05", "03").is_err());
        assert!(RaceConfig::new("2026", "01", "10", "03").is_err());
        assert!(RaceConfig::new("2026", "x", "05", "03").is_err());
    }

    #[test]
    fn test_display() {
        let config = RaceConfig::new("2026", "01", "04", "02").unwrap();
        assert_eq!(config.to_string(), "2026年 01回 東京 02日目");
    }
}
