use std::{
    env, fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::utils;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Editorial card listing (`article` / `[data-testid=card]`).
    Timeout,
    /// Ticketing listing with event cards carrying date and venue text.
    Eventbrite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Stamped onto every draft as `source_website`.
    pub name: String,
    pub url: String,
    pub kind: SourceKind,
    /// Resolves relative links; defaults to `url`.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Links must contain this fragment to be accepted.
    #[serde(default)]
    pub link_filter: Option<String>,
}

impl SourceConfig {
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(&self.url)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub city: String,
    pub timezone: String,
    pub bind_addr: String,
    pub database_path: Option<PathBuf>,
    pub scrape_interval_hours: u64,
    pub fetch_timeout_secs: u64,
    pub user_agent: String,
    pub fallback_threshold: usize,
    pub operator_token: Option<String>,
    pub operator_name: String,
    pub log_filter: String,
    pub sources: Vec<SourceConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            city: "Sydney, Australia".to_string(),
            timezone: "Australia/Sydney".to_string(),
            bind_addr: "0.0.0.0:5000".to_string(),
            database_path: None,
            scrape_interval_hours: 6,
            fetch_timeout_secs: 10,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            fallback_threshold: 3,
            operator_token: None,
            operator_name: "operator".to_string(),
            log_filter: "event_scrape=info,event_scrape_lib=info,tower_http=info".to_string(),
            sources: vec![
                SourceConfig {
                    name: "Timeout Sydney".to_string(),
                    url: "https://www.timeout.com/sydney/things-to-do".to_string(),
                    kind: SourceKind::Timeout,
                    base_url: Some("https://www.timeout.com".to_string()),
                    link_filter: Some("/sydney/".to_string()),
                },
                SourceConfig {
                    name: "Eventbrite".to_string(),
                    url: "https://www.eventbrite.com.au/d/australia--sydney/events/".to_string(),
                    kind: SourceKind::Eventbrite,
                    base_url: None,
                    link_filter: Some("eventbrite".to_string()),
                },
            ],
        }
    }
}

impl AppConfig {
    /// Reads `config.json` from the data directory, then applies environment
    /// overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&utils::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = read_config(path)?;
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn tz(&self) -> Tz {
        Tz::from_str(&self.timezone).unwrap_or(chrono_tz::UTC)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn scrape_interval(&self) -> Duration {
        Duration::from_secs(self.scrape_interval_hours * 60 * 60)
    }

    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(utils::database_path)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(city) = env::var("EVENT_SCRAPE_CITY") {
            self.city = city;
        }
        if let Ok(timezone) = env::var("EVENT_SCRAPE_TIMEZONE") {
            self.timezone = timezone;
        }
        if let Ok(bind) = env::var("EVENT_SCRAPE_BIND") {
            self.bind_addr = bind;
        }
        if let Ok(path) = env::var("EVENT_SCRAPE_DB") {
            self.database_path = Some(PathBuf::from(path));
        }
        if let Ok(hours) = env::var("EVENT_SCRAPE_INTERVAL_HOURS") {
            self.scrape_interval_hours = parse_number("EVENT_SCRAPE_INTERVAL_HOURS", &hours)?;
        }
        if let Ok(secs) = env::var("EVENT_SCRAPE_FETCH_TIMEOUT_SECS") {
            self.fetch_timeout_secs = parse_number("EVENT_SCRAPE_FETCH_TIMEOUT_SECS", &secs)?;
        }
        if let Ok(token) = env::var("EVENT_SCRAPE_OPERATOR_TOKEN") {
            self.operator_token = Some(token).filter(|t| !t.trim().is_empty());
        }
        if let Ok(name) = env::var("EVENT_SCRAPE_OPERATOR_NAME") {
            self.operator_name = name;
        }
        if let Ok(filter) = env::var("RUST_LOG") {
            self.log_filter = filter;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if Tz::from_str(&self.timezone).is_err() {
            return Err(ConfigError::Invalid {
                key: "timezone",
                value: self.timezone.clone(),
            });
        }
        if self.scrape_interval_hours == 0 {
            return Err(ConfigError::Invalid {
                key: "scrape_interval_hours",
                value: "0".to_string(),
            });
        }
        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "fetch_timeout_secs",
                value: "0".to_string(),
            });
        }
        if self.city.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "city",
                value: self.city.clone(),
            });
        }
        Ok(())
    }
}

fn parse_number(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_string(),
    })
}

fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config = read_config(Path::new("/nonexistent/event-scrape/config.json"))
            .expect("defaults");
        assert_eq!(config.city, "Sydney, Australia");
        assert_eq!(config.fetch_timeout(), Duration::from_secs(10));
        assert_eq!(config.scrape_interval(), Duration::from_secs(6 * 60 * 60));
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.tz(), chrono_tz::Australia::Sydney);
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let parsed: AppConfig =
            serde_json::from_str(r#"{"city": "Melbourne, Australia", "scrape_interval_hours": 12}"#)
                .expect("parse config");
        assert_eq!(parsed.city, "Melbourne, Australia");
        assert_eq!(parsed.scrape_interval_hours, 12);
        assert_eq!(parsed.fallback_threshold, 3);
        assert_eq!(parsed.user_agent, DEFAULT_USER_AGENT);
    }

    #[test]
    fn rejects_unknown_timezone() {
        let config = AppConfig {
            timezone: "Mars/Olympus".to_string(),
            ..AppConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { key: "timezone", .. })
        ));
    }

    #[test]
    fn source_base_url_falls_back_to_listing_url() {
        let config = AppConfig::default();
        assert_eq!(config.sources[0].base_url(), "https://www.timeout.com");
        assert_eq!(config.sources[1].base_url(), config.sources[1].url);
    }
}
