use crate::core::period::Calendar;
use anyhow::{Context, Result, anyhow};
use chrono::Weekday;
use chrono_tz::Tz;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_CURRENCY_API_URL: &str =
    "https://cdn.jsdelivr.net/npm/@fawazahmed0/currency-api@latest/v1/currencies";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CurrencyApiConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub currency_api: Option<CurrencyApiConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            currency_api: Some(CurrencyApiConfig {
                base_url: DEFAULT_CURRENCY_API_URL.to_string(),
            }),
        }
    }
}

fn default_currency() -> String {
    "EUR".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Display currency for summaries and charts.
    #[serde(default = "default_currency")]
    pub currency: String,
    /// IANA timezone name used for day and month boundaries.
    pub timezone: Option<String>,
    pub week_start: Option<String>,
    pub data_path: Option<String>,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            currency: default_currency(),
            timezone: None,
            week_start: None,
            data_path: None,
            providers: ProvidersConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "xpns", "xpns")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("dev", "xpns", "xpns")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn currency_api_url(&self) -> &str {
        self.providers
            .currency_api
            .as_ref()
            .map_or(DEFAULT_CURRENCY_API_URL, |p| &p.base_url)
    }

    /// Timezone and week start for period ranges, defaulting to UTC and Monday.
    pub fn calendar(&self) -> Result<Calendar> {
        let tz = match self.timezone.as_deref() {
            Some(name) => name
                .parse::<Tz>()
                .map_err(|e| anyhow!("Invalid timezone {name}: {e}"))?,
            None => Tz::UTC,
        };
        let week_start = match self.week_start.as_deref() {
            Some(day) => day
                .parse::<Weekday>()
                .map_err(|_| anyhow!("Invalid week start: {day}"))?,
            None => Weekday::Mon,
        };
        Ok(Calendar::new(tz, week_start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
currency: "USD"
timezone: "Europe/Berlin"
week_start: "sunday"
providers:
  currency_api:
    base_url: "http://example.com/currencies"
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.currency, "USD");
        assert_eq!(config.currency_api_url(), "http://example.com/currencies");
        assert!(config.data_path.is_none());

        let calendar = config.calendar().unwrap();
        assert_eq!(calendar.tz, chrono_tz::Europe::Berlin);
        assert_eq!(calendar.week_start, Weekday::Sun);
    }

    #[test]
    fn test_config_defaults() {
        let config: AppConfig = serde_yaml::from_str("data_path: /tmp/xpns\n").unwrap();
        assert_eq!(config.currency, "EUR");
        assert_eq!(config.currency_api_url(), DEFAULT_CURRENCY_API_URL);
        assert_eq!(config.default_data_path().unwrap(), PathBuf::from("/tmp/xpns"));

        let calendar = config.calendar().unwrap();
        assert_eq!(calendar.tz, Tz::UTC);
        assert_eq!(calendar.week_start, Weekday::Mon);
    }

    #[test]
    fn test_invalid_calendar_settings() {
        let config = AppConfig {
            timezone: Some("Mars/Olympus".to_string()),
            ..AppConfig::default()
        };
        assert!(config.calendar().is_err());

        let config = AppConfig {
            week_start: Some("someday".to_string()),
            ..AppConfig::default()
        };
        assert!(config.calendar().is_err());
    }

    #[test]
    fn test_load_from_path() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("config.yaml");
        fs::write(&path, "currency: \"GBP\"\n")?;

        let config = AppConfig::load_from_path(&path)?;
        assert_eq!(config.currency, "GBP");
        assert!(AppConfig::load_from_path(temp_dir.path().join("missing.yaml")).is_err());
        Ok(())
    }
}
