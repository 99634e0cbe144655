use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Weekday;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON5 parse error: {0}")]
    Json5(#[from] json5::Error),
    #[error("Config directory not found")]
    NoDirFound,
    #[error("Unknown timezone: {0}")]
    InvalidTimezone(String),
    #[error("Unknown weekday: {0}")]
    InvalidWeekday(String),
    #[error("Hour out of range: {0}")]
    InvalidHour(u32),
}

/// Zulip connection and destination settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZulipConfig {
    /// Zulip server base URL.
    #[serde(default = "default_site")]
    pub site: String,
    /// Bot account email.
    #[serde(default)]
    pub email: String,
    /// Bot API key. Falls back to the `ZULIP_API_KEY` env var.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Stream announcements are broadcast to.
    #[serde(default = "default_stream")]
    pub stream: String,
    /// Topic within the stream.
    #[serde(default = "default_topic")]
    pub topic: String,
}

fn default_site() -> String {
    "https://recurse.zulipchat.com".to_string()
}

fn default_stream() -> String {
    "455 Broadway".to_string()
}

fn default_topic() -> String {
    "Feelings Checkin".to_string()
}

impl Default for ZulipConfig {
    fn default() -> Self {
        Self {
            site: default_site(),
            email: String::new(),
            api_key: None,
            stream: default_stream(),
            topic: default_topic(),
        }
    }
}

/// When in the week the event runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Event weekday (e.g. "thursday").
    #[serde(default = "default_weekday")]
    pub weekday: String,
    /// Hour of the morning announcement, which also opens the
    /// submission window.
    #[serde(default = "default_morning_hour")]
    pub morning_hour: u32,
    /// Hour of the one-hour reminder.
    #[serde(default = "default_one_hour_hour")]
    pub one_hour_hour: u32,
    /// Hour of the starting announcement, which also closes the
    /// submission window.
    #[serde(default = "default_starting_hour")]
    pub starting_hour: u32,
}

fn default_weekday() -> String {
    "thursday".to_string()
}

fn default_morning_hour() -> u32 {
    9
}

fn default_one_hour_hour() -> u32 {
    14
}

fn default_starting_hour() -> u32 {
    15
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            weekday: default_weekday(),
            morning_hour: default_morning_hour(),
            one_hour_hour: default_one_hour_hour(),
            starting_hour: default_starting_hour(),
        }
    }
}

impl ScheduleConfig {
    pub fn weekday(&self) -> Result<Weekday, ConfigError> {
        Weekday::from_str(&self.weekday)
            .map_err(|_| ConfigError::InvalidWeekday(self.weekday.clone()))
    }
}

/// Top-level fcbot configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FcBotConfig {
    /// Zulip transport settings.
    #[serde(default)]
    pub zulip: ZulipConfig,
    /// Event schedule.
    #[serde(default)]
    pub schedule: ScheduleConfig,
    /// Event timezone (IANA name).
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Days before an untouched identity is purged.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    /// Seconds between scheduler checks.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// SQLite database path. Defaults to `<config dir>/fcbot.db`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<PathBuf>,
}

fn default_timezone() -> String {
    "America/New_York".to_string()
}

fn default_retention_days() -> u32 {
    90
}

fn default_poll_interval_secs() -> u64 {
    60
}

impl Default for FcBotConfig {
    fn default() -> Self {
        Self {
            zulip: ZulipConfig::default(),
            schedule: ScheduleConfig::default(),
            timezone: default_timezone(),
            retention_days: default_retention_days(),
            poll_interval_secs: default_poll_interval_secs(),
            storage_path: None,
        }
    }
}

impl FcBotConfig {
    pub fn tz(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse()
            .map_err(|_| ConfigError::InvalidTimezone(self.timezone.clone()))
    }

    /// Resolve the database path, defaulting to the config directory.
    pub fn storage_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.storage_path {
            Some(path) => Ok(path.clone()),
            None => Ok(config_dir()?.join("fcbot.db")),
        }
    }

    /// Check that timezone, weekday, and hours are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tz()?;
        self.schedule.weekday()?;
        for hour in [
            self.schedule.morning_hour,
            self.schedule.one_hour_hour,
            self.schedule.starting_hour,
        ] {
            if hour >= 24 {
                return Err(ConfigError::InvalidHour(hour));
            }
        }
        Ok(())
    }
}

/// Resolve the fcbot config directory (~/.fcbot/).
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|h| h.join(".fcbot"))
        .ok_or(ConfigError::NoDirFound)
}

/// Resolve the config file path (~/.fcbot/config.json5).
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.json5"))
}

/// Load configuration from the default path, falling back to defaults.
pub fn load_config() -> Result<FcBotConfig, ConfigError> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let path = config_file_path()?;
    load_config_from(&path)
}

/// Load configuration from a specific path, falling back to defaults if not found.
pub fn load_config_from(path: &Path) -> Result<FcBotConfig, ConfigError> {
    let mut config: FcBotConfig = if path.exists() {
        let content = std::fs::read_to_string(path)?;
        json5::from_str(&content)?
    } else {
        tracing::debug!("Config file not found at {}, using defaults", path.display());
        FcBotConfig::default()
    };

    if config.zulip.api_key.is_none() {
        if let Ok(key) = std::env::var("ZULIP_API_KEY") {
            config.zulip.api_key = Some(key);
        }
    }

    config.validate()?;
    Ok(config)
}

/// Ensure the config directory exists.
pub fn ensure_config_dir() -> Result<PathBuf, ConfigError> {
    let dir = config_dir()?;
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
    }
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FcBotConfig::default();
        assert_eq!(config.timezone, "America/New_York");
        assert_eq!(config.retention_days, 90);
        assert_eq!(config.schedule.morning_hour, 9);
        assert_eq!(config.schedule.starting_hour, 15);
        assert_eq!(config.zulip.stream, "455 Broadway");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_json5_parse() {
        let json5_str = r#"{
            zulip: {
                email: "feelings-bot@example.zulipchat.com",
                stream: "bot test",
                topic: "hello",
            },
            timezone: "Europe/Berlin",
            retention_days: 180,
        }"#;
        let config: FcBotConfig = json5::from_str(json5_str).unwrap();
        assert_eq!(config.zulip.stream, "bot test");
        assert_eq!(config.timezone, "Europe/Berlin");
        assert_eq!(config.retention_days, 180);
        // Unspecified sections fall back to defaults
        assert_eq!(config.schedule.one_hour_hour, 14);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_schedule_weekday_parse() {
        let config = FcBotConfig::default();
        assert_eq!(config.schedule.weekday().unwrap(), Weekday::Thu);

        let bad = ScheduleConfig {
            weekday: "someday".into(),
            ..Default::default()
        };
        assert!(bad.weekday().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_timezone() {
        let config = FcBotConfig {
            timezone: "Mars/Olympus_Mons".into(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTimezone(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_hour() {
        let config = FcBotConfig {
            schedule: ScheduleConfig {
                morning_hour: 24,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidHour(24))));
    }

    #[test]
    fn test_storage_path_override() {
        let config = FcBotConfig {
            storage_path: Some(PathBuf::from("/tmp/fc-test.db")),
            ..Default::default()
        };
        assert_eq!(
            config.storage_path().unwrap(),
            PathBuf::from("/tmp/fc-test.db")
        );
    }
}
