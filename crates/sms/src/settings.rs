//! Settings loading for the backend connection
//!
//! Settings are loaded from (in order of priority):
//! 1. `settings.json` in the config directory
//! 2. Environment variables (`SMS_INBOX_URL`, `SMS_INBOX_API_KEY`, ...)

use anyhow::{Context, Result, bail};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::phone::DEFAULT_COUNTRY_CODE;

/// Settings filename in the config directory
const SETTINGS_FILE: &str = "settings.json";

const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Connection and locale settings for the SMS backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Site root, e.g. `https://erp.example.com`
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_secret: Option<String>,
    /// Prefix applied to local numbers when composing
    #[serde(default = "default_country_code")]
    pub default_country_code: String,
    /// UTC offset of the backend's naive timestamps, e.g. `+10:00`
    #[serde(default = "default_utc_offset")]
    pub server_utc_offset: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_country_code() -> String {
    DEFAULT_COUNTRY_CODE.to_string()
}

fn default_utc_offset() -> String {
    "+00:00".to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Settings {
    /// Settings pointing at `base_url` with every other field defaulted
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            api_secret: None,
            default_country_code: default_country_code(),
            server_utc_offset: default_utc_offset(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Load settings from the config directory, falling back to the environment
    pub fn load() -> Result<Self> {
        let settings = if config::config_exists(SETTINGS_FILE) {
            config::load_json::<Settings>(SETTINGS_FILE)?
        } else {
            Self::from_env()?
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let settings: Settings = config::load_json_file(path)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parse settings from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Settings =
            serde_json::from_str(json).context("Failed to parse settings JSON")?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from environment variables
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("SMS_INBOX_URL")
            .context("SMS_INBOX_URL environment variable not set")?;
        let mut settings = Self::new(base_url);
        settings.api_key = std::env::var("SMS_INBOX_API_KEY").ok();
        settings.api_secret = std::env::var("SMS_INBOX_API_SECRET").ok();
        if let Ok(code) = std::env::var("SMS_INBOX_COUNTRY_CODE") {
            settings.default_country_code = code;
        }
        if let Ok(offset) = std::env::var("SMS_INBOX_UTC_OFFSET") {
            settings.server_utc_offset = offset;
        }
        Ok(settings)
    }

    /// Check that the settings describe a usable backend
    pub fn validate(&self) -> Result<()> {
        self.url()?;
        self.server_offset()?;
        match (self.api_key.as_deref(), self.api_secret.as_deref()) {
            (Some(_), None) | (None, Some(_)) => {
                bail!("api_key and api_secret must be configured together")
            }
            _ => Ok(()),
        }
    }

    /// Parsed site root
    pub fn url(&self) -> Result<Url> {
        let url = Url::parse(self.base_url.trim())
            .with_context(|| format!("Invalid base_url: {:?}", self.base_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("base_url must be http or https, got {}", url.scheme());
        }
        Ok(url)
    }

    /// Parsed server offset
    pub fn server_offset(&self) -> Result<FixedOffset> {
        parse_utc_offset(&self.server_utc_offset)
            .with_context(|| format!("Invalid server_utc_offset: {:?}", self.server_utc_offset))
    }

    /// `token key:secret` header value, when both halves are set
    pub fn auth_header(&self) -> Option<String> {
        match (self.api_key.as_deref(), self.api_secret.as_deref()) {
            (Some(key), Some(secret)) => Some(format!("token {key}:{secret}")),
            _ => None,
        }
    }

    /// Default settings file path (~/.config/sms-inbox/settings.json)
    pub fn default_settings_path() -> Option<PathBuf> {
        config::config_path(SETTINGS_FILE)
    }
}

/// Parse `+HH:MM`, `-HH:MM`, `+HHMM`, or `Z`
pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") || raw.is_empty() {
        return FixedOffset::east_opt(0).context("zero offset");
    }

    let (sign, rest) = match raw.as_bytes().first() {
        Some(b'+') => (1, &raw[1..]),
        Some(b'-') => (-1, &raw[1..]),
        _ => bail!("offset must start with + or -"),
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        bail!("offset must look like +HH:MM");
    }
    let hours: i32 = digits[..2].parse()?;
    let minutes: i32 = digits[2..].parse()?;
    if hours > 23 || minutes > 59 {
        bail!("offset out of range");
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).context("offset out of range")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_settings() {
        let settings = Settings::from_json(r#"{ "base_url": "https://erp.example.com" }"#).unwrap();
        assert_eq!(settings.default_country_code, "+61");
        assert_eq!(settings.timeout_secs, 15);
        assert!(settings.auth_header().is_none());
        assert_eq!(settings.server_offset().unwrap().local_minus_utc(), 0);
    }

    #[test]
    fn test_parse_full_settings() {
        let json = r#"{
            "base_url": "https://erp.example.com",
            "api_key": "abc",
            "api_secret": "xyz",
            "default_country_code": "+64",
            "server_utc_offset": "+10:00",
            "timeout_secs": 5
        }"#;
        let settings = Settings::from_json(json).unwrap();
        assert_eq!(settings.auth_header().as_deref(), Some("token abc:xyz"));
        assert_eq!(settings.server_offset().unwrap().local_minus_utc(), 36000);
    }

    #[test]
    fn test_half_configured_token_rejected() {
        let json = r#"{ "base_url": "https://erp.example.com", "api_key": "abc" }"#;
        assert!(Settings::from_json(json).is_err());
    }

    #[test]
    fn test_bad_url_rejected() {
        assert!(Settings::from_json(r#"{ "base_url": "not a url" }"#).is_err());
        assert!(Settings::from_json(r#"{ "base_url": "ftp://erp.example.com" }"#).is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "base_url": "http://localhost:8000" }"#).unwrap();
        let settings = Settings::from_file(&path).unwrap();
        assert_eq!(settings.url().unwrap().port(), Some(8000));
    }

    #[test]
    fn test_parse_utc_offset() {
        assert_eq!(parse_utc_offset("+05:30").unwrap().local_minus_utc(), 19800);
        assert_eq!(parse_utc_offset("-0800").unwrap().local_minus_utc(), -28800);
        assert_eq!(parse_utc_offset("Z").unwrap().local_minus_utc(), 0);
        assert!(parse_utc_offset("10:00").is_err());
        assert!(parse_utc_offset("+25:00").is_err());
    }
}
