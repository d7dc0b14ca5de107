use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;
use thiserror::Error;

use crate::kernel::intent::{parse_order, Intent, IntentClassifier, DEFAULT_ORDER};
use crate::kernel::time::DEFAULT_TIMEZONE;

pub const DEFAULT_DB_PATH: &str = "/var/data/data.sqlite";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AgendaConfig {
    pub telegram_token: Option<String>,
    pub db_path: PathBuf,
    pub timezone: Tz,
    pub reminder_lead: Duration,
    pub intent_order: Vec<Intent>,
    /// Enables the "message has a date -> add" fallback rule.
    pub implicit_add: bool,
    pub poll_timeout_secs: u64,
}

impl Default for AgendaConfig {
    fn default() -> Self {
        Self {
            telegram_token: None,
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            timezone: DEFAULT_TIMEZONE,
            reminder_lead: Duration::from_secs(10 * 60),
            intent_order: DEFAULT_ORDER.to_vec(),
            implicit_add: false,
            poll_timeout_secs: 30,
        }
    }
}

impl AgendaConfig {
    /// `.env` first, then the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        config.telegram_token = get("TELEGRAM_BOT_TOKEN");
        if let Some(path) = get("AGENDA_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }
        if let Some(name) = get("AGENDA_TIMEZONE") {
            config.timezone = Tz::from_str(&name).map_err(|_| invalid("AGENDA_TIMEZONE", &name))?;
        }
        if let Some(minutes) = get("AGENDA_REMINDER_LEAD_MINUTES") {
            let secs = minutes
                .parse::<u64>()
                .ok()
                .and_then(|m| m.checked_mul(60))
                .ok_or_else(|| invalid("AGENDA_REMINDER_LEAD_MINUTES", &minutes))?;
            config.reminder_lead = Duration::from_secs(secs);
        }
        if let Some(order) = get("AGENDA_INTENT_ORDER") {
            config.intent_order = parse_order(&order).map_err(|_| invalid("AGENDA_INTENT_ORDER", &order))?;
        }
        if let Some(flag) = get("AGENDA_IMPLICIT_ADD") {
            config.implicit_add = parse_bool(&flag).ok_or_else(|| invalid("AGENDA_IMPLICIT_ADD", &flag))?;
        }
        if let Some(secs) = get("TELEGRAM_POLL_TIMEOUT_SECS") {
            config.poll_timeout_secs = secs.parse().map_err(|_| invalid("TELEGRAM_POLL_TIMEOUT_SECS", &secs))?;
        }
        Ok(config)
    }

    /// The bot cannot start without it.
    pub fn require_token(&self) -> Result<&str, ConfigError> {
        self.telegram_token
            .as_deref()
            .ok_or(ConfigError::Missing("TELEGRAM_BOT_TOKEN"))
    }

    pub fn classifier(&self) -> IntentClassifier {
        IntentClassifier::with_order(&self.intent_order, self.implicit_add)
    }
}

fn invalid(key: &'static str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
