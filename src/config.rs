use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;

use crate::auth::ApiCredentials;
use crate::rate_gate;

pub const DEFAULT_API_BASE_URL: &str = "https://api.enphaseenergy.com/api/v2";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),
    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub api_base_url: String,
    pub system_id: String,
    pub credentials: ApiCredentials,
    pub timezone: Tz,
    pub min_call_interval_secs: u64,
    pub fetch_max_retries: usize,
    pub generation_schema: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let timezone = optional("SYSTEM_TIMEZONE")
            .unwrap_or_else(|| "UTC".to_string())
            .parse::<Tz>()
            .map_err(|e| ConfigError::Invalid {
                name: "SYSTEM_TIMEZONE",
                reason: e.to_string(),
            })?;

        let min_call_interval_secs = parsed(
            "MIN_CALL_INTERVAL_SECS",
            rate_gate::DEFAULT_MIN_INTERVAL.as_secs(),
        )?;

        let config = Config {
            database_url: required("DATABASE_URL")?,
            api_base_url: optional("ENPHASE_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            system_id: required("ENPHASE_SYSTEM_ID")?,
            credentials: ApiCredentials::new(
                required("ENPHASE_API_KEY")?,
                required("ENPHASE_USER_ID")?,
            ),
            timezone,
            min_call_interval_secs,
            fetch_max_retries: parsed("FETCH_MAX_RETRIES", 3)?,
            generation_schema: optional("GENERATION_SCHEMA")
                .unwrap_or_else(|| "energy".to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Rejects a call spacing that would let two calls per day exceed the
    /// provider's per-minute ceiling.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let floor = rate_gate::provider_floor();
        if self.min_call_interval() < floor {
            return Err(ConfigError::Invalid {
                name: "MIN_CALL_INTERVAL_SECS",
                reason: format!(
                    "{}s is below the {}s spacing the provider rate limit requires",
                    self.min_call_interval_secs,
                    floor.as_secs()
                ),
            });
        }
        Ok(())
    }

    pub fn min_call_interval(&self) -> Duration {
        Duration::from_secs(self.min_call_interval_secs)
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// `default` when unset or blank; a set value must parse.
fn parsed<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match optional(name) {
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: format!("{value:?}: {e}"),
        }),
        None => Ok(default),
    }
}
