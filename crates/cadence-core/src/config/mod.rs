use anyhow::Result;
use config::Config;
use serde::Deserialize;

use crate::error::{CoreError, CoreResult};

/// Default cap on the occurrences collected by one eager expansion.
pub const DEFAULT_MAX_INSTANCES: usize = 10_000;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub recurrence: RecurrenceConfig,
}

/// How exception instants are matched against inclusion candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExceptionMatch {
    /// The candidate and the exception are the same absolute instant.
    #[default]
    Exact,
    /// The candidate falls on the same calendar day as the exception,
    /// evaluated in the session timezone.
    LocalDay,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecurrenceConfig {
    /// Cap on occurrences returned by an eager expansion. Lazy sessions are
    /// bounded by their end instead.
    pub max_instances: usize,
    pub exception_match: ExceptionMatch,
    /// TZID used when an expansion does not name a session timezone.
    pub default_timezone: String,
}

impl Default for RecurrenceConfig {
    fn default() -> Self {
        Self {
            max_instances: DEFAULT_MAX_INSTANCES,
            exception_match: ExceptionMatch::Exact,
            default_timezone: "UTC".to_string(),
        }
    }
}

impl RecurrenceConfig {
    /// ## Summary
    /// Checks values that deserialize fine but cannot drive an expansion.
    ///
    /// ## Errors
    /// Returns `CoreError::ConfigError` if `max_instances` is zero or the
    /// default timezone is blank.
    pub fn validate(&self) -> CoreResult<()> {
        if self.max_instances == 0 {
            return Err(CoreError::ConfigError(
                "recurrence.max_instances must be at least 1".to_string(),
            ));
        }
        if self.default_timezone.trim().is_empty() {
            return Err(CoreError::ConfigError(
                "recurrence.default_timezone must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Settings {
    /// ## Summary
    /// Loads configuration from environment variables and an optional `config.toml`.
    /// Environment variables (`CADENCE_RECURRENCE__MAX_INSTANCES`, ...) take
    /// precedence over file values.
    ///
    /// ## Errors
    /// Returns an error if building the configuration, deserializing it, or
    /// validating it fails.
    pub fn load() -> Result<Self> {
        let settings = Config::builder()
            .set_default(
                "recurrence.max_instances",
                i64::try_from(DEFAULT_MAX_INSTANCES)?,
            )?
            .set_default("recurrence.exception_match", "exact")?
            .set_default("recurrence.default_timezone", "UTC")?
            // TOML file
            .add_source(config::File::with_name("config.toml").required(false))
            // Env
            .add_source(
                config::Environment::with_prefix("CADENCE")
                    .prefix_separator("_")
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<Settings>()?;

        settings.recurrence.validate()?;
        tracing::debug!(
            max_instances = settings.recurrence.max_instances,
            exception_match = ?settings.recurrence.exception_match,
            default_timezone = %settings.recurrence.default_timezone,
            "Recurrence settings loaded"
        );

        Ok(settings)
    }
}

/// ## Summary
/// Loads configuration from environment variables and `.env` file.
///
/// ## Errors
/// Returns an error if loading or deserializing the configuration fails.
pub fn load_config() -> Result<Settings> {
    dotenvy::dotenv().ok();

    Settings::load()
}
