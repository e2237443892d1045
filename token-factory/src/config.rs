use std::collections::HashMap;
use std::env;
use std::fmt;

use chrono::Duration;
use tracing::warn;

use crate::error::{FactoryError, FactoryResult};

/// Fallback key for signing and verifying tokens.
pub const SIGNING_KEY: &str = "TOKEN_SIGNING_KEY";
/// Fallback validity of created tokens, in seconds.
pub const TOKEN_VALIDITY: &str = "TOKEN_VALIDITY";
/// The application's general secret, used to seed [`SIGNING_KEY`].
pub const SECRET_KEY: &str = "SECRET_KEY";

/// A typed configuration value.
#[derive(Clone, PartialEq)]
pub enum ConfigValue {
    Str(String),
    Int(i64),
    Duration(Duration),
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::Str(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::Str(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        ConfigValue::Int(value)
    }
}

impl From<Duration> for ConfigValue {
    fn from(value: Duration) -> Self {
        ConfigValue::Duration(value)
    }
}

impl fmt::Debug for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Values may be secrets; only the shape is printed.
        match self {
            ConfigValue::Str(_) => f.write_str("Str(..)"),
            ConfigValue::Int(_) => f.write_str("Int(..)"),
            ConfigValue::Duration(_) => f.write_str("Duration(..)"),
        }
    }
}

/// Read access to an application's configuration.
pub trait ConfigProvider: Send + Sync {
    fn get(&self, key: &str) -> Option<ConfigValue>;

    /// String view of a value; integers are rendered, durations have none.
    fn get_str(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            ConfigValue::Str(value) => Some(value),
            ConfigValue::Int(value) => Some(value.to_string()),
            ConfigValue::Duration(_) => None,
        }
    }
}

/// In-memory configuration store.
#[derive(Clone, Default)]
pub struct AppConfig {
    values: HashMap<String, ConfigValue>,
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`AppConfig::set`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ConfigValue>) {
        self.values.insert(key.into(), value.into());
    }

    /// Set `key` only if it has no value yet. Returns whether it was set.
    pub fn set_default(&mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> bool {
        let key = key.into();
        if self.values.contains_key(&key) {
            return false;
        }
        self.values.insert(key, value.into());
        true
    }

    pub fn remove(&mut self, key: &str) -> Option<ConfigValue> {
        self.values.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Load the token settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load the token settings through `lookup`; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new();
        for key in [SIGNING_KEY, SECRET_KEY, TOKEN_VALIDITY] {
            if let Some(value) = lookup(key).and_then(|value| normalize_optional(&value)) {
                config.set(key, value);
            }
        }
        config
    }
}

impl ConfigProvider for AppConfig {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.values.get(key).cloned()
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys = self.values.keys().collect::<Vec<_>>();
        keys.sort();
        f.debug_struct("AppConfig").field("keys", &keys).finish()
    }
}

/// Interpret a configured validity.
///
/// Integers and integer strings are seconds. A value of any other shape is
/// ignored with a warning. Zero, negative and unrepresentable validities are
/// rejected.
pub(crate) fn parse_validity(value: ConfigValue) -> FactoryResult<Option<Duration>> {
    let validity = match value {
        ConfigValue::Duration(duration) => duration,
        ConfigValue::Int(seconds) => seconds_to_duration(seconds)?,
        ConfigValue::Str(raw) => match raw.trim().parse::<i64>() {
            Ok(seconds) => seconds_to_duration(seconds)?,
            Err(_) => {
                warn!(
                    key = TOKEN_VALIDITY,
                    "{TOKEN_VALIDITY} must be an integer, a string castable to an integer, or a duration; ignoring it"
                );
                return Ok(None);
            }
        },
    };

    if validity <= Duration::zero() {
        return Err(FactoryError::InvalidValidity {
            key: TOKEN_VALIDITY,
            seconds: validity.num_seconds(),
        });
    }
    Ok(Some(validity))
}

fn seconds_to_duration(seconds: i64) -> FactoryResult<Duration> {
    Duration::try_seconds(seconds).ok_or(FactoryError::InvalidValidity {
        key: TOKEN_VALIDITY,
        seconds,
    })
}

fn normalize_optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validity_accepts_seconds_strings_and_durations() {
        assert_eq!(
            parse_validity(ConfigValue::Int(900)).expect("int"),
            Some(Duration::seconds(900))
        );
        assert_eq!(
            parse_validity(ConfigValue::from(" 900 ")).expect("string"),
            Some(Duration::seconds(900))
        );
        assert_eq!(
            parse_validity(ConfigValue::Duration(Duration::minutes(15))).expect("duration"),
            Some(Duration::seconds(900))
        );
    }

    #[test]
    fn unparsable_validity_is_ignored() {
        assert_eq!(parse_validity(ConfigValue::from("15 minutes")).expect("ignored"), None);
    }

    #[test]
    fn non_positive_validity_is_rejected() {
        for value in [
            ConfigValue::Int(0),
            ConfigValue::from("-5"),
            ConfigValue::Duration(Duration::seconds(-1)),
        ] {
            let err = parse_validity(value).expect_err("should reject");
            assert!(matches!(err, FactoryError::InvalidValidity { .. }));
        }
    }

    #[test]
    fn out_of_range_seconds_are_rejected() {
        for value in [ConfigValue::from("9300000000000000"), ConfigValue::Int(i64::MAX)] {
            let err = parse_validity(value).expect_err("too large");
            assert!(matches!(err, FactoryError::InvalidValidity { .. }));
        }
    }

    #[test]
    fn removed_value_is_returned() {
        let mut config = AppConfig::new().with(TOKEN_VALIDITY, 900_i64);
        assert_eq!(config.remove(TOKEN_VALIDITY), Some(ConfigValue::Int(900)));
        assert!(!config.contains(TOKEN_VALIDITY));
        assert_eq!(config.remove(TOKEN_VALIDITY), None);
    }

    #[test]
    fn from_lookup_skips_blank_values() {
        let config = AppConfig::from_lookup(|key| match key {
            SIGNING_KEY => Some("  ".to_string()),
            SECRET_KEY => Some(" s3cret ".to_string()),
            TOKEN_VALIDITY => Some("900".to_string()),
            _ => None,
        });
        assert!(!config.contains(SIGNING_KEY));
        assert_eq!(config.get_str(SECRET_KEY).as_deref(), Some("s3cret"));
        assert_eq!(config.get_str(TOKEN_VALIDITY).as_deref(), Some("900"));
    }

    #[test]
    fn set_default_keeps_existing_value() {
        let mut config = AppConfig::new().with(SIGNING_KEY, "first");
        assert!(!config.set_default(SIGNING_KEY, "second"));
        assert_eq!(config.get_str(SIGNING_KEY).as_deref(), Some("first"));
        assert!(config.set_default(TOKEN_VALIDITY, 60_i64));
    }

    #[test]
    fn debug_output_hides_values() {
        let config = AppConfig::new().with(SIGNING_KEY, "top-secret");
        let rendered = format!("{config:?}");
        assert!(rendered.contains(SIGNING_KEY));
        assert!(!rendered.contains("top-secret"));
    }
}
