use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{TokenError, TokenResult};

/// Names of the registered claims (RFC 7519, section 4.1).
pub const REGISTERED_CLAIMS: &[&str] = &["aud", "exp", "iat", "iss", "jti", "nbf", "sub"];

/// Audience claim, which may be a single string or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Many(Vec<String>),
}

impl Audience {
    pub fn contains(&self, candidate: &str) -> bool {
        match self {
            Audience::Single(item) => item == candidate,
            Audience::Many(items) => items.iter().any(|item| item == candidate),
        }
    }
}

impl From<&str> for Audience {
    fn from(value: &str) -> Self {
        Audience::Single(value.to_string())
    }
}

impl From<Vec<String>> for Audience {
    fn from(value: Vec<String>) -> Self {
        Audience::Many(value)
    }
}

/// The registered claims every token may carry next to its declared fields.
///
/// Timestamps are whole seconds; sub-second precision is dropped when a token
/// is created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisteredClaims {
    pub audience: Option<Audience>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub issued_at: Option<DateTime<Utc>>,
    pub issuer: Option<String>,
    pub jwt_id: Option<String>,
    pub not_before: Option<DateTime<Utc>>,
    pub subject: Option<String>,
}

impl RegisteredClaims {
    /// Write the claims that are set into a JSON claim map.
    pub(crate) fn write_into(&self, map: &mut Map<String, Value>) {
        if let Some(audience) = &self.audience {
            let value = match audience {
                Audience::Single(item) => Value::from(item.clone()),
                Audience::Many(items) => Value::from(items.clone()),
            };
            map.insert("aud".into(), value);
        }
        if let Some(exp) = self.expiration_date {
            map.insert("exp".into(), Value::from(exp.timestamp()));
        }
        if let Some(iat) = self.issued_at {
            map.insert("iat".into(), Value::from(iat.timestamp()));
        }
        if let Some(iss) = &self.issuer {
            map.insert("iss".into(), Value::from(iss.clone()));
        }
        if let Some(jti) = &self.jwt_id {
            map.insert("jti".into(), Value::from(jti.clone()));
        }
        if let Some(nbf) = self.not_before {
            map.insert("nbf".into(), Value::from(nbf.timestamp()));
        }
        if let Some(sub) = &self.subject {
            map.insert("sub".into(), Value::from(sub.clone()));
        }
    }

    /// Remove the registered claims from a decoded claim map.
    pub(crate) fn take_from(map: &mut Map<String, Value>) -> TokenResult<Self> {
        let audience = match map.remove("aud") {
            Some(Value::Null) | None => None,
            Some(value) => Some(
                serde_json::from_value::<Audience>(value)
                    .map_err(|_| TokenError::InvalidAudience)?,
            ),
        };

        let issued_at = match map.remove("iat") {
            Some(Value::Null) | None => None,
            Some(value) => {
                let seconds = value
                    .as_i64()
                    .ok_or_else(|| TokenError::InvalidIssuedAt(value.to_string()))?;
                Some(timestamp("iat", seconds)?)
            }
        };

        Ok(Self {
            audience,
            expiration_date: take_timestamp(map, "exp")?,
            issued_at,
            issuer: take_string(map, "iss")?,
            jwt_id: take_string(map, "jti")?,
            not_before: take_timestamp(map, "nbf")?,
            subject: take_string(map, "sub")?,
        })
    }
}

fn timestamp(claim: &str, seconds: i64) -> TokenResult<DateTime<Utc>> {
    Utc.timestamp_opt(seconds, 0)
        .single()
        .ok_or_else(|| TokenError::InvalidClaimSet(format!("claim '{claim}' is out of range")))
}

fn take_timestamp(map: &mut Map<String, Value>, claim: &str) -> TokenResult<Option<DateTime<Utc>>> {
    match map.remove(claim) {
        Some(Value::Null) | None => Ok(None),
        Some(value) => {
            let seconds = value.as_i64().ok_or_else(|| {
                TokenError::InvalidClaimSet(format!("claim '{claim}' is not an integer"))
            })?;
            timestamp(claim, seconds).map(Some)
        }
    }
}

fn take_string(map: &mut Map<String, Value>, claim: &str) -> TokenResult<Option<String>> {
    match map.remove(claim) {
        Some(Value::Null) | None => Ok(None),
        Some(Value::String(value)) => Ok(Some(value)),
        Some(other) => Err(TokenError::InvalidClaimSet(format!(
            "claim '{claim}' must be a string, got {other}"
        ))),
    }
}
