use chrono::{DateTime, SubsecRound, Utc};
use jsonwebtoken::{decode, encode, Header, Validation};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{TokenError, TokenResult};
use crate::key::SigningKey;
use crate::registered::{RegisteredClaims, REGISTERED_CLAIMS};
use crate::schema::ClaimSet;

/// Claim carrying the [`ClaimSet::CLASS`] marker.
pub const CLASS_CLAIM: &str = "cls";

/// Expectations checked when verifying a token.
#[derive(Debug, Clone, Default)]
pub struct VerifyOptions {
    /// Required issuer (iss), if any.
    pub issuer: Option<String>,
    /// Accepted audiences (aud). A token with an audience claim only verifies
    /// when at least one of these is listed in it.
    pub audience: Vec<String>,
    /// Allowable clock skew in seconds when validating exp/nbf.
    pub leeway_seconds: u64,
}

impl VerifyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience.push(audience.into());
        self
    }

    pub fn with_leeway(mut self, seconds: u64) -> Self {
        self.leeway_seconds = seconds;
        self
    }
}

/// One token of claim set `C`: the declared claims, the registered claims and
/// the key used to sign or verify it.
#[derive(Debug, Clone)]
pub struct Token<C> {
    pub claims: C,
    pub registered: RegisteredClaims,
    key: Option<SigningKey>,
}

impl<C: ClaimSet> Token<C> {
    pub fn new(claims: C, key: Option<SigningKey>) -> Self {
        Self {
            claims,
            registered: RegisteredClaims::default(),
            key,
        }
    }

    pub fn key(&self) -> Option<&SigningKey> {
        self.key.as_ref()
    }

    pub fn into_claims(self) -> C {
        self.claims
    }

    /// Sign the current state of the token.
    ///
    /// `issued_at` defaults to now. Without an explicit expiration date the
    /// claim set's own [`ClaimSet::validity`] is applied; if that is unset too
    /// the token does not expire. Empty optional claims are left out.
    pub fn create(&mut self, issued_at: Option<DateTime<Utc>>) -> TokenResult<String> {
        let key = self.key.as_ref().ok_or(TokenError::MissingKey)?;
        let encoding_key = key.encoding_key(C::ALGORITHM)?;
        let mut payload = self.declared_claims()?;

        let issued_at = issued_at.unwrap_or_else(Utc::now).trunc_subsecs(0);
        self.registered.issued_at = Some(issued_at);
        self.registered.expiration_date = match self.registered.expiration_date {
            Some(exp) => Some(exp.trunc_subsecs(0)),
            None => C::validity()
                .map(|validity| {
                    issued_at
                        .checked_add_signed(validity)
                        .ok_or(TokenError::ExpirationOutOfRange)
                })
                .transpose()?,
        };
        self.registered.write_into(&mut payload);
        payload.insert(CLASS_CLAIM.into(), Value::from(C::CLASS));

        let token = encode(&Header::new(C::ALGORITHM), &payload, &encoding_key)?;
        debug!(
            class = C::CLASS,
            expires = ?self.registered.expiration_date,
            "created token"
        );
        Ok(token)
    }

    /// Decode and validate `token` as a token of claim set `C`.
    pub fn verify(
        token: &str,
        key: Option<&SigningKey>,
        options: &VerifyOptions,
    ) -> TokenResult<Self> {
        let key = key.ok_or(TokenError::MissingKey)?;
        let decoding_key = key.decoding_key(C::ALGORITHM)?;

        let mut validation = Validation::new(C::ALGORITHM);
        validation.required_spec_claims.clear();
        validation.validate_aud = false;
        validation.validate_nbf = true;
        validation.leeway = options.leeway_seconds;

        let token_data = decode::<Map<String, Value>>(token, &decoding_key, &validation)?;
        let mut payload = token_data.claims;

        match payload.remove(CLASS_CLAIM) {
            None | Some(Value::Null) => return Err(TokenError::UnspecifiedClass),
            Some(Value::String(class)) if class == C::CLASS => {}
            Some(other) => {
                return Err(TokenError::InvalidClass {
                    expected: C::CLASS,
                    actual: other
                        .as_str()
                        .map(str::to_owned)
                        .unwrap_or_else(|| other.to_string()),
                })
            }
        }

        let registered = RegisteredClaims::take_from(&mut payload)?;
        check_issuer(&registered, options)?;
        check_audience(&registered, options)?;

        let unexpected: Vec<&str> = payload
            .keys()
            .map(String::as_str)
            .filter(|claim| !C::FIELDS.contains(claim))
            .collect();
        if !unexpected.is_empty() {
            return Err(TokenError::InvalidClaimSet(format!(
                "unexpected claims: {}",
                unexpected.join(", ")
            )));
        }

        let missing: Vec<&str> = C::required_fields()
            .into_iter()
            .filter(|field| payload.get(*field).map_or(true, Value::is_null))
            .collect();
        if !missing.is_empty() {
            return Err(TokenError::InvalidClaimSet(format!(
                "missing claims: {}",
                missing.join(", ")
            )));
        }

        let claims: C = serde_json::from_value(Value::Object(payload))
            .map_err(|err| TokenError::InvalidClaimSet(err.to_string()))?;
        debug!(class = C::CLASS, "verified token");

        Ok(Self {
            claims,
            registered,
            key: Some(key.clone()),
        })
    }

    fn declared_claims(&self) -> TokenResult<Map<String, Value>> {
        let value = serde_json::to_value(&self.claims)
            .map_err(|err| TokenError::Serialization(err.to_string()))?;
        let Value::Object(mut map) = value else {
            return Err(TokenError::Serialization(format!(
                "claim set '{}' must serialize to a JSON object",
                C::CLASS
            )));
        };

        if let Some(shadowed) = map
            .keys()
            .find(|name| name.as_str() == CLASS_CLAIM || REGISTERED_CLAIMS.contains(&name.as_str()))
        {
            return Err(TokenError::Serialization(format!(
                "declared claim '{shadowed}' shadows a registered claim"
            )));
        }

        map.retain(|_, value| !value.is_null());
        let missing: Vec<String> = C::required_fields()
            .into_iter()
            .filter(|field| !map.contains_key(*field))
            .map(String::from)
            .collect();
        if !missing.is_empty() {
            return Err(TokenError::MissingRequiredClaims(missing));
        }

        Ok(map)
    }
}

fn check_issuer(registered: &RegisteredClaims, options: &VerifyOptions) -> TokenResult<()> {
    match &options.issuer {
        Some(expected) if registered.issuer.as_deref() != Some(expected.as_str()) => {
            Err(TokenError::InvalidIssuer)
        }
        _ => Ok(()),
    }
}

fn check_audience(registered: &RegisteredClaims, options: &VerifyOptions) -> TokenResult<()> {
    match (&registered.audience, options.audience.is_empty()) {
        (None, true) => Ok(()),
        (None, false) | (Some(_), true) => Err(TokenError::InvalidAudience),
        (Some(audience), false) => {
            if options.audience.iter().any(|item| audience.contains(item)) {
                Ok(())
            } else {
                Err(TokenError::InvalidAudience)
            }
        }
    }
}
