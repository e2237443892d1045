use jsonwebtoken::errors::ErrorKind;
use thiserror::Error;

pub type TokenResult<T> = Result<T, TokenError>;

/// Failures raised while creating or verifying a token.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("no key available for signing or verifying the token")]
    MissingKey,
    #[error("key is incompatible with the token algorithm: {0}")]
    IncompatibleKey(String),
    #[error("required claims are missing: {}", .0.join(", "))]
    MissingRequiredClaims(Vec<String>),
    #[error("failed to serialize claim set: {0}")]
    Serialization(String),
    #[error("expiration date is out of range")]
    ExpirationOutOfRange,
    #[error("token has expired")]
    Expired,
    #[error("token is not yet valid")]
    Immature,
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token audience does not match")]
    InvalidAudience,
    #[error("token issuer does not match")]
    InvalidIssuer,
    #[error("issued-at claim '{0}' is not an integer")]
    InvalidIssuedAt(String),
    #[error("claim set does not match the declared claims: {0}")]
    InvalidClaimSet(String),
    #[error("token was created for class '{actual}', expected '{expected}'")]
    InvalidClass {
        expected: &'static str,
        actual: String,
    },
    #[error("token does not carry a class claim")]
    UnspecifiedClass,
    #[error("token algorithm is not supported")]
    UnsupportedAlgorithm,
    #[error("failed to decode token: {0}")]
    Verification(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(value: jsonwebtoken::errors::Error) -> Self {
        match value.kind() {
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::ImmatureSignature => Self::Immature,
            ErrorKind::InvalidAudience => Self::InvalidAudience,
            ErrorKind::InvalidIssuer => Self::InvalidIssuer,
            ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidAlgorithmName
            | ErrorKind::MissingAlgorithm => Self::UnsupportedAlgorithm,
            ErrorKind::InvalidKeyFormat
            | ErrorKind::InvalidEcdsaKey
            | ErrorKind::InvalidRsaKey(_) => Self::IncompatibleKey(value.to_string()),
            _ => Self::Verification(value.to_string()),
        }
    }
}

impl TokenError {
    /// Short machine-readable code for logs and API responses.
    pub fn code(&self) -> &'static str {
        match self {
            TokenError::MissingKey => "missing_key",
            TokenError::IncompatibleKey(_) => "incompatible_key",
            TokenError::MissingRequiredClaims(_) => "missing_required_claims",
            TokenError::Serialization(_) => "serialization",
            TokenError::ExpirationOutOfRange => "expiration_out_of_range",
            TokenError::Expired => "expired",
            TokenError::Immature => "immature",
            TokenError::InvalidSignature => "invalid_signature",
            TokenError::InvalidAudience => "invalid_audience",
            TokenError::InvalidIssuer => "invalid_issuer",
            TokenError::InvalidIssuedAt(_) => "invalid_issued_at",
            TokenError::InvalidClaimSet(_) => "invalid_claim_set",
            TokenError::InvalidClass { .. } => "invalid_class",
            TokenError::UnspecifiedClass => "unspecified_class",
            TokenError::UnsupportedAlgorithm => "unsupported_algorithm",
            TokenError::Verification(_) => "verification",
        }
    }

    /// True for failures of the creation path (key or claim problems on our side).
    pub fn is_creation_error(&self) -> bool {
        matches!(
            self,
            TokenError::MissingKey
                | TokenError::IncompatibleKey(_)
                | TokenError::MissingRequiredClaims(_)
                | TokenError::Serialization(_)
                | TokenError::ExpirationOutOfRange
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_codec_kinds_to_typed_errors() {
        let expired: TokenError = jsonwebtoken::errors::Error::from(ErrorKind::ExpiredSignature).into();
        assert!(matches!(expired, TokenError::Expired));

        let forged: TokenError = jsonwebtoken::errors::Error::from(ErrorKind::InvalidSignature).into();
        assert!(matches!(forged, TokenError::InvalidSignature));

        let alg: TokenError = jsonwebtoken::errors::Error::from(ErrorKind::InvalidAlgorithm).into();
        assert!(matches!(alg, TokenError::UnsupportedAlgorithm));

        let garbage: TokenError = jsonwebtoken::errors::Error::from(ErrorKind::InvalidToken).into();
        assert_eq!(garbage.code(), "verification");
    }

    #[test]
    fn missing_claims_are_listed() {
        let err = TokenError::MissingRequiredClaims(vec!["user_id".into(), "email".into()]);
        assert_eq!(err.to_string(), "required claims are missing: user_id, email");
        assert!(err.is_creation_error());
    }
}
