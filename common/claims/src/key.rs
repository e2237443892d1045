use std::fmt;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};

use crate::error::{TokenError, TokenResult};

/// Opaque key material: an HMAC secret, or a PEM document for the asymmetric
/// algorithms (private key to sign, public key to verify).
#[derive(Clone, PartialEq, Eq)]
pub struct SigningKey(Vec<u8>);

impl SigningKey {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn encoding_key(&self, algorithm: Algorithm) -> TokenResult<EncodingKey> {
        let key = match algorithm {
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
                return Ok(EncodingKey::from_secret(&self.0))
            }
            Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512 => EncodingKey::from_rsa_pem(&self.0),
            Algorithm::ES256 | Algorithm::ES384 => EncodingKey::from_ec_pem(&self.0),
            Algorithm::EdDSA => EncodingKey::from_ed_pem(&self.0),
        };
        key.map_err(|err| TokenError::IncompatibleKey(err.to_string()))
    }

    pub(crate) fn decoding_key(&self, algorithm: Algorithm) -> TokenResult<DecodingKey> {
        let key = match algorithm {
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
                return Ok(DecodingKey::from_secret(&self.0))
            }
            Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512 => DecodingKey::from_rsa_pem(&self.0),
            Algorithm::ES256 | Algorithm::ES384 => DecodingKey::from_ec_pem(&self.0),
            Algorithm::EdDSA => DecodingKey::from_ed_pem(&self.0),
        };
        key.map_err(|err| TokenError::IncompatibleKey(err.to_string()))
    }
}

impl From<&str> for SigningKey {
    fn from(value: &str) -> Self {
        Self::new(value.as_bytes())
    }
}

impl From<String> for SigningKey {
    fn from(value: String) -> Self {
        Self::new(value.into_bytes())
    }
}

impl From<&[u8]> for SigningKey {
    fn from(value: &[u8]) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningKey(<{} bytes redacted>)", self.0.len())
    }
}
