use chrono::Duration;
use jsonwebtoken::Algorithm;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Declares the application-defined claims of one kind of token.
///
/// Implementors are plain serde structs. `FIELDS` lists the serialized names
/// of every declared field; fields in `OPTIONAL` may be `None`/null, every
/// other declared field must carry a value when the token is created and when
/// it is verified.
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct AccountValidation {
///     user_id: Option<u64>,
/// }
///
/// impl ClaimSet for AccountValidation {
///     const CLASS: &'static str = "AccountValidation";
///     const FIELDS: &'static [&'static str] = &["user_id"];
/// }
/// ```
pub trait ClaimSet: Serialize + DeserializeOwned {
    /// Marker written into the `cls` claim; a token only verifies as the
    /// claim set it was created with.
    const CLASS: &'static str;

    /// Serialized names of all declared fields.
    const FIELDS: &'static [&'static str];

    /// Declared fields that may be left empty.
    const OPTIONAL: &'static [&'static str] = &[];

    /// Algorithm used to sign and accepted when verifying.
    const ALGORITHM: Algorithm = Algorithm::HS256;

    /// Validity declared by the claim set itself. Takes precedence over any
    /// externally configured default.
    fn validity() -> Option<Duration> {
        None
    }

    /// Declared fields that must be present.
    fn required_fields() -> Vec<&'static str> {
        Self::FIELDS
            .iter()
            .copied()
            .filter(|field| !Self::OPTIONAL.contains(field))
            .collect()
    }
}
