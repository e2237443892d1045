use chrono::{DateTime, Duration, SubsecRound, Utc};
use common_claims::{ClaimSet, RegisteredClaims, SigningKey, Token, VerifyOptions};
use tracing::{debug, warn};

use crate::config::{parse_validity, ConfigProvider, SECRET_KEY, SIGNING_KEY, TOKEN_VALIDITY};
use crate::context::{Application, CurrentApp};
use crate::error::{FactoryError, FactoryResult};

/// Creates and verifies tokens with the key and validity configured for the
/// application.
///
/// A factory built with [`TokenFactory::with_application`] always reads that
/// application's configuration. An unbound factory reads the configuration of
/// the [`CurrentApp`] passed to each call.
#[derive(Clone, Debug, Default)]
pub struct TokenFactory {
    application: Option<Application>,
}

impl TokenFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_application(application: Application) -> Self {
        let factory = Self {
            application: Some(application),
        };
        if let Some(application) = &factory.application {
            factory.init_app(application);
        }
        factory
    }

    pub fn application(&self) -> Option<&Application> {
        self.application.as_ref()
    }

    /// Prepare an application's configuration for token use.
    ///
    /// Seeds the signing key from the application's secret key when no
    /// signing key is configured, and warns if neither is set.
    pub fn init_app(&self, application: &Application) {
        let seeded = application.configure(|config| match config.get(SECRET_KEY) {
            Some(secret) => config.set_default(SIGNING_KEY, secret),
            None => false,
        });
        if seeded {
            debug!(app = application.name(), "seeded {SIGNING_KEY} from {SECRET_KEY}");
        }

        if non_empty(application.get_str(SIGNING_KEY)).is_none() {
            warn!(
                app = application.name(),
                "no key set for signing tokens; set {SECRET_KEY} or {SIGNING_KEY}"
            );
        }
    }

    fn provider<'a>(&'a self, current: CurrentApp<'a>) -> FactoryResult<&'a dyn ConfigProvider> {
        match &self.application {
            Some(application) => Ok(application as &dyn ConfigProvider),
            None => current.provider().ok_or(FactoryError::NoApplicationContext),
        }
    }

    /// Effective key: the explicit key, else the configured signing key, else
    /// none (the claim-set library then refuses to sign or verify).
    pub fn resolve_key(
        &self,
        explicit: Option<SigningKey>,
        current: CurrentApp<'_>,
    ) -> FactoryResult<Option<SigningKey>> {
        if let Some(key) = explicit.filter(|key| !key.is_empty()) {
            debug!(source = "explicit", "resolved signing key");
            return Ok(Some(key));
        }

        let provider = self.provider(current)?;
        match non_empty(provider.get_str(SIGNING_KEY)) {
            Some(key) => {
                debug!(source = "configuration", "resolved signing key");
                Ok(Some(SigningKey::from(key)))
            }
            None => {
                warn!("no key set for signing tokens; set {SIGNING_KEY}");
                Ok(None)
            }
        }
    }

    /// Configured default validity, if any.
    pub fn resolve_validity(&self, current: CurrentApp<'_>) -> FactoryResult<Option<Duration>> {
        let provider = self.provider(current)?;
        match provider.get(TOKEN_VALIDITY) {
            Some(value) => parse_validity(value),
            None => Ok(None),
        }
    }

    /// Expiration date for a token issued at `issued_at` under the configured
    /// default validity.
    pub fn expiration_date(
        &self,
        issued_at: DateTime<Utc>,
        current: CurrentApp<'_>,
    ) -> FactoryResult<Option<DateTime<Utc>>> {
        let Some(validity) = self.resolve_validity(current)? else {
            return Ok(None);
        };
        issued_at
            .trunc_subsecs(0)
            .checked_add_signed(validity)
            .map(Some)
            .ok_or(FactoryError::InvalidValidity {
                key: TOKEN_VALIDITY,
                seconds: validity.num_seconds(),
            })
    }

    /// Start a token of claim set `C`. The key is resolved now and kept for the
    /// lifetime of the token.
    pub fn token<C: ClaimSet>(
        &self,
        claims: C,
        key: Option<SigningKey>,
        current: CurrentApp<'_>,
    ) -> FactoryResult<ConfiguredToken<C>> {
        let key = self.resolve_key(key, current)?;
        Ok(ConfiguredToken {
            factory: self.clone(),
            inner: Token::new(claims, key),
        })
    }

    /// Verify `token` as a token of claim set `C`.
    pub fn verify<C: ClaimSet>(
        &self,
        token: &str,
        key: Option<SigningKey>,
        options: &VerifyOptions,
        current: CurrentApp<'_>,
    ) -> FactoryResult<ConfiguredToken<C>> {
        let key = self.resolve_key(key, current)?;
        let inner = Token::<C>::verify(token, key.as_ref(), options)?;
        Ok(ConfiguredToken {
            factory: self.clone(),
            inner,
        })
    }
}

/// A token of claim set `C` whose key was resolved by a [`TokenFactory`].
#[derive(Clone, Debug)]
pub struct ConfiguredToken<C> {
    factory: TokenFactory,
    inner: Token<C>,
}

impl<C: ClaimSet> ConfiguredToken<C> {
    pub fn claims(&self) -> &C {
        &self.inner.claims
    }

    pub fn claims_mut(&mut self) -> &mut C {
        &mut self.inner.claims
    }

    pub fn registered(&self) -> &RegisteredClaims {
        &self.inner.registered
    }

    pub fn registered_mut(&mut self) -> &mut RegisteredClaims {
        &mut self.inner.registered
    }

    pub fn key(&self) -> Option<&SigningKey> {
        self.inner.key()
    }

    pub fn into_claims(self) -> C {
        self.inner.into_claims()
    }

    pub fn into_inner(self) -> Token<C> {
        self.inner
    }

    /// Sign the token.
    ///
    /// The expiration date is, in order: the one set on the token, the claim
    /// set's own validity, the configured default validity. Configuration is
    /// only consulted when the first two are unset.
    pub fn create(
        &mut self,
        issued_at: Option<DateTime<Utc>>,
        current: CurrentApp<'_>,
    ) -> FactoryResult<String> {
        let issued_at = issued_at.unwrap_or_else(Utc::now).trunc_subsecs(0);
        if self.inner.registered.expiration_date.is_none() && C::validity().is_none() {
            self.inner.registered.expiration_date =
                self.factory.expiration_date(issued_at, current)?;
        }
        Ok(self.inner.create(Some(issued_at))?)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use common_claims::TokenError;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Invite {
        email: Option<String>,
    }

    impl ClaimSet for Invite {
        const CLASS: &'static str = "Invite";
        const FIELDS: &'static [&'static str] = &["email"];
    }

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    struct ShortLived {
        nonce: Option<String>,
    }

    impl ClaimSet for ShortLived {
        const CLASS: &'static str = "ShortLived";
        const FIELDS: &'static [&'static str] = &["nonce"];

        fn validity() -> Option<Duration> {
            Some(Duration::seconds(30))
        }
    }

    fn invite() -> Invite {
        Invite {
            email: Some("new@example.com".into()),
        }
    }

    #[test]
    fn init_app_seeds_signing_key_from_secret_key() {
        let app = Application::new("test", AppConfig::new().with(SECRET_KEY, "app-secret"));
        TokenFactory::new().init_app(&app);
        assert_eq!(app.get_str(SIGNING_KEY).as_deref(), Some("app-secret"));
    }

    #[test]
    fn init_app_keeps_configured_signing_key() {
        let app = Application::new(
            "test",
            AppConfig::new()
                .with(SECRET_KEY, "app-secret")
                .with(SIGNING_KEY, "token-secret"),
        );
        TokenFactory::new().init_app(&app);
        assert_eq!(app.get_str(SIGNING_KEY).as_deref(), Some("token-secret"));
    }

    #[test]
    fn bound_application_wins_over_current() {
        let bound = Application::new("bound", AppConfig::new().with(SIGNING_KEY, "bound-key"));
        let current = Application::new("current", AppConfig::new().with(SIGNING_KEY, "current-key"));
        let factory = TokenFactory::with_application(bound);

        let key = factory
            .resolve_key(None, CurrentApp::of(&current))
            .expect("resolve");
        assert_eq!(key, Some(SigningKey::from("bound-key")));
    }

    #[test]
    fn empty_explicit_key_falls_back_to_configuration() {
        let app = Application::new("test", AppConfig::new().with(SIGNING_KEY, "configured"));
        let key = TokenFactory::new()
            .resolve_key(Some(SigningKey::from("")), CurrentApp::of(&app))
            .expect("resolve");
        assert_eq!(key, Some(SigningKey::from("configured")));
    }

    #[test]
    fn empty_configured_key_defers_to_library_default() {
        let app = Application::new("test", AppConfig::new().with(SIGNING_KEY, ""));
        let key = TokenFactory::new()
            .resolve_key(None, CurrentApp::of(&app))
            .expect("resolve");
        assert_eq!(key, None);
    }

    #[test]
    fn explicit_key_needs_no_application() {
        let factory = TokenFactory::new();
        let token = factory
            .token(invite(), Some(SigningKey::from("explicit")), CurrentApp::none())
            .expect("explicit key");
        assert_eq!(token.key(), Some(&SigningKey::from("explicit")));
    }

    #[test]
    fn create_without_key_reports_library_error() {
        let app = Application::new("test", AppConfig::new());
        let factory = TokenFactory::new();
        let mut token = factory.token(invite(), None, CurrentApp::of(&app)).expect("token");
        let err = token.create(None, CurrentApp::of(&app)).expect_err("no key");
        assert!(matches!(err, FactoryError::Token(TokenError::MissingKey)));
    }

    #[test]
    fn explicit_expiration_skips_configuration() {
        let factory = TokenFactory::new();
        let mut token = factory
            .token(invite(), Some(SigningKey::from("explicit")), CurrentApp::none())
            .expect("token");
        let expires = Utc::now().trunc_subsecs(0) + Duration::hours(1);
        token.registered_mut().expiration_date = Some(expires);

        token.create(None, CurrentApp::none()).expect("no lookup needed");
        assert_eq!(token.registered().expiration_date, Some(expires));
    }

    #[test]
    fn claim_set_validity_wins_over_configuration() {
        let app = Application::new(
            "test",
            AppConfig::new()
                .with(SIGNING_KEY, "configured")
                .with(TOKEN_VALIDITY, 900_i64),
        );
        let factory = TokenFactory::new();
        let mut token = factory
            .token(ShortLived { nonce: Some("n".into()) }, None, CurrentApp::of(&app))
            .expect("token");
        let issued_at = Utc::now().trunc_subsecs(0);
        token.create(Some(issued_at), CurrentApp::of(&app)).expect("create");
        assert_eq!(
            token.registered().expiration_date,
            Some(issued_at + Duration::seconds(30))
        );
    }

    #[test]
    fn invalid_configured_validity_fails_creation() {
        let app = Application::new(
            "test",
            AppConfig::new()
                .with(SIGNING_KEY, "configured")
                .with(TOKEN_VALIDITY, 0_i64),
        );
        let factory = TokenFactory::new();
        let mut token = factory.token(invite(), None, CurrentApp::of(&app)).expect("token");
        let err = token.create(None, CurrentApp::of(&app)).expect_err("zero validity");
        assert!(matches!(err, FactoryError::InvalidValidity { seconds: 0, .. }));
    }

    #[test]
    fn oversized_configured_validity_fails_creation() {
        for validity in ["100000000000000", "9300000000000000"] {
            let app = Application::new(
                "test",
                AppConfig::new()
                    .with(SIGNING_KEY, "configured")
                    .with(TOKEN_VALIDITY, validity),
            );
            let factory = TokenFactory::new();
            let mut token = factory.token(invite(), None, CurrentApp::of(&app)).expect("token");
            let err = token
                .create(None, CurrentApp::of(&app))
                .expect_err("expiration out of range");
            assert!(matches!(err, FactoryError::InvalidValidity { .. }), "{validity}");
        }
    }

    #[test]
    fn claims_can_be_edited_before_signing() {
        let app = Application::new("test", AppConfig::new().with(SIGNING_KEY, "configured"));
        let factory = TokenFactory::new();
        let mut token = factory.token(invite(), None, CurrentApp::of(&app)).expect("token");
        token.claims_mut().email = Some("changed@example.com".into());
        let encoded = token.create(None, CurrentApp::of(&app)).expect("create");

        let inner = factory
            .verify::<Invite>(&encoded, None, &VerifyOptions::new(), CurrentApp::of(&app))
            .expect("verify")
            .into_inner();
        assert_eq!(inner.claims.email.as_deref(), Some("changed@example.com"));
        assert_eq!(inner.key(), Some(&SigningKey::from("configured")));
    }

    #[test]
    fn unparsable_validity_creates_token_without_expiration() {
        let app = Application::new(
            "test",
            AppConfig::new()
                .with(SIGNING_KEY, "configured")
                .with(TOKEN_VALIDITY, "15 minutes"),
        );
        let factory = TokenFactory::new();
        let mut token = factory.token(invite(), None, CurrentApp::of(&app)).expect("token");
        token.create(None, CurrentApp::of(&app)).expect("create");
        assert_eq!(token.registered().expiration_date, None);
    }
}
