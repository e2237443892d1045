use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::{header::AUTHORIZATION, request::Parts};
use common_claims::{ClaimSet, VerifyOptions};
use tracing::debug;

use crate::context::{Application, CurrentApp};
use crate::error::{FactoryError, FactoryResult};
use crate::factory::{ConfiguredToken, TokenFactory};

/// Bearer token verified as claim set `C` with the state's factory, using the
/// state's application as the current application.
#[derive(Debug, Clone)]
pub struct VerifiedToken<C> {
    pub token: ConfiguredToken<C>,
    pub raw: String,
}

impl<C: ClaimSet> VerifiedToken<C> {
    pub fn claims(&self) -> &C {
        self.token.claims()
    }

    pub fn into_claims(self) -> C {
        self.token.into_claims()
    }
}

#[async_trait]
impl<S, C> FromRequestParts<S> for VerifiedToken<C>
where
    Arc<TokenFactory>: FromRef<S>,
    Arc<VerifyOptions>: FromRef<S>,
    Application: FromRef<S>,
    S: Send + Sync,
    C: ClaimSet + Send,
{
    type Rejection = FactoryError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let factory = Arc::<TokenFactory>::from_ref(state);
        let options = Arc::<VerifyOptions>::from_ref(state);
        let application = Application::from_ref(state);

        let header_value = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(FactoryError::MissingAuthorization)?;

        let raw = parse_bearer(header_value)?;
        let token = factory.verify::<C>(&raw, None, &options, CurrentApp::of(&application))?;
        debug!(class = C::CLASS, "verified bearer token");

        Ok(Self { token, raw })
    }
}

fn parse_bearer(value: &axum::http::HeaderValue) -> FactoryResult<String> {
    value
        .to_str()
        .ok()
        .and_then(|header| header.trim().strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
        .ok_or(FactoryError::InvalidAuthorization)
}
