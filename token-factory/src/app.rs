use std::sync::Arc;

use axum::extract::{FromRef, Path, State};
use axum::routing::get;
use axum::{Json, Router};
use common_claims::{ClaimSet, VerifyOptions};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;
use uuid::Uuid;

use crate::context::{Application, CurrentApp};
use crate::error::FactoryResult;
use crate::extractors::VerifiedToken;
use crate::factory::TokenFactory;

#[derive(Clone)]
pub struct AppState {
    pub application: Application,
    pub tokens: Arc<TokenFactory>,
    pub verify_options: Arc<VerifyOptions>,
}

impl AppState {
    pub fn new(application: Application, tokens: TokenFactory) -> Self {
        Self {
            application,
            tokens: Arc::new(tokens),
            verify_options: Arc::new(VerifyOptions::default()),
        }
    }

    pub fn with_verify_options(mut self, options: VerifyOptions) -> Self {
        self.verify_options = Arc::new(options);
        self
    }

    fn current(&self) -> CurrentApp<'_> {
        CurrentApp::of(&self.application)
    }
}

impl FromRef<AppState> for Arc<TokenFactory> {
    fn from_ref(state: &AppState) -> Self {
        state.tokens.clone()
    }
}

impl FromRef<AppState> for Arc<VerifyOptions> {
    fn from_ref(state: &AppState) -> Self {
        state.verify_options.clone()
    }
}

impl FromRef<AppState> for Application {
    fn from_ref(state: &AppState) -> Self {
        state.application.clone()
    }
}

/// Confirms that a user owns the account they signed up with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountValidation {
    pub user_id: Option<u64>,
}

impl ClaimSet for AccountValidation {
    const CLASS: &'static str = "AccountValidation";
    const FIELDS: &'static [&'static str] = &["user_id"];
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/tokens/:user_id", get(issue_token))
        .route("/validate/:token", get(validate_user))
        .route("/me", get(whoami))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn issue_token(
    State(state): State<AppState>,
    Path(user_id): Path<u64>,
) -> FactoryResult<String> {
    let claims = AccountValidation {
        user_id: Some(user_id),
    };
    let mut token = state.tokens.token(claims, None, state.current())?;
    token.registered_mut().jwt_id = Some(Uuid::new_v4().to_string());
    token.create(None, state.current())
}

/// Responds with the validated user id, or `0` if the token is rejected.
async fn validate_user(State(state): State<AppState>, Path(token): Path<String>) -> String {
    let verified = state.tokens.verify::<AccountValidation>(
        &token,
        None,
        &state.verify_options,
        state.current(),
    );
    match verified {
        Ok(token) => token.claims().user_id.unwrap_or_default().to_string(),
        Err(err) => {
            warn!(code = err.code(), error = %err, "rejected account validation token");
            "0".to_string()
        }
    }
}

async fn whoami(auth: VerifiedToken<AccountValidation>) -> Json<Value> {
    let registered = auth.token.registered();
    Json(json!({
        "user_id": auth.claims().user_id,
        "jwt_id": registered.jwt_id,
        "issued_at": registered.issued_at,
        "expires_at": registered.expiration_date,
    }))
}
