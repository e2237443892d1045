//! Creates and verifies typed JSON Web Tokens using the signing key and token
//! validity configured for the host application.

pub mod app;
pub mod config;
pub mod context;
pub mod error;
pub mod extractors;
pub mod factory;

pub use app::{router, AccountValidation, AppState};
pub use config::{AppConfig, ConfigProvider, ConfigValue, SECRET_KEY, SIGNING_KEY, TOKEN_VALIDITY};
pub use context::{Application, CurrentApp};
pub use error::{FactoryError, FactoryResult};
pub use extractors::VerifiedToken;
pub use factory::{ConfiguredToken, TokenFactory};
