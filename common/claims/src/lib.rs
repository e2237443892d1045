//! Typed JSON Web Token claim sets.
//!
//! A token kind is declared once as a serde struct implementing [`ClaimSet`];
//! [`Token`] then creates and verifies tokens of exactly that shape, delegating
//! encoding and signatures to `jsonwebtoken`.

pub mod error;
pub mod key;
pub mod registered;
pub mod schema;
pub mod token;

pub use error::{TokenError, TokenResult};
pub use jsonwebtoken::Algorithm;
pub use key::SigningKey;
pub use registered::{Audience, RegisteredClaims, REGISTERED_CLAIMS};
pub use schema::ClaimSet;
pub use token::{Token, VerifyOptions, CLASS_CLAIM};
