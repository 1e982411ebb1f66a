//! Data models exchanged with the identity provider and GraphQL backend.
//!
//! - `User`, `UserUpdate`: the signed-in principal and its mutable fields
//! - `Attachment`, `Blob`: uploaded files registered against a principal
//! - `UserRegistration`, `SignUpOutcome`: account creation
//! - `AuthorizationResult`: the result of an external authorization-code flow

pub mod attachment;
pub mod oauth2;
pub mod registration;
pub mod user;

pub use attachment::{Attachment, Blob};
pub use oauth2::AuthorizationResult;
pub use registration::{FieldErrors, RegisterResponse, SignUpOutcome, UserRegistration};
pub use user::{User, UserUpdate};

use serde::{Deserialize, Deserializer};

/// GraphQL `ID`s arrive as strings or numbers; both are accepted.
pub(crate) fn numeric_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(i64),
        Text(String),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Number(n) => Ok(n),
        RawId::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid numeric id: {}", s))),
    }
}
