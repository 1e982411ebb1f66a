use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::User;
use crate::auth::Credentials;

/// Per-field validation messages, e.g. `{"email": ["has already been taken"]}`.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Email sign-up payload.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRegistration {
    pub email: String,
    pub name: String,
    pub username: String,
    pub password: String,
    pub password_confirmation: String,
}

impl fmt::Debug for UserRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRegistration")
            .field("email", &self.email)
            .field("name", &self.name)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Response of `POST /users.json`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub user: Option<User>,
    pub credentials: Option<Credentials>,
    pub errors: Option<FieldErrors>,
}

impl RegisterResponse {
    /// Pull field errors out of a rejected (422) body.
    pub fn errors_from(body: &serde_json::Value) -> FieldErrors {
        body.get("errors")
            .cloned()
            .and_then(|errors| serde_json::from_value(errors).ok())
            .unwrap_or_default()
    }
}

/// Result of a sign-up attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    /// Account created and credentials issued; the session is established
    SignedIn(User),
    /// Account created but must be confirmed (email link or phone OTP)
    /// before signing in; session state is unchanged
    PendingConfirmation(Option<User>),
    /// Server-side validation failed
    Rejected(FieldErrors),
}
