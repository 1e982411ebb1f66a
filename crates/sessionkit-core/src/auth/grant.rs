use serde::Serialize;

/// Grant-specific fields of a `POST /oauth/token` body.
///
/// Serialized camelCase; the REST transport converts keys to snake_case on
/// the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "grantType", rename_all_fields = "camelCase")]
pub enum Grant {
    #[serde(rename = "password")]
    Email {
        email: String,
        password: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        password_confirmation: Option<String>,
    },
    #[serde(rename = "password")]
    PhoneNumber { phone_number: String, otp_code: String },
    #[serde(rename = "assertion")]
    Assertion { provider: String, assertion: String },
    #[serde(rename = "refresh_token")]
    RefreshToken { refresh_token: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    pub client_id: String,
    #[serde(flatten)]
    pub grant: Grant,
}

impl TokenRequest {
    pub fn new(client_id: impl Into<String>, grant: Grant) -> Self {
        Self {
            client_id: client_id.into(),
            grant,
        }
    }
}

/// Body of `POST /oauth/revoke`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokeRequest {
    pub client_id: String,
    pub token: String,
}
