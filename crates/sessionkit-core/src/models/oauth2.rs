use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::Credentials;

/// Fields produced by an already-completed external authorization-code
/// exchange (PKCE flow run by the platform).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationResult {
    pub access_token: String,
    pub token_type: String,
    /// Absolute expiry of the access token
    pub access_token_expiration_date: DateTime<Utc>,
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    pub id_token: Option<String>,
}

impl AuthorizationResult {
    /// Map onto a credential record issued at `now`.
    pub fn into_credentials(self, now: DateTime<Utc>) -> Credentials {
        let token_type = if self.token_type.is_empty() {
            "Bearer".to_string()
        } else {
            self.token_type
        };
        Credentials {
            access_token: self.access_token,
            token_type,
            expires_in: (self.access_token_expiration_date - now).num_seconds(),
            created_at: now.timestamp(),
            refresh_token: self.refresh_token.unwrap_or_default(),
            scope: self.scopes.join(" "),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_expires_in_is_relative_to_now() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let result = AuthorizationResult {
            access_token: "A".to_string(),
            token_type: "bearer".to_string(),
            access_token_expiration_date: now + Duration::seconds(7200),
            refresh_token: Some("R".to_string()),
            scopes: vec!["read".to_string(), "write".to_string()],
            id_token: None,
        };

        let credentials = result.into_credentials(now);
        assert_eq!(credentials.expires_in, 7200);
        assert_eq!(credentials.created_at, now.timestamp());
        assert_eq!(credentials.expires_at(), now.timestamp() + 7200);
        assert_eq!(credentials.scope, "read write");
        assert_eq!(credentials.refresh_token, "R");
        assert_eq!(credentials.token_type, "bearer");
    }

    #[test]
    fn test_parses_platform_payload() {
        let json = r#"{
            "accessToken": "A",
            "tokenType": "",
            "accessTokenExpirationDate": "2030-01-01T00:00:00Z",
            "refreshToken": null,
            "scopes": []
        }"#;
        let result: AuthorizationResult = serde_json::from_str(json).unwrap();
        let credentials = result.into_credentials(Utc::now());
        assert_eq!(credentials.token_type, "Bearer");
        assert!(!credentials.has_refresh_token());
        assert!(credentials.expires_in > 0);
    }
}
