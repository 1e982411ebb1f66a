use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::storage::{KeyValueStore, StorageResult};

/// Storage key holding the serialized credential record
pub const CREDENTIALS_KEY: &str = "credentials";

/// Default token type when the server omits one
const DEFAULT_TOKEN_TYPE: &str = "Bearer";

/// Current time as unix seconds.
pub fn unix_now() -> i64 {
    Utc::now().timestamp()
}

fn default_token_type() -> String {
    DEFAULT_TOKEN_TYPE.to_string()
}

/// OAuth credential record as issued by the identity provider.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Credentials {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Lifetime in seconds, counted from `created_at`
    pub expires_in: i64,
    /// Issuance time, unix seconds
    #[serde(default = "unix_now")]
    pub created_at: i64,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub scope: String,
}

impl Credentials {
    pub fn expires_at(&self) -> i64 {
        self.created_at + self.expires_in
    }

    /// Seconds left before expiry; negative once expired.
    pub fn seconds_until_expiry(&self, now: i64) -> i64 {
        self.expires_at() - now
    }

    pub fn has_refresh_token(&self) -> bool {
        !self.refresh_token.is_empty()
    }

    /// Value for the `Authorization` header, e.g. `Bearer abc`.
    pub fn authorization_value(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("created_at", &self.created_at)
            .field("refresh_token", &"<redacted>")
            .field("scope", &self.scope)
            .finish()
    }
}

/// Sole owner of the persisted credential record.
///
/// Clone is cheap; all clones share the same backing store.
#[derive(Clone)]
pub struct CredentialStore {
    kv: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Read the stored record.
    ///
    /// Missing, unreadable or malformed data all read as `None`.
    pub async fn get(&self) -> Option<Credentials> {
        let raw = match self.kv.get(CREDENTIALS_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Failed to read stored credentials");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(credentials) => Some(credentials),
            Err(e) => {
                warn!(error = %e, "Ignoring malformed stored credentials");
                None
            }
        }
    }

    /// Replace the stored record.
    pub async fn set(&self, credentials: &Credentials) -> StorageResult<()> {
        let raw = serde_json::to_string(credentials).map_err(std::io::Error::from)?;
        self.kv.set(CREDENTIALS_KEY, raw).await?;
        debug!(expires_at = credentials.expires_at(), "Credentials stored");
        Ok(())
    }

    pub async fn clear(&self) -> StorageResult<()> {
        self.kv.remove(CREDENTIALS_KEY).await?;
        debug!("Credentials cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn sample() -> Credentials {
        Credentials {
            access_token: "T1".to_string(),
            token_type: "Bearer".to_string(),
            expires_in: 3600,
            created_at: 1_700_000_000,
            refresh_token: "R1".to_string(),
            scope: String::new(),
        }
    }

    #[tokio::test]
    async fn test_set_then_get_returns_same_record() {
        let store = CredentialStore::new(Arc::new(MemoryStore::new()));
        store.set(&sample()).await.unwrap();
        assert_eq!(store.get().await, Some(sample()));
    }

    #[tokio::test]
    async fn test_clear_then_get_is_absent() {
        let store = CredentialStore::new(Arc::new(MemoryStore::new()));
        store.set(&sample()).await.unwrap();
        store.clear().await.unwrap();
        assert_eq!(store.get().await, None);
        // Clearing an empty store is fine
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_malformed_record_reads_as_absent() {
        let kv = Arc::new(MemoryStore::new());
        kv.set(CREDENTIALS_KEY, "{\"accessToken\": 5".to_string())
            .await
            .unwrap();
        let store = CredentialStore::new(kv);
        assert_eq!(store.get().await, None);
    }

    #[test]
    fn test_persisted_format_is_camel_case() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["accessToken"], "T1");
        assert_eq!(json["expiresIn"], 3600);
        assert_eq!(json["createdAt"], 1_700_000_000);
        assert_eq!(json["refreshToken"], "R1");
    }

    #[test]
    fn test_missing_optional_fields_get_defaults() {
        let parsed: Credentials =
            serde_json::from_str(r#"{"accessToken":"A","expiresIn":60}"#).unwrap();
        assert_eq!(parsed.token_type, "Bearer");
        assert!(!parsed.has_refresh_token());
        assert!(parsed.created_at > 0);
    }

    #[test]
    fn test_authorization_value_and_expiry() {
        let c = sample();
        assert_eq!(c.authorization_value(), "Bearer T1");
        assert_eq!(c.expires_at(), 1_700_003_600);
        assert_eq!(c.seconds_until_expiry(1_700_003_000), 600);
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let rendered = format!("{:?}", sample());
        assert!(!rendered.contains("T1"));
        assert!(!rendered.contains("R1"));
    }
}
