use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::storage::{KeyValueStore, StorageResult};

/// Storage key for the platform OTP validation hash
pub const VALIDATION_HASH_KEY: &str = "validationHash";

/// Delivery channel for a one-time password.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OtpChannel {
    #[default]
    Sms,
    Whatsapp,
}

/// Remembers the app-signature hash the server embeds in OTP messages, so
/// it is computed once per install.
#[derive(Clone)]
pub struct ValidationHashCache {
    kv: Arc<dyn KeyValueStore>,
}

impl ValidationHashCache {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    pub async fn get(&self) -> Option<String> {
        match self.kv.get(VALIDATION_HASH_KEY).await {
            Ok(hash) => hash.filter(|h| !h.is_empty()),
            Err(e) => {
                warn!(error = %e, "Failed to read cached validation hash");
                None
            }
        }
    }

    pub async fn set(&self, hash: &str) -> StorageResult<()> {
        self.kv.set(VALIDATION_HASH_KEY, hash.to_string()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_channel_wire_names() {
        assert_eq!(serde_json::to_value(OtpChannel::Sms).unwrap(), "sms");
        assert_eq!(serde_json::to_value(OtpChannel::Whatsapp).unwrap(), "whatsapp");
        assert_eq!(OtpChannel::default(), OtpChannel::Sms);
    }

    #[tokio::test]
    async fn test_hash_roundtrip_and_empty_is_absent() {
        let kv = Arc::new(MemoryStore::new());
        let cache = ValidationHashCache::new(kv.clone());
        assert_eq!(cache.get().await, None);
        cache.set("abc123").await.unwrap();
        assert_eq!(cache.get().await.as_deref(), Some("abc123"));

        kv.set(VALIDATION_HASH_KEY, String::new()).await.unwrap();
        assert_eq!(cache.get().await, None);
    }
}
