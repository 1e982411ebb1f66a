//! Normalized, persisted GraphQL response cache.
//!
//! Objects carrying both `__typename` and `id` are stored once as entities
//! (`User:42`) and referenced from results, so a mutation returning a user
//! also updates every cached query that reached that user. Repeated writes
//! deep-merge into what is already cached instead of replacing it.
//!
//! The whole cache is persisted under one key after every write and
//! restored when the client is constructed.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::storage::{KeyValueStore, StorageResult};

/// Storage key for the persisted cache
pub const CACHE_KEY: &str = "graphql-cache";

const REF_KEY: &str = "__ref";

/// Guards against pathological reference chains when resolving entities
const MAX_RESOLVE_DEPTH: usize = 64;

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    entities: BTreeMap<String, Value>,
    #[serde(default)]
    results: BTreeMap<String, Value>,
}

pub struct NormalizedCache {
    snapshot: Mutex<Snapshot>,
    kv: Arc<dyn KeyValueStore>,
}

impl NormalizedCache {
    /// Load the persisted cache; an unreadable one starts empty.
    pub async fn restore(kv: Arc<dyn KeyValueStore>) -> Self {
        let snapshot = match kv.get(CACHE_KEY).await {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "Discarding unreadable GraphQL cache");
                Snapshot::default()
            }),
            Ok(None) => Snapshot::default(),
            Err(e) => {
                warn!(error = %e, "Failed to load GraphQL cache");
                Snapshot::default()
            }
        };
        debug!(
            entities = snapshot.entities.len(),
            results = snapshot.results.len(),
            "GraphQL cache restored"
        );
        Self {
            snapshot: Mutex::new(snapshot),
            kv,
        }
    }

    pub async fn read(&self, key: &str) -> Option<Value> {
        let snapshot = self.snapshot.lock().await;
        let root = snapshot.results.get(key)?;
        let mut path = Vec::new();
        Some(resolve(root, &snapshot.entities, &mut path))
    }

    pub async fn write(&self, key: &str, data: &Value) -> StorageResult<()> {
        let mut snapshot = self.snapshot.lock().await;
        let normalized = normalize(data, &mut snapshot.entities);
        match snapshot.results.get_mut(key) {
            Some(existing) => merge(existing, normalized),
            None => {
                snapshot.results.insert(key.to_string(), normalized);
            }
        }

        // Persist while still holding the lock so writes land in order
        let raw = serde_json::to_string(&*snapshot).map_err(std::io::Error::from)?;
        self.kv.set(CACHE_KEY, raw).await
    }

    pub async fn clear(&self) -> StorageResult<()> {
        let mut snapshot = self.snapshot.lock().await;
        *snapshot = Snapshot::default();
        self.kv.remove(CACHE_KEY).await
    }

    #[cfg(test)]
    async fn entity(&self, key: &str) -> Option<Value> {
        self.snapshot.lock().await.entities.get(key).cloned()
    }
}

fn entity_key(map: &Map<String, Value>) -> Option<String> {
    let typename = map.get("__typename")?.as_str()?;
    let id = match map.get("id")? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    Some(format!("{}:{}", typename, id))
}

fn is_ref(value: &Value) -> bool {
    value.get(REF_KEY).is_some()
}

fn normalize(value: &Value, entities: &mut BTreeMap<String, Value>) -> Value {
    match value {
        Value::Object(map) => {
            let fields: Map<String, Value> = map
                .iter()
                .map(|(k, v)| (k.clone(), normalize(v, entities)))
                .collect();
            match entity_key(map) {
                Some(key) => {
                    let incoming = Value::Object(fields);
                    match entities.get_mut(&key) {
                        Some(existing) => merge(existing, incoming),
                        None => {
                            entities.insert(key.clone(), incoming);
                        }
                    }
                    let mut reference = Map::new();
                    reference.insert(REF_KEY.to_string(), Value::String(key));
                    Value::Object(reference)
                }
                None => Value::Object(fields),
            }
        }
        Value::Array(items) => Value::Array(items.iter().map(|v| normalize(v, entities)).collect()),
        other => other.clone(),
    }
}

/// Objects merge field by field; references, arrays and scalars are replaced.
fn merge(target: &mut Value, incoming: Value) {
    if is_ref(target) || is_ref(&incoming) {
        *target = incoming;
        return;
    }
    match (target, incoming) {
        (Value::Object(existing), Value::Object(fields)) => {
            for (k, v) in fields {
                match existing.get_mut(&k) {
                    Some(slot) => merge(slot, v),
                    None => {
                        existing.insert(k, v);
                    }
                }
            }
        }
        (slot, incoming) => *slot = incoming,
    }
}

fn resolve(value: &Value, entities: &BTreeMap<String, Value>, path: &mut Vec<String>) -> Value {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(key)) = map.get(REF_KEY) {
                if path.contains(key) || path.len() >= MAX_RESOLVE_DEPTH {
                    return value.clone();
                }
                let Some(entity) = entities.get(key) else {
                    return Value::Null;
                };
                path.push(key.clone());
                let resolved = resolve(entity, entities, path);
                path.pop();
                return resolved;
            }
            Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), resolve(v, entities, path)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(|v| resolve(v, entities, path)).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use serde_json::json;

    async fn empty_cache() -> (NormalizedCache, Arc<MemoryStore>) {
        let kv = Arc::new(MemoryStore::new());
        (NormalizedCache::restore(kv.clone()).await, kv)
    }

    #[tokio::test]
    async fn test_read_back_what_was_written() {
        let (cache, _) = empty_cache().await;
        let data = json!({ "me": { "__typename": "User", "id": "1", "name": "Ada" } });
        cache.write("Me({})", &data).await.unwrap();
        assert_eq!(cache.read("Me({})").await, Some(data));
        assert_eq!(cache.read("Other({})").await, None);
    }

    #[tokio::test]
    async fn test_entities_are_shared_across_results() {
        let (cache, _) = empty_cache().await;
        cache
            .write("Me({})", &json!({ "me": { "__typename": "User", "id": 1, "name": "Ada" } }))
            .await
            .unwrap();
        cache
            .write(
                "UpdateUser({\"id\":1})",
                &json!({ "updateUser": { "__typename": "User", "id": 1, "name": "Ada L." } }),
            )
            .await
            .unwrap();

        let me = cache.read("Me({})").await.unwrap();
        assert_eq!(me["me"]["name"], "Ada L.");
    }

    #[tokio::test]
    async fn test_repeated_writes_merge_fields() {
        let (cache, _) = empty_cache().await;
        cache
            .write("Me({})", &json!({ "me": { "__typename": "User", "id": 1, "name": "Ada" } }))
            .await
            .unwrap();
        cache
            .write(
                "Me({})",
                &json!({ "me": { "__typename": "User", "id": 1, "email": "ada@example.com" } }),
            )
            .await
            .unwrap();

        let entity = cache.entity("User:1").await.unwrap();
        assert_eq!(entity["name"], "Ada");
        assert_eq!(entity["email"], "ada@example.com");
    }

    #[tokio::test]
    async fn test_plain_objects_merge_and_scalars_replace() {
        let (cache, _) = empty_cache().await;
        cache
            .write("Q({})", &json!({ "settings": { "a": 1, "b": [1, 2] } }))
            .await
            .unwrap();
        cache
            .write("Q({})", &json!({ "settings": { "b": [3], "c": true } }))
            .await
            .unwrap();
        assert_eq!(
            cache.read("Q({})").await.unwrap(),
            json!({ "settings": { "a": 1, "b": [3], "c": true } })
        );
    }

    #[tokio::test]
    async fn test_survives_restart() {
        let (cache, kv) = empty_cache().await;
        let data = json!({ "me": { "__typename": "User", "id": 9, "name": "Persisted" } });
        cache.write("Me({})", &data).await.unwrap();
        drop(cache);

        let restored = NormalizedCache::restore(kv).await;
        assert_eq!(restored.read("Me({})").await, Some(data));
    }

    #[tokio::test]
    async fn test_corrupt_persisted_cache_starts_empty() {
        let kv = Arc::new(MemoryStore::new());
        kv.set(CACHE_KEY, "{{{".to_string()).await.unwrap();
        let cache = NormalizedCache::restore(kv).await;
        assert_eq!(cache.read("Me({})").await, None);
    }

    #[tokio::test]
    async fn test_clear_removes_memory_and_storage() {
        let (cache, kv) = empty_cache().await;
        cache.write("Me({})", &json!({ "me": null })).await.unwrap();
        cache.clear().await.unwrap();
        assert_eq!(cache.read("Me({})").await, None);
        assert_eq!(kv.get(CACHE_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_cyclic_references_terminate() {
        let (cache, _) = empty_cache().await;
        let data = json!({
            "me": {
                "__typename": "User", "id": 1,
                "avatar": {
                    "__typename": "Attachment", "id": 2,
                    "owner": { "__typename": "User", "id": 1 }
                }
            }
        });
        cache.write("Me({})", &data).await.unwrap();
        let read = cache.read("Me({})").await.unwrap();
        assert_eq!(read["me"]["avatar"]["id"], 2);
        assert_eq!(read["me"]["avatar"]["owner"]["__ref"], "User:1");
    }
}
