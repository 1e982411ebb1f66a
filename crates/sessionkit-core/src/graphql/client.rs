//! GraphQL transport.
//!
//! Each operation passes through two stages:
//!
//! 1. authorization: credentials are read fresh from the store (refreshed
//!    first if expired) and attached as `Authorization`;
//! 2. error observation: an `UNAUTHENTICATED` / `ACCESS_DENIED` error code
//!    (or an HTTP 401) publishes `Unauthenticated`, forces a refresh, and
//!    retries the operation exactly once if the refresh succeeded.

use std::sync::Arc;

use reqwest::{header, Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::cache::NormalizedCache;
use super::operations::Operation;
use crate::api::ApiError;
use crate::auth::{Credentials, TokenRefresher};
use crate::session::{SessionBus, SessionEvent};
use crate::storage::KeyValueStore;

/// Error codes that mean the server no longer accepts our credentials
const AUTH_ERROR_CODES: &[&str] = &["UNAUTHENTICATED", "ACCESS_DENIED"];

#[derive(Debug, Deserialize)]
struct GraphqlResponse {
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    extensions: Option<ErrorExtensions>,
}

#[derive(Debug, Deserialize)]
struct ErrorExtensions {
    code: Option<String>,
}

impl GraphqlError {
    fn is_auth_error(&self) -> bool {
        self.extensions
            .as_ref()
            .and_then(|ext| ext.code.as_deref())
            .map(|code| {
                let code = code.trim().to_ascii_uppercase().replace('-', "_");
                AUTH_ERROR_CODES.contains(&code.as_str())
            })
            .unwrap_or(false)
    }
}

enum Attempt {
    Data(Value),
    /// Rejected as unauthenticated; carries what was sent, if anything
    Unauthenticated(Option<Credentials>),
}

pub struct GraphqlClient {
    client: Client,
    endpoint: String,
    refresher: Arc<TokenRefresher>,
    bus: SessionBus,
    cache: NormalizedCache,
}

impl GraphqlClient {
    /// Build the client, restoring the persisted response cache first so no
    /// operation runs against an empty cache that is about to be replaced.
    pub async fn connect(
        client: Client,
        endpoint: impl Into<String>,
        refresher: Arc<TokenRefresher>,
        bus: SessionBus,
        cache_store: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            refresher,
            bus,
            cache: NormalizedCache::restore(cache_store).await,
        }
    }

    /// Run a query or mutation and decode its `data`.
    pub async fn execute<V, T>(&self, operation: &Operation, variables: &V) -> Result<T, ApiError>
    where
        V: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let variables =
            serde_json::to_value(variables).map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        let cache_key = operation.cache_key(&variables);

        if operation.reads_cache() {
            if let Some(cached) = self.cache.read(&cache_key).await {
                debug!(operation = operation.name, "Served from cache");
                return decode(operation, cached);
            }
        }

        let data = match self.attempt(operation, &variables).await? {
            Attempt::Data(data) => data,
            Attempt::Unauthenticated(sent) => {
                self.bus.publish(SessionEvent::Unauthenticated);
                let Some(sent) = sent else {
                    return Err(ApiError::Unauthorized);
                };
                self.refresher.refresh_rejected(&sent).await?;
                debug!(operation = operation.name, "Retrying after token refresh");
                match self.attempt(operation, &variables).await? {
                    Attempt::Data(data) => data,
                    Attempt::Unauthenticated(_) => return Err(ApiError::Unauthorized),
                }
            }
        };

        if let Err(e) = self.cache.write(&cache_key, &data).await {
            warn!(operation = operation.name, error = %e, "Failed to persist GraphQL cache");
        }
        decode(operation, data)
    }

    /// Drop every cached response, in memory and on disk.
    pub async fn reset(&self) -> Result<(), ApiError> {
        self.cache.clear().await?;
        Ok(())
    }

    async fn attempt(&self, operation: &Operation, variables: &Value) -> Result<Attempt, ApiError> {
        let credentials = self.refresher.authorize().await?;

        let body = json!({
            "operationName": operation.name,
            "query": operation.document,
            "variables": variables,
        });
        let mut request = self
            .client
            .post(&self.endpoint)
            .header(header::ACCEPT, "application/json")
            .json(&body);
        if let Some(ref credentials) = credentials {
            request = request.header(header::AUTHORIZATION, credentials.authorization_value());
        }

        debug!(operation = operation.name, authorized = credentials.is_some(), "Sending GraphQL operation");
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status == StatusCode::UNAUTHORIZED {
            return Ok(Attempt::Unauthenticated(credentials));
        }

        let parsed: GraphqlResponse = match serde_json::from_str(&text) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => return Err(ApiError::from_status(status, &text)),
            Err(e) => {
                return Err(ApiError::InvalidResponse(format!(
                    "{} from {}",
                    e, operation.name
                )))
            }
        };

        if parsed.errors.iter().any(GraphqlError::is_auth_error) {
            warn!(operation = operation.name, "Server reported an authentication error");
            return Ok(Attempt::Unauthenticated(credentials));
        }
        if !parsed.errors.is_empty() {
            return Err(ApiError::GraphQl(
                parsed.errors.into_iter().map(|e| e.message).collect(),
            ));
        }
        if !status.is_success() {
            return Err(ApiError::from_status(status, &text));
        }

        parsed
            .data
            .map(Attempt::Data)
            .ok_or_else(|| ApiError::InvalidResponse(format!("{} returned no data", operation.name)))
    }
}

fn decode<T: DeserializeOwned>(operation: &Operation, data: Value) -> Result<T, ApiError> {
    serde_json::from_value(data)
        .map_err(|e| ApiError::InvalidResponse(format!("{} from {}", e, operation.name)))
}
