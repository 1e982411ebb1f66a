//! Refresh-or-fail sequence shared by both transports.
//!
//! Refreshes are single-flight: one exchange runs at a time, and a caller
//! that waited on the guard re-reads the store first, reusing a record that
//! another caller already refreshed instead of spending the (possibly
//! rotated) refresh token a second time.

use reqwest::Method;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{classify, unix_now, CredentialStore, Credentials, Grant, TokenRequest, TokenStatus};
use crate::api::{ApiError, RequestOptions, RestClient};
use crate::session::{SessionBus, SessionEvent};

pub struct TokenRefresher {
    store: CredentialStore,
    identity: RestClient,
    client_id: String,
    bus: SessionBus,
    in_flight: Mutex<()>,
}

impl TokenRefresher {
    pub fn new(
        store: CredentialStore,
        identity: RestClient,
        client_id: impl Into<String>,
        bus: SessionBus,
    ) -> Self {
        Self {
            store,
            identity,
            client_id: client_id.into(),
            bus,
            in_flight: Mutex::new(()),
        }
    }

    /// Credentials to attach to an outgoing request.
    ///
    /// Reads the store fresh, refreshing first if the record has expired.
    /// `Ok(None)` means there is nothing to attach and the request goes out
    /// unauthenticated. An irrecoverable record clears the store, publishes
    /// `Unauthenticated` and fails with `SessionExpired`.
    pub async fn authorize(&self) -> Result<Option<Credentials>, ApiError> {
        let Some(current) = self.store.get().await else {
            return Ok(None);
        };

        match classify(&current, unix_now()) {
            TokenStatus::Valid => Ok(Some(current)),
            TokenStatus::NeedsRefresh | TokenStatus::Irrecoverable => {
                debug!("Access token expired, refreshing before request");
                match self.refresh(&current).await {
                    Ok(fresh) => Ok(Some(fresh)),
                    Err(e) => {
                        if matches!(e, ApiError::SessionExpired) {
                            self.bus.publish(SessionEvent::Unauthenticated);
                        }
                        Err(e)
                    }
                }
            }
        }
    }

    /// Refresh after the server rejected `rejected`, regardless of its
    /// expiry timestamp. Does not publish; the caller already did.
    ///
    /// The server has already declared the session invalid, so any failure
    /// here discards the record and reports `SessionExpired`, including
    /// failures that `authorize` would treat as transient.
    pub async fn refresh_rejected(&self, rejected: &Credentials) -> Result<Credentials, ApiError> {
        match self.refresh(rejected).await {
            Ok(fresh) => Ok(fresh),
            Err(ApiError::SessionExpired) => Err(ApiError::SessionExpired),
            Err(e) => {
                warn!(error = %e, "Refresh after server rejection failed, discarding credentials");
                self.discard().await;
                Err(ApiError::SessionExpired)
            }
        }
    }

    async fn refresh(&self, stale: &Credentials) -> Result<Credentials, ApiError> {
        let _flight = self.in_flight.lock().await;

        let current = match self.store.get().await {
            None => return Err(ApiError::SessionExpired),
            Some(latest) if latest.access_token != stale.access_token => {
                if classify(&latest, unix_now()) == TokenStatus::Valid {
                    debug!("Credentials already refreshed by a concurrent request");
                    return Ok(latest);
                }
                latest
            }
            Some(latest) => latest,
        };

        if !current.has_refresh_token() {
            warn!("Expired credentials have no refresh token, discarding");
            self.discard().await;
            return Err(ApiError::SessionExpired);
        }

        let request = TokenRequest::new(
            self.client_id.clone(),
            Grant::RefreshToken {
                refresh_token: current.refresh_token.clone(),
            },
        );
        let exchanged: Result<Credentials, ApiError> = self
            .identity
            .send(
                Method::POST,
                "/oauth/token",
                Some(&request),
                &RequestOptions::anonymous(),
                None,
            )
            .await;

        match exchanged {
            Ok(mut fresh) => {
                if !fresh.has_refresh_token() {
                    fresh.refresh_token = current.refresh_token;
                }
                self.store.set(&fresh).await?;
                info!(expires_at = fresh.expires_at(), "Access token refreshed");
                Ok(fresh)
            }
            Err(e) if e.is_rejection() => {
                warn!(error = %e, "Refresh token rejected, discarding credentials");
                self.discard().await;
                Err(ApiError::SessionExpired)
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed in transit");
                Err(e)
            }
        }
    }

    async fn discard(&self) {
        if let Err(e) = self.store.clear().await {
            warn!(error = %e, "Failed to clear discarded credentials");
        }
    }
}
