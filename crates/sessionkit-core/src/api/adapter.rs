use std::sync::Arc;

use reqwest::Method;
use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

use super::{ApiError, RequestOptions, RestClient};
use crate::auth::TokenRefresher;
use crate::session::{SessionBus, SessionEvent};

/// Authorized REST adapter.
///
/// Before every request it asks the refresher for current credentials and
/// attaches `Authorization: <tokenType> <accessToken>` when there are any.
/// A 401 on an authorized request publishes `Unauthenticated`.
#[derive(Clone)]
pub struct RestAdapter {
    rest: RestClient,
    refresher: Arc<TokenRefresher>,
    bus: SessionBus,
}

impl RestAdapter {
    pub fn new(rest: RestClient, refresher: Arc<TokenRefresher>, bus: SessionBus) -> Self {
        Self {
            rest,
            refresher,
            bus,
        }
    }

    pub async fn send<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        options: &RequestOptions,
    ) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let credentials = if options.anonymous {
            None
        } else {
            self.refresher.authorize().await?
        };

        match self
            .rest
            .send(method, path, body, options, credentials.as_ref())
            .await
        {
            Err(ApiError::Unauthorized) if credentials.is_some() => {
                warn!(path = path, "Server rejected credentials");
                self.bus.publish(SessionEvent::Unauthenticated);
                Err(ApiError::Unauthorized)
            }
            other => other,
        }
    }

    pub async fn post<B, T>(&self, path: &str, body: &B, options: &RequestOptions) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(Method::POST, path, Some(body), options).await
    }

    pub async fn get<T>(&self, path: &str, options: &RequestOptions) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        self.send::<(), T>(Method::GET, path, None, options).await
    }
}
