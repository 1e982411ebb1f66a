//! Composition root.
//!
//! Everything that shares state (the store, the bus, the refresher, the
//! HTTP connection pool) is created exactly once here and handed to the
//! pieces that need it. Nothing in the crate reaches for a global.

use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Client;
use tracing::info;

use crate::api::{RestAdapter, RestClient};
use crate::auth::{CredentialStore, TokenRefresher, ValidationHashCache};
use crate::config::Config;
use crate::graphql::GraphqlClient;
use crate::session::{Session, SessionBus};
use crate::storage::KeyValueStore;

pub struct AppContext {
    config: Config,
    bus: SessionBus,
    credentials: CredentialStore,
    rest: RestAdapter,
    graphql: Arc<GraphqlClient>,
    session: Session,
}

impl AppContext {
    /// Wire everything against a single store.
    pub async fn connect(config: Config, store: Arc<dyn KeyValueStore>) -> Result<Self> {
        Self::connect_with(config, store.clone(), store).await
    }

    /// Wire everything, keeping secrets (credentials, validation hash) in
    /// `secure` and the GraphQL response cache in `cache`.
    pub async fn connect_with(
        config: Config,
        secure: Arc<dyn KeyValueStore>,
        cache: Arc<dyn KeyValueStore>,
    ) -> Result<Self> {
        config.validate()?;

        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("Failed to build HTTP client")?;

        let bus = SessionBus::new();
        let credentials = CredentialStore::new(secure.clone());
        let identity = RestClient::with_client(http.clone(), config.auth_url.as_str());

        let refresher = Arc::new(TokenRefresher::new(
            credentials.clone(),
            identity.clone(),
            config.client_id.as_str(),
            bus.clone(),
        ));
        let rest = RestAdapter::new(identity, refresher.clone(), bus.clone());
        let graphql = Arc::new(
            GraphqlClient::connect(http, config.api_url.as_str(), refresher, bus.clone(), cache)
                .await,
        );

        let session = Session::new(
            config.client_id.as_str(),
            credentials.clone(),
            ValidationHashCache::new(secure),
            rest.clone(),
            graphql.clone(),
            &bus,
        );

        info!(auth_url = %config.auth_url, api_url = %config.api_url, "Session context ready");
        Ok(Self {
            config,
            bus,
            credentials,
            rest,
            graphql,
            session,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Authorized REST transport against the identity provider.
    pub fn rest(&self) -> &RestAdapter {
        &self.rest
    }

    pub fn graphql(&self) -> &GraphqlClient {
        &self.graphql
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn bus(&self) -> &SessionBus {
        &self.bus
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
