//! Application configuration management.
//!
//! This module handles loading and saving the client configuration: where
//! the identity provider and the GraphQL API live, and which OAuth client
//! this application authenticates as.
//!
//! Configuration is stored at `~/.config/sessionkit/config.json`. The
//! `AUTH_URL`, `API_URL` and `AUTH_CLIENT_ID` environment variables override
//! whatever the file says.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::api::rest::DEFAULT_REQUEST_TIMEOUT_SECS;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "sessionkit";

/// Config file name
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Base URL of the identity provider (token, revoke, sign-up endpoints)
    pub auth_url: String,
    /// Full URL of the GraphQL endpoint
    pub api_url: String,
    pub client_id: String,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auth_url: String::new(),
            api_url: String::new(),
            client_id: String::new(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Config {
    pub fn new(
        auth_url: impl Into<String>,
        api_url: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Self {
        Self {
            auth_url: auth_url.into(),
            api_url: api_url.into(),
            client_id: client_id.into(),
            ..Self::default()
        }
    }

    /// Load from the config file (if any), then apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            Self::default()
        };
        config.apply_env_with(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply overrides from `lookup`; empty values are ignored.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(url) = get("AUTH_URL") {
            self.auth_url = url;
        }
        if let Some(url) = get("API_URL") {
            self.api_url = url;
        }
        if let Some(id) = get("AUTH_CLIENT_ID") {
            self.client_id = id;
        }
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory for the persisted GraphQL cache and other non-secret state.
    pub fn cache_dir() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, url) in [("auth URL", &self.auth_url), ("API URL", &self.api_url)] {
            if url.trim().is_empty() {
                bail!("No {} configured", name);
            }
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                bail!("The {} must be an http(s) URL, got '{}'", name, url);
            }
        }
        if self.client_id.trim().is_empty() {
            bail!("No OAuth client id configured");
        }
        if self.request_timeout_secs == 0 {
            bail!("Request timeout must be at least one second");
        }
        Ok(())
    }
}
