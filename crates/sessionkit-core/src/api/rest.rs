//! Raw REST transport for the identity provider.
//!
//! `RestClient` knows how to build a request, convert payload keys to the
//! wire casing and back, and map failures onto `ApiError`. It never looks
//! at the credential store; `RestAdapter` layers authorization on top.

use reqwest::{header, Client, Method};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::debug;

use super::casing::{camelize_keys, decamelize_keys};
use super::ApiError;
use crate::auth::Credentials;

/// Default HTTP request timeout in seconds, see `Config::request_timeout_secs`.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Per-request knobs.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Extra headers, e.g. `Client-Id`
    pub headers: Vec<(String, String)>,
    /// Query string parameters, keys subject to the request transform
    pub params: Vec<(String, String)>,
    /// Never attach `Authorization`, even if credentials exist
    pub anonymous: bool,
    pub skip_request_transform: bool,
    pub skip_response_transform: bool,
    pub preserve_request_keys: Vec<String>,
    pub preserve_response_keys: Vec<String>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn anonymous() -> Self {
        Self {
            anonymous: true,
            ..Self::default()
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    pub fn skip_request_transform(mut self) -> Self {
        self.skip_request_transform = true;
        self
    }

    pub fn skip_response_transform(mut self) -> Self {
        self.skip_response_transform = true;
        self
    }

    pub fn preserve_request_key(mut self, key: impl Into<String>) -> Self {
        self.preserve_request_keys.push(key.into());
        self
    }

    pub fn preserve_response_key(mut self, key: impl Into<String>) -> Self {
        self.preserve_response_keys.push(key.into());
        self
    }

    fn outgoing(&self, value: Value) -> Value {
        if self.skip_request_transform {
            value
        } else {
            decamelize_keys(value, &self.preserve_request_keys)
        }
    }

    fn incoming(&self, value: Value) -> Value {
        if self.skip_response_transform {
            value
        } else {
            camelize_keys(value, &self.preserve_response_keys)
        }
    }

    fn outgoing_params(&self) -> Vec<(String, String)> {
        let params: serde_json::Map<String, Value> = self
            .params
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        match self.outgoing(Value::Object(params)) {
            Value::Object(map) => map
                .into_iter()
                .map(|(k, v)| (k, v.as_str().unwrap_or_default().to_string()))
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// REST client bound to one base URL.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct RestClient {
    client: Client,
    base_url: String,
}

impl RestClient {
    /// Share an existing connection pool.
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send one request and decode the (camelized) JSON response.
    ///
    /// `credentials`, when given, become the `Authorization` header verbatim.
    pub async fn send<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        options: &RequestOptions,
        credentials: Option<&Credentials>,
    ) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        let mut request = self
            .client
            .request(method.clone(), &url)
            .header(header::ACCEPT, "application/json");

        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(credentials) = credentials {
            request = request.header(header::AUTHORIZATION, credentials.authorization_value());
        }
        if !options.params.is_empty() {
            request = request.query(&options.outgoing_params());
        }
        if let Some(body) = body {
            let value = serde_json::to_value(body)
                .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
            request = request.json(&options.outgoing(value));
        }

        debug!(method = %method, url = %url, authorized = credentials.is_some(), "Sending request");
        let response = request.send().await?;
        let response = Self::check_response(response, options).await?;

        let text = response.text().await?;
        let value: Value = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text)
                .map_err(|e| ApiError::InvalidResponse(format!("{} from {}", e, url)))?
        };
        serde_json::from_value(options.incoming(value))
            .map_err(|e| ApiError::InvalidResponse(format!("{} from {}", e, url)))
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(
        response: reqwest::Response,
        options: &RequestOptions,
    ) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(match ApiError::from_status(status, &body) {
            ApiError::Rejected(value) => ApiError::Rejected(options.incoming(value)),
            other => other,
        })
    }
}
