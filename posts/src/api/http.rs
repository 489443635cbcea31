use super::{ApiError, ApiResult, PlaceholderApi};
use crate::config::PostboardConfig;
use crate::types::{Post, User, UserId};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::pin::Pin;

/// Client for a JSONPlaceholder-compatible server
#[derive(Clone, Debug)]
pub struct HttpPlaceholderApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPlaceholderApi {
    /// Creates a client for `base_url` with no request timeout
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Setup`] if the TLS backend cannot be initialized
    pub fn new(base_url: impl Into<String>) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("postboard/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Setup(e.to_string()))?;

        Ok(Self::with_client(client, base_url))
    }

    /// Creates a client from the application configuration
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Setup`] if the TLS backend cannot be initialized
    pub fn from_config(config: &PostboardConfig) -> ApiResult<Self> {
        let mut builder =
            reqwest::Client::builder().user_agent(concat!("postboard/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| ApiError::Setup(e.to_string()))?;

        Ok(Self::with_client(client, config.base_url.clone()))
    }

    /// Wraps an existing reqwest client
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    /// Base URL every path is resolved against
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

async fn get_json<T: DeserializeOwned>(client: reqwest::Client, url: String) -> ApiResult<T> {
    tracing::debug!(%url, "GET");

    let response = client.get(&url).send().await.map_err(|e| ApiError::Network {
        url: url.clone(),
        message: e.to_string(),
    })?;

    let status = response.status();
    if !status.is_success() {
        tracing::warn!(%url, status = status.as_u16(), "Request rejected");
        return Err(ApiError::Status {
            url,
            status: status.as_u16(),
        });
    }

    let body = response.bytes().await.map_err(|e| ApiError::Network {
        url: url.clone(),
        message: e.to_string(),
    })?;

    serde_json::from_slice(&body).map_err(|e| ApiError::Decode {
        url,
        message: e.to_string(),
    })
}

impl PlaceholderApi for HttpPlaceholderApi {
    fn fetch_posts(&self) -> Pin<Box<dyn Future<Output = ApiResult<Vec<Post>>> + Send>> {
        Box::pin(get_json(self.client.clone(), self.url("posts")))
    }

    fn fetch_user(&self, id: UserId) -> Pin<Box<dyn Future<Output = ApiResult<User>> + Send>> {
        Box::pin(get_json(self.client.clone(), self.url(&format!("users/{id}"))))
    }
}
