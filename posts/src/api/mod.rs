//! Placeholder REST API client.
//!
//! The loader talks to the API through [`PlaceholderApi`], so tests swap the
//! real HTTP client for [`MockPlaceholderApi`].

use crate::types::{Post, User, UserId};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// reqwest-backed client
pub mod http;

/// In-memory client for tests and demos
pub mod mock;

pub use http::HttpPlaceholderApi;
pub use mock::{ApiCall, MockPlaceholderApi};

/// API result
pub type ApiResult<T> = Result<T, ApiError>;

/// Failure of a single API request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The request never produced a response (connection, DNS, timeout)
    #[error("request to {url} failed: {message}")]
    Network {
        /// Requested URL
        url: String,
        /// Transport error description
        message: String,
    },

    /// The server answered with a non-success status
    #[error("{url} responded with HTTP {status}")]
    Status {
        /// Requested URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// The response body was not the expected JSON
    #[error("could not decode response from {url}: {message}")]
    Decode {
        /// Requested URL
        url: String,
        /// Decoder error description
        message: String,
    },

    /// The HTTP client could not be constructed
    #[error("HTTP client setup failed: {0}")]
    Setup(String),
}

/// The two endpoints of the placeholder API
pub trait PlaceholderApi: Send + Sync {
    /// `GET /posts`
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the request or decoding fails
    fn fetch_posts(&self) -> Pin<Box<dyn Future<Output = ApiResult<Vec<Post>>> + Send>>;

    /// `GET /users/{id}`
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the request or decoding fails
    fn fetch_user(&self, id: UserId) -> Pin<Box<dyn Future<Output = ApiResult<User>> + Send>>;
}
