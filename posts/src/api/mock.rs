use super::{ApiError, ApiResult, PlaceholderApi};
use crate::types::{Post, User, UserId};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A request seen by [`MockPlaceholderApi`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApiCall {
    /// `GET /posts`
    Posts,
    /// `GET /users/{id}`
    User(UserId),
}

/// Mock API for testing
///
/// Serves canned posts and users from memory and records every call at the
/// moment the request is issued, before the returned future is polled.
/// Unknown user ids answer with a 404 status error.
#[derive(Clone, Debug, Default)]
pub struct MockPlaceholderApi {
    posts: Vec<Post>,
    users: HashMap<UserId, User>,
    posts_failure: Option<ApiError>,
    user_failures: HashMap<UserId, ApiError>,
    latency: Duration,
    calls: Arc<Mutex<Vec<ApiCall>>>,
}

impl MockPlaceholderApi {
    /// Create an empty mock
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Posts returned by `fetch_posts`
    #[must_use]
    pub fn with_posts(mut self, posts: Vec<Post>) -> Self {
        self.posts = posts;
        self
    }

    /// Add a user served by `fetch_user`
    #[must_use]
    pub fn with_user(mut self, user: User) -> Self {
        self.users.insert(user.id, user);
        self
    }

    /// Make `fetch_posts` fail with `error`
    #[must_use]
    pub fn with_posts_failure(mut self, error: ApiError) -> Self {
        self.posts_failure = Some(error);
        self
    }

    /// Make `fetch_user(id)` fail with `error`
    #[must_use]
    pub fn with_user_failure(mut self, id: UserId, error: ApiError) -> Self {
        self.user_failures.insert(id, error);
        self
    }

    /// Delay every response by `latency`
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Every call so far, in issue order
    #[must_use]
    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    /// Number of `fetch_posts` calls
    #[must_use]
    pub fn posts_calls(&self) -> usize {
        self.calls().iter().filter(|call| matches!(call, ApiCall::Posts)).count()
    }

    /// Ids passed to `fetch_user`, in issue order
    #[must_use]
    pub fn user_calls(&self) -> Vec<UserId> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ApiCall::User(id) => Some(id),
                ApiCall::Posts => None,
            })
            .collect()
    }

    /// Number of calls of either kind
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.calls().len()
    }

    fn record(&self, call: ApiCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn respond<T: Send + 'static>(
        &self,
        result: ApiResult<T>,
    ) -> Pin<Box<dyn Future<Output = ApiResult<T>> + Send>> {
        let latency = self.latency;
        Box::pin(async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            result
        })
    }
}

impl PlaceholderApi for MockPlaceholderApi {
    fn fetch_posts(&self) -> Pin<Box<dyn Future<Output = ApiResult<Vec<Post>>> + Send>> {
        self.record(ApiCall::Posts);

        let result = match &self.posts_failure {
            Some(error) => Err(error.clone()),
            None => Ok(self.posts.clone()),
        };
        self.respond(result)
    }

    fn fetch_user(&self, id: UserId) -> Pin<Box<dyn Future<Output = ApiResult<User>> + Send>> {
        self.record(ApiCall::User(id));

        let result = if let Some(error) = self.user_failures.get(&id) {
            Err(error.clone())
        } else {
            self.users.get(&id).cloned().ok_or_else(|| ApiError::Status {
                url: format!("mock://users/{id}"),
                status: 404,
            })
        };
        self.respond(result)
    }
}
