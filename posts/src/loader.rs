//! Fetch orchestration.
//!
//! [`Loader`] issues API requests and dispatches a notification to the store
//! for every successful response. [`Loader::load_posts_and_authors`] loads the
//! post collection and then fans out one user fetch per distinct author as
//! independent tasks.

use crate::api::{ApiError, PlaceholderApi};
use crate::config::ConfigError;
use crate::reducer::PostboardStore;
use crate::types::{AppState, Notification, UserId};
use postboard_runtime::{DeadLetterQueue, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::Instrument;

/// Whether repeated `load_user` calls for one id hit the API again
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserFetchPolicy {
    /// Every call issues a request
    #[default]
    Always,
    /// Only the first call for an id issues a request, whatever its outcome
    Memoized,
}

impl FromStr for UserFetchPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "always" => Ok(Self::Always),
            "memoized" => Ok(Self::Memoized),
            _ => Err(ConfigError::UnknownVariant {
                field: "user_fetch",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for UserFetchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always => f.write_str("always"),
            Self::Memoized => f.write_str("memoized"),
        }
    }
}

/// Loader errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// The API request failed
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The store rejected the notification
    #[error("store rejected notification: {0}")]
    Store(#[from] StoreError),

    /// A spawned user fetch panicked or was cancelled
    #[error("fetch task for user {user_id} failed: {message}")]
    TaskFailed {
        /// User the task was fetching
        user_id: UserId,
        /// Join error description
        message: String,
    },
}

/// Outcome of a successful [`Loader::load_user`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserLoad {
    /// The user was fetched and dispatched
    Fetched,
    /// Skipped under [`UserFetchPolicy::Memoized`]: the id was requested before
    AlreadyRequested,
}

/// Issues API requests and feeds the results into the store
#[derive(Clone)]
pub struct Loader {
    store: PostboardStore,
    api: Arc<dyn PlaceholderApi>,
    policy: UserFetchPolicy,
    requested: Arc<Mutex<HashSet<UserId>>>,
    failures: DeadLetterQueue<UserId>,
}

impl Loader {
    /// Creates a loader with the [`UserFetchPolicy::Always`] policy
    #[must_use]
    pub fn new(store: PostboardStore, api: Arc<dyn PlaceholderApi>) -> Self {
        Self {
            store,
            api,
            policy: UserFetchPolicy::default(),
            requested: Arc::new(Mutex::new(HashSet::new())),
            failures: DeadLetterQueue::default(),
        }
    }

    /// Sets the user fetch policy
    #[must_use]
    pub const fn with_policy(mut self, policy: UserFetchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replaces the failure queue with an empty one holding at most `size` entries
    #[must_use]
    pub fn with_failure_queue_size(mut self, size: usize) -> Self {
        self.failures = DeadLetterQueue::new(size);
        self
    }

    /// The store notifications are dispatched to
    #[must_use]
    pub const fn store(&self) -> &PostboardStore {
        &self.store
    }

    /// The active user fetch policy
    #[must_use]
    pub const fn policy(&self) -> UserFetchPolicy {
        self.policy
    }

    /// Every failed user fetch of the fan-out and of header mounts
    #[must_use]
    pub const fn failures(&self) -> &DeadLetterQueue<UserId> {
        &self.failures
    }

    /// Fetches every post and dispatches [`Notification::PostsFetched`]
    ///
    /// Returns the number of posts loaded.
    ///
    /// # Errors
    ///
    /// - [`LoadError::Api`]: the request failed; nothing is dispatched
    /// - [`LoadError::Store`]: the store is shutting down
    #[tracing::instrument(skip(self), name = "load_posts")]
    pub async fn load_posts(&self) -> Result<usize, LoadError> {
        let posts = self.api.fetch_posts().await.inspect_err(|error| {
            tracing::error!(%error, "Posts fetch failed");
        })?;

        let count = posts.len();
        self.store.send(Notification::PostsFetched { payload: posts }).await?;

        tracing::info!(count, "Posts loaded");
        Ok(count)
    }

    /// Fetches one user and dispatches [`Notification::UserFetched`]
    ///
    /// # Errors
    ///
    /// - [`LoadError::Api`]: the request failed; nothing is dispatched
    /// - [`LoadError::Store`]: the store is shutting down
    #[tracing::instrument(skip(self), name = "load_user")]
    pub async fn load_user(&self, user_id: UserId) -> Result<UserLoad, LoadError> {
        if self.policy == UserFetchPolicy::Memoized && !self.mark_requested(user_id) {
            tracing::debug!(%user_id, "User already requested, skipping");
            return Ok(UserLoad::AlreadyRequested);
        }

        let user = self.api.fetch_user(user_id).await?;
        self.store.send(Notification::UserFetched { payload: user }).await?;

        tracing::debug!(%user_id, "User loaded");
        Ok(UserLoad::Fetched)
    }

    /// Loads the posts, then starts one user fetch per distinct author
    ///
    /// The user fetches run as tasks tracked by the store and are not awaited
    /// here; the returned [`AuthorFetches`] can wait for them or be dropped to
    /// let them run on their own. Either way every failed fetch is logged and
    /// pushed to [`failures`](Self::failures), and a store shutdown waits for
    /// the fetches still in flight.
    ///
    /// # Errors
    ///
    /// Any error of [`load_posts`](Self::load_posts), unchanged. No user
    /// fetch is started in that case. [`LoadError::Store`] if the store
    /// starts shutting down before every fetch is spawned.
    #[tracing::instrument(skip(self), name = "load_posts_and_authors")]
    pub async fn load_posts_and_authors(&self) -> Result<AuthorFetches, LoadError> {
        self.load_posts().await?;

        let authors = self.store.state(AppState::author_ids).await;
        tracing::info!(authors = authors.len(), "Fetching post authors");

        let tasks = authors
            .into_iter()
            .map(|user_id| {
                let loader = self.clone();
                let fetch = async move {
                    let result = loader.load_user(user_id).await;
                    if let Err(error) = &result {
                        loader.record_failure(user_id, error);
                    }
                    result
                };
                let task = self.store.spawn_tracked(fetch.in_current_span())?;
                Ok((user_id, task))
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        Ok(AuthorFetches {
            tasks,
            failures: self.failures.clone(),
        })
    }

    /// Logs a failed user fetch and pushes it onto the failure queue
    pub fn record_failure(&self, user_id: UserId, error: &LoadError) {
        tracing::warn!(%user_id, %error, "User fetch failed");
        self.failures.push(user_id, error.to_string());
    }

    /// Returns `true` the first time an id is seen
    fn mark_requested(&self, user_id: UserId) -> bool {
        self.requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user_id)
    }
}

/// Handle to the user fetches started by [`Loader::load_posts_and_authors`]
///
/// Dropping the handle detaches the tasks; they keep running and still
/// report their errors to the loader's failure queue.
#[derive(Debug)]
#[must_use = "call `wait` to collect the results, or `detach` to let the fetches run on their own"]
pub struct AuthorFetches {
    tasks: Vec<(UserId, JoinHandle<Result<UserLoad, LoadError>>)>,
    failures: DeadLetterQueue<UserId>,
}

impl AuthorFetches {
    /// Authors being fetched, in first-seen order
    #[must_use]
    pub fn user_ids(&self) -> Vec<UserId> {
        self.tasks.iter().map(|(id, _)| *id).collect()
    }

    /// Number of fetches
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// `true` when the posts had no authors
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Waits for every fetch and reports the outcome of each
    pub async fn wait(self) -> FanOutReport {
        let Self { tasks, failures } = self;
        let (ids, handles): (Vec<_>, Vec<_>) = tasks.into_iter().unzip();

        let results = futures::future::join_all(handles).await;

        let mut report = FanOutReport::default();
        for (user_id, joined) in ids.into_iter().zip(results) {
            match joined {
                Ok(Ok(UserLoad::Fetched)) => report.fetched.push(user_id),
                Ok(Ok(UserLoad::AlreadyRequested)) => report.skipped.push(user_id),
                Ok(Err(error)) => report.failed.push((user_id, error)),
                Err(join_error) => {
                    let error = task_failed(user_id, &join_error, &failures);
                    report.failed.push((user_id, error));
                },
            }
        }

        tracing::info!(
            fetched = report.fetched.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Author fetches finished"
        );
        report
    }

    /// Lets the fetches run without a waiter
    ///
    /// A task that panics is still reported to the failure queue.
    pub fn detach(self) {
        let Self { tasks, failures } = self;
        if tasks.is_empty() {
            return;
        }

        tokio::spawn(async move {
            for (user_id, task) in tasks {
                if let Err(join_error) = task.await {
                    task_failed(user_id, &join_error, &failures);
                }
            }
        });
    }
}

fn task_failed(
    user_id: UserId,
    join_error: &tokio::task::JoinError,
    failures: &DeadLetterQueue<UserId>,
) -> LoadError {
    let error = LoadError::TaskFailed {
        user_id,
        message: join_error.to_string(),
    };
    tracing::error!(%user_id, %error, "User fetch task died");
    failures.push(user_id, error.to_string());
    error
}

/// Outcome of a fan-out, per author
#[derive(Debug, Default)]
pub struct FanOutReport {
    /// Users fetched and dispatched
    pub fetched: Vec<UserId>,
    /// Users skipped because they were requested before
    pub skipped: Vec<UserId>,
    /// Users whose fetch failed, with the error
    pub failed: Vec<(UserId, LoadError)>,
}

impl FanOutReport {
    /// `true` when no fetch failed
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::api::MockPlaceholderApi;
    use crate::reducer::new_store;
    use crate::types::{Post, User};
    use postboard_runtime::StoreConfig;
    use std::time::Duration;

    fn scenario_api() -> MockPlaceholderApi {
        MockPlaceholderApi::new()
            .with_posts(vec![Post::new(1, 10), Post::new(2, 10), Post::new(3, 20)])
            .with_user(User::new(10, "Alice"))
            .with_user(User::new(20, "Bob"))
    }

    fn loader_for(api: &MockPlaceholderApi) -> Loader {
        Loader::new(new_store(StoreConfig::default()), Arc::new(api.clone()))
    }

    #[tokio::test]
    async fn test_fan_out_issues_one_call_per_distinct_author() {
        let api = scenario_api();
        let loader = loader_for(&api);

        let fetches = loader.load_posts_and_authors().await.unwrap();
        assert_eq!(fetches.user_ids(), vec![UserId::new(10), UserId::new(20)]);

        let report = fetches.wait().await;
        assert!(report.is_success());
        assert_eq!(report.fetched, vec![UserId::new(10), UserId::new(20)]);

        assert_eq!(api.posts_calls(), 1);
        assert_eq!(api.total_calls(), 1 + 2);

        let state = loader.store().state(Clone::clone).await;
        assert_eq!(state.posts.len(), 3);
        assert_eq!(state.users.len(), 2);
    }

    #[tokio::test]
    async fn test_fan_out_is_not_awaited() {
        let api = scenario_api().with_latency(Duration::from_millis(50));
        let loader = loader_for(&api);

        let fetches = loader.load_posts_and_authors().await.unwrap();

        // Posts are in, users still in flight
        let users = loader.store().state(|s| s.users.len()).await;
        assert_eq!(users, 0);

        fetches.wait().await;
        let users = loader.store().state(|s| s.users.len()).await;
        assert_eq!(users, 2);
    }

    #[tokio::test]
    async fn test_posts_failure_aborts_fan_out() {
        let boom = ApiError::Status {
            url: "mock://posts".to_string(),
            status: 503,
        };
        let api = scenario_api().with_posts_failure(boom.clone());
        let loader = loader_for(&api);

        let err = loader.load_posts_and_authors().await.unwrap_err();

        assert_eq!(err, LoadError::Api(boom));
        assert!(api.user_calls().is_empty());
        assert!(loader.store().state(|s| s.posts.is_empty()).await);
    }

    #[tokio::test]
    async fn test_memoized_policy_fetches_once() {
        let api = scenario_api();
        let loader = loader_for(&api).with_policy(UserFetchPolicy::Memoized);

        assert_eq!(loader.load_user(UserId::new(10)).await.unwrap(), UserLoad::Fetched);
        assert_eq!(
            loader.load_user(UserId::new(10)).await.unwrap(),
            UserLoad::AlreadyRequested
        );

        assert_eq!(api.user_calls(), vec![UserId::new(10)]);
        assert_eq!(loader.store().state(|s| s.users.len()).await, 1);
    }

    #[tokio::test]
    async fn test_memoized_policy_does_not_retry_failures() {
        let api = MockPlaceholderApi::new();
        let loader = loader_for(&api).with_policy(UserFetchPolicy::Memoized);

        assert!(loader.load_user(UserId::new(7)).await.is_err());
        assert_eq!(
            loader.load_user(UserId::new(7)).await.unwrap(),
            UserLoad::AlreadyRequested
        );
        assert_eq!(api.user_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_always_policy_duplicates_user_records() {
        let api = scenario_api();
        let loader = loader_for(&api);

        loader.load_user(UserId::new(10)).await.unwrap();
        loader.load_user(UserId::new(10)).await.unwrap();

        assert_eq!(api.user_calls().len(), 2);
        let state = loader.store().state(Clone::clone).await;
        assert_eq!(state.users.len(), 2);
        assert_eq!(state.duplicate_user_records(), 1);
    }

    #[tokio::test]
    async fn test_failed_author_fetch_is_reported_and_queued() {
        let api = MockPlaceholderApi::new()
            .with_posts(vec![Post::new(1, 10), Post::new(2, 20)])
            .with_user(User::new(10, "Alice"));
        let loader = loader_for(&api);

        let report = loader.load_posts_and_authors().await.unwrap().wait().await;

        assert_eq!(report.fetched, vec![UserId::new(10)]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, UserId::new(20));
        assert!(matches!(
            report.failed[0].1,
            LoadError::Api(ApiError::Status { status: 404, .. })
        ));

        let queued = loader.failures().snapshot();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].payload, UserId::new(20));
    }

    #[tokio::test]
    async fn test_detached_fetches_still_report_failures() {
        let api = MockPlaceholderApi::new().with_posts(vec![Post::new(1, 30)]);
        let loader = loader_for(&api);

        loader.load_posts_and_authors().await.unwrap().detach();

        for _ in 0..100 {
            if !loader.failures().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(loader.failures().snapshot()[0].payload, UserId::new(30));
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_author_fetches() {
        let api = scenario_api().with_latency(Duration::from_millis(50));
        let loader = loader_for(&api);

        let fetches = loader.load_posts_and_authors().await.unwrap();
        assert_eq!(loader.store().pending_tasks(), 2);

        loader.store().shutdown(Duration::from_secs(5)).await.unwrap();

        assert_eq!(loader.store().pending_tasks(), 0);
        assert_eq!(loader.store().state(|s| s.users.len()).await, 2);

        let report = fetches.wait().await;
        assert!(report.is_success());
        assert_eq!(report.fetched, vec![UserId::new(10), UserId::new(20)]);
        assert!(loader.failures().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_after_shutdown_is_store_error() {
        let api = scenario_api();
        let loader = loader_for(&api);
        loader.store().shutdown(Duration::from_secs(1)).await.unwrap();

        let err = loader.load_posts().await.unwrap_err();
        assert_eq!(err, LoadError::Store(StoreError::ShutdownInProgress));
    }

    #[test]
    fn test_policy_parses_and_displays() {
        assert_eq!("memoized".parse::<UserFetchPolicy>().unwrap(), UserFetchPolicy::Memoized);
        assert_eq!(" Always ".parse::<UserFetchPolicy>().unwrap(), UserFetchPolicy::Always);
        assert!("sometimes".parse::<UserFetchPolicy>().is_err());
        assert_eq!(UserFetchPolicy::Memoized.to_string(), "memoized");
    }
}
