//! # Postboard Runtime
//!
//! The Store runtime that owns application state, runs reducers and tracks the
//! background work that feeds actions into it.
//!
//! ## Core Components
//!
//! - **Store**: Shared handle to the state container
//! - **Tracked work**: Tasks started through [`Store::spawn_tracked`]; shutdown
//!   waits for them
//! - **Action Broadcast**: Every reduced action is published to observers
//!
//! ## Example
//!
//! ```ignore
//! use postboard_runtime::Store;
//!
//! let store = Store::new(AppState::default(), root_reducer(), ());
//!
//! // Dispatch an action
//! store.send(Notification::PostsFetched { payload: posts }).await?;
//!
//! // Read state
//! let count = store.state(|s| s.posts.len()).await;
//! ```

use postboard_core::reducer::Reducer;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

/// Bounded queue for operations that failed
pub mod dead_letter;

pub use dead_letter::{DeadLetter, DeadLetterQueue};

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions or work
        ///
        /// Returned when `send()` is called from outside tracked work, or
        /// `spawn_tracked()` is called, after shutdown was initiated.
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for tracked work to complete
        #[error("Shutdown timed out with {0} tasks still running")]
        ShutdownTimeout(usize),
    }
}

pub use error::StoreError;

/// Configuration for Store instances
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Capacity of the action broadcast channel
    pub broadcast_capacity: usize,
    /// Timeout used by callers that shut the store down without a deadline of their own
    pub shutdown_timeout: Duration,
}

impl StoreConfig {
    /// Set the action broadcast capacity (minimum 1)
    #[must_use]
    pub fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity.max(1);
        self
    }

    /// Set the shutdown timeout
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 64,
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

tokio::task_local! {
    /// Set for the lifetime of every task started by `spawn_tracked`
    static TRACKED_WORK: ();
}

/// Whether the current task was started by [`Store::spawn_tracked`]
fn in_tracked_work() -> bool {
    TRACKED_WORK.try_with(|_| ()).is_ok()
}

/// Guard that decrements an atomic counter on drop (for shutdown tracking)
///
/// Keeps the counter correct even when the tracked task panics.
struct AtomicCounterGuard(Arc<AtomicUsize>);

impl Drop for AtomicCounterGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Store runtime for coordinating reducer execution and tracked work.
pub mod store {
    use super::{
        in_tracked_work, Arc, AtomicBool, AtomicCounterGuard, AtomicUsize, Duration, Ordering,
        Reducer, RwLock, StoreConfig, StoreError, TRACKED_WORK,
    };
    use std::future::Future;
    use tokio::sync::broadcast;
    use tokio::task::JoinHandle;

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock`; reductions are serialized on the write lock)
    /// 2. Reducer
    /// 3. Environment (injected dependencies)
    /// 4. Background work started through [`spawn_tracked`](Self::spawn_tracked)
    ///
    /// Cloning a Store is cheap and every clone shares the same state.
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: Arc<R>,
        environment: Arc<E>,
        config: StoreConfig,
        shutdown: Arc<AtomicBool>,
        pending_tasks: Arc<AtomicUsize>,
        /// Every reduced action, in reduction order.
        action_broadcast: broadcast::Sender<A>,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Send + Clone + 'static,
        S: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_config(initial_state, reducer, environment, StoreConfig::default())
        }

        /// Create a store with a custom configuration
        #[must_use]
        pub fn with_config(initial_state: S, reducer: R, environment: E, config: StoreConfig) -> Self {
            let (action_broadcast, _) = broadcast::channel(config.broadcast_capacity.max(1));

            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer: Arc::new(reducer),
                environment: Arc::new(environment),
                config,
                shutdown: Arc::new(AtomicBool::new(false)),
                pending_tasks: Arc::new(AtomicUsize::new(0)),
                action_broadcast,
            }
        }

        /// The configuration this store was built with
        #[must_use]
        pub const fn config(&self) -> &StoreConfig {
            &self.config
        }

        /// Number of tracked tasks still running
        #[must_use]
        pub fn pending_tasks(&self) -> usize {
            self.pending_tasks.load(Ordering::SeqCst)
        }

        /// Initiate graceful shutdown
        ///
        /// From now on new tracked work is refused and actions sent from
        /// outside tracked work are rejected. Tracked tasks already running
        /// may still dispatch; the call waits for all of them to finish.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if tracked tasks are still
        /// running when the timeout elapses.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            tracing::info!("Initiating graceful shutdown");
            metrics::counter!("store.shutdown.initiated").increment(1);

            self.shutdown.store(true, Ordering::SeqCst);

            let start = std::time::Instant::now();
            let poll_interval = Duration::from_millis(20);

            loop {
                let pending = self.pending_tasks.load(Ordering::SeqCst);

                if pending == 0 {
                    tracing::info!("All tracked tasks completed, shutdown successful");
                    return Ok(());
                }

                if start.elapsed() >= timeout {
                    tracing::error!(pending_tasks = pending, "Shutdown timeout");
                    metrics::counter!("store.shutdown.timeout").increment(1);
                    return Err(StoreError::ShutdownTimeout(pending));
                }

                tracing::debug!(pending_tasks = pending, "Waiting for tracked tasks to complete");
                tokio::time::sleep(poll_interval).await;
            }
        }

        /// Send an action to the store
        ///
        /// 1. Acquires the write lock on state
        /// 2. Calls the reducer with (state, action, environment)
        /// 3. Broadcasts the action to observers
        ///
        /// Concurrent sends are reduced one at a time in the order they
        /// acquire the lock.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting
        /// down and the caller is not tracked work.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<(), StoreError> {
            if self.shutdown.load(Ordering::SeqCst) && !in_tracked_work() {
                tracing::warn!("Rejected action: store is shutting down");
                metrics::counter!("store.shutdown.rejected_actions").increment(1);
                return Err(StoreError::ShutdownInProgress);
            }

            metrics::counter!("store.commands.total").increment(1);

            let mut state = self.state.write().await;

            let span = tracing::debug_span!("reducer_execution");
            let _enter = span.enter();

            let start = std::time::Instant::now();
            let observed = action.clone();
            self.reducer.reduce(&mut *state, action, &self.environment);
            metrics::histogram!("store.reducer.duration_seconds")
                .record(start.elapsed().as_secs_f64());

            // Broadcast while still holding the lock so observers see
            // actions in reduction order
            let _ = self.action_broadcast.send(observed);

            tracing::trace!("Reducer completed");
            Ok(())
        }

        /// Subscribe to every action reduced by this store
        ///
        /// A lagging receiver skips old actions and gets
        /// [`broadcast::error::RecvError::Lagged`].
        #[must_use]
        pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
            self.action_broadcast.subscribe()
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let post_count = store.state(|s| s.posts.len()).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&*state)
        }

        /// Spawn background work that [`shutdown`](Self::shutdown) waits for
        ///
        /// The work may keep dispatching through [`send`](Self::send) while
        /// the store drains. A panicking task is isolated in its task and
        /// still counts as finished.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] once shutdown was
        /// initiated.
        pub fn spawn_tracked<F>(&self, work: F) -> Result<JoinHandle<F::Output>, StoreError>
        where
            F: Future + Send + 'static,
            F::Output: Send + 'static,
        {
            // Count first so a concurrent shutdown either sees this task or
            // we see its flag
            self.pending_tasks.fetch_add(1, Ordering::SeqCst);
            let guard = AtomicCounterGuard(Arc::clone(&self.pending_tasks));

            if self.shutdown.load(Ordering::SeqCst) {
                tracing::warn!("Rejected tracked work: store is shutting down");
                metrics::counter!("store.shutdown.rejected_tasks").increment(1);
                return Err(StoreError::ShutdownInProgress);
            }

            metrics::counter!("store.tasks.spawned").increment(1);

            Ok(tokio::spawn(TRACKED_WORK.scope((), async move {
                let _guard = guard;
                work.await
            })))
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: Arc::clone(&self.reducer),
                environment: Arc::clone(&self.environment),
                config: self.config.clone(),
                shutdown: Arc::clone(&self.shutdown),
                pending_tasks: Arc::clone(&self.pending_tasks),
                action_broadcast: self.action_broadcast.clone(),
            }
        }
    }
}

pub use store::Store;
