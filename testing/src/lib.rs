//! # Postboard Testing
//!
//! Testing utilities for the Postboard state container.
//!
//! This crate provides:
//! - [`ReducerTest`]: Given-When-Then harness for reducers
//! - [`init_test_tracing`]: Opt-in log output for tests
//!
//! ## Example
//!
//! ```ignore
//! use postboard_testing::ReducerTest;
//!
//! ReducerTest::new(PostsReducer)
//!     .with_env(())
//!     .given_state(Vec::new())
//!     .when_action(Notification::PostsFetched { payload: posts.clone() })
//!     .then_state(move |state| assert_eq!(state, &posts))
//!     .run();
//! ```

/// Given-When-Then reducer harness
pub mod reducer_test;

pub use reducer_test::ReducerTest;

/// Install a test-friendly tracing subscriber
///
/// Honors `RUST_LOG` and writes through the test harness capture. Calling it
/// more than once is harmless.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_test_tracing_is_idempotent() {
        init_test_tracing();
        init_test_tracing();
    }
}
