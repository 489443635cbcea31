//! # Postboard
//!
//! Loads posts and their authors from a JSONPlaceholder-style REST API into a
//! reducer-driven store, and renders each post with an author header.
//!
//! - [`api`]: the two API endpoints behind [`PlaceholderApi`], with an HTTP
//!   client and an in-memory mock
//! - [`loader`]: fetch orchestration; one posts fetch, then one independent
//!   user fetch per distinct author
//! - [`reducer`]: the posts and users reducers and the store type
//! - [`view`]: author headers and the post list
//! - [`config`]: environment-driven configuration
//!
//! ## Example
//!
//! ```no_run
//! use postboard::{HttpPlaceholderApi, Loader, new_store};
//! use postboard_runtime::StoreConfig;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let api = HttpPlaceholderApi::new("https://jsonplaceholder.typicode.com")?;
//! let loader = Loader::new(new_store(StoreConfig::default()), Arc::new(api));
//!
//! let report = loader.load_posts_and_authors().await?.wait().await;
//! println!("{} authors fetched", report.fetched.len());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod loader;
pub mod reducer;
pub mod types;
pub mod view;

pub use api::{ApiError, HttpPlaceholderApi, MockPlaceholderApi, PlaceholderApi};
pub use config::{ConfigError, PostboardConfig};
pub use loader::{AuthorFetches, FanOutReport, LoadError, Loader, UserFetchPolicy, UserLoad};
pub use reducer::{new_store, root_reducer, PostboardStore, PostsReducer, UsersReducer};
pub use types::{AppState, Notification, Post, PostId, User, UserId};
pub use view::{HeaderStrategy, PostList, UserHeader};
