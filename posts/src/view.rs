//! Author headers and the post list that shows them.
//!
//! A header renders the name of the first user in the store whose id matches
//! its `user_id`, or nothing while that user is absent. Whether a header
//! triggers the fetch itself is decided by [`HeaderStrategy`].

use crate::config::ConfigError;
use crate::loader::{LoadError, Loader, UserLoad};
use crate::reducer::PostboardStore;
use crate::types::{AppState, Post, PostId, User, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fmt::Write as _;
use std::str::FromStr;

/// How a header obtains the user it shows
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HeaderStrategy {
    /// Never fetch; rely on the author fan-out
    #[default]
    Pull,
    /// Fetch the user on first mount
    FetchOnMount,
}

impl FromStr for HeaderStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pull" => Ok(Self::Pull),
            "fetch-on-mount" => Ok(Self::FetchOnMount),
            _ => Err(ConfigError::UnknownVariant {
                field: "header",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for HeaderStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pull => f.write_str("pull"),
            Self::FetchOnMount => f.write_str("fetch-on-mount"),
        }
    }
}

/// Header naming the author of a post
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserHeader {
    user_id: UserId,
    strategy: HeaderStrategy,
    mounted: bool,
}

impl UserHeader {
    /// Creates an unmounted header
    #[must_use]
    pub const fn new(user_id: UserId, strategy: HeaderStrategy) -> Self {
        Self {
            user_id,
            strategy,
            mounted: false,
        }
    }

    /// The user this header shows
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Whether [`mount`](Self::mount) has run
    #[must_use]
    pub const fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Name of the first matching user, if any
    #[must_use]
    pub fn render<'a>(&self, users: &'a [User]) -> Option<&'a str> {
        users
            .iter()
            .find(|user| user.id == self.user_id)
            .map(|user| user.name.as_str())
    }

    /// [`render`](Self::render) against the store's current users
    pub async fn render_from(&self, store: &PostboardStore) -> Option<String> {
        store
            .state(|state| self.render(&state.users).map(str::to_owned))
            .await
    }

    /// Mounts the header
    ///
    /// Under [`HeaderStrategy::FetchOnMount`] the first mount loads the user;
    /// every other mount does nothing and returns `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Any error of [`Loader::load_user`]. The header counts as mounted
    /// even then, so the fetch is not repeated.
    pub async fn mount(&mut self, loader: &Loader) -> Result<Option<UserLoad>, LoadError> {
        if self.mounted {
            return Ok(None);
        }
        self.mounted = true;

        match self.strategy {
            HeaderStrategy::Pull => Ok(None),
            HeaderStrategy::FetchOnMount => loader.load_user(self.user_id).await.map(Some),
        }
    }
}

#[derive(Clone, Debug)]
struct Row {
    post: Post,
    header: UserHeader,
}

/// Posts with an author header each
#[derive(Clone, Debug, Default)]
pub struct PostList {
    strategy: HeaderStrategy,
    rows: Vec<Row>,
}

impl PostList {
    /// Creates an empty list whose headers use `strategy`
    #[must_use]
    pub const fn new(strategy: HeaderStrategy) -> Self {
        Self {
            strategy,
            rows: Vec::new(),
        }
    }

    /// Number of rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// `true` when there are no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rebuilds the rows from `posts`
    ///
    /// A post already shown with the same author keeps its header, mounted
    /// state included.
    pub fn sync(&mut self, posts: &[Post]) {
        let mut previous: HashMap<PostId, UserHeader> = self
            .rows
            .drain(..)
            .map(|row| (row.post.id, row.header))
            .collect();

        self.rows = posts
            .iter()
            .map(|post| {
                let header = previous
                    .remove(&post.id)
                    .filter(|header| header.user_id == post.user_id)
                    .unwrap_or_else(|| UserHeader::new(post.user_id, self.strategy));
                Row {
                    post: post.clone(),
                    header,
                }
            })
            .collect();
    }

    /// Mounts every header concurrently
    ///
    /// Failed fetches are recorded on the loader's failure queue and
    /// returned.
    pub async fn mount(&mut self, loader: &Loader) -> Vec<(UserId, LoadError)> {
        let results = futures::future::join_all(self.rows.iter_mut().map(|row| async move {
            let user_id = row.header.user_id();
            (user_id, row.header.mount(loader).await)
        }))
        .await;

        results
            .into_iter()
            .filter_map(|(user_id, result)| result.err().map(|error| (user_id, error)))
            .inspect(|(user_id, error)| loader.record_failure(*user_id, error))
            .collect()
    }

    /// Renders each post followed by its author line, when the author is known
    #[must_use]
    pub fn render(&self, state: &AppState) -> String {
        let mut out = String::new();
        for row in &self.rows {
            let _ = writeln!(out, "[{}] {}", row.post.id, row.post.title);
            if let Some(name) = row.header.render(&state.users) {
                let _ = writeln!(out, "    by {name}");
            }
        }
        out
    }
}
