//! Domain types: posts, users, the notifications that carry them into the
//! store, and the store's state.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Identifier of a post
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(u64);

impl PostId {
    /// Creates a `PostId` from its raw value
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw value
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a user
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(u64);

impl UserId {
    /// Creates a `UserId` from its raw value
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw value
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A post as returned by `GET /posts`
///
/// `user_id` references a [`User`]; nothing checks that the user exists.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Unique identifier
    pub id: PostId,
    /// Author of the post
    pub user_id: UserId,
    /// Title (empty when the API omits it)
    #[serde(default)]
    pub title: String,
    /// Body text (empty when the API omits it)
    #[serde(default)]
    pub body: String,
}

impl Post {
    /// Creates an untitled post
    #[must_use]
    pub const fn new(id: u64, user_id: u64) -> Self {
        Self {
            id: PostId::new(id),
            user_id: UserId::new(user_id),
            title: String::new(),
            body: String::new(),
        }
    }

    /// Sets the title
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

/// A user as returned by `GET /users/{id}`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: UserId,
    /// Display name
    pub name: String,
    /// Login handle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Contact address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl User {
    /// Creates a user with only an id and a name
    #[must_use]
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id: UserId::new(id),
            name: name.into(),
            username: None,
            email: None,
        }
    }
}

/// Update notification dispatched to the store after a completed fetch
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification {
    /// The full post collection was fetched
    PostsFetched {
        /// Every post, in API order
        payload: Vec<Post>,
    },
    /// A single user was fetched
    UserFetched {
        /// The fetched user record
        payload: User,
    },
}

impl Notification {
    /// Stable name of the notification kind, for logs
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::PostsFetched { .. } => "POSTS_FETCHED",
            Self::UserFetched { .. } => "USER_FETCHED",
        }
    }
}

/// Everything the store holds
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AppState {
    /// Posts from the latest posts fetch
    pub posts: Vec<Post>,
    /// Every fetched user record, in arrival order; may repeat an id
    pub users: Vec<User>,
}

impl AppState {
    /// First user record with the given id
    #[must_use]
    pub fn find_user(&self, id: UserId) -> Option<&User> {
        self.users.iter().find(|user| user.id == id)
    }

    /// Distinct authors of the current posts
    #[must_use]
    pub fn author_ids(&self) -> Vec<UserId> {
        distinct_author_ids(&self.posts)
    }

    /// Number of user records whose id already appeared earlier in the list
    #[must_use]
    pub fn duplicate_user_records(&self) -> usize {
        let mut seen = HashSet::new();
        self.users.iter().filter(|user| !seen.insert(user.id)).count()
    }
}

/// Distinct `user_id` values of `posts`, in order of first appearance
#[must_use]
pub fn distinct_author_ids(posts: &[Post]) -> Vec<UserId> {
    let mut seen = HashSet::new();
    posts
        .iter()
        .map(|post| post.user_id)
        .filter(|id| seen.insert(*id))
        .collect()
}
