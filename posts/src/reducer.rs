//! Reducers for the post and user collections.
//!
//! Each reducer owns one slice of [`AppState`] and ignores the notifications
//! meant for the other. The root reducer scopes both onto their slices.

use crate::types::{AppState, Notification, Post, User};
use postboard_core::{
    composition::{combine, scope_reducer, CombinedReducer, ScopedReducer},
    reducer::Reducer,
};
use postboard_runtime::{Store, StoreConfig};

/// Replaces the post collection wholesale on every posts fetch
#[derive(Clone, Copy, Debug, Default)]
pub struct PostsReducer;

impl Reducer for PostsReducer {
    type State = Vec<Post>;
    type Action = Notification;
    type Environment = ();

    fn reduce(&self, state: &mut Self::State, action: Self::Action, _env: &Self::Environment) {
        match action {
            Notification::PostsFetched { payload } => *state = payload,
            Notification::UserFetched { .. } => {},
        }
    }
}

/// Appends every fetched user; repeated fetches of one id produce repeated entries
#[derive(Clone, Copy, Debug, Default)]
pub struct UsersReducer;

impl Reducer for UsersReducer {
    type State = Vec<User>;
    type Action = Notification;
    type Environment = ();

    fn reduce(&self, state: &mut Self::State, action: Self::Action, _env: &Self::Environment) {
        match action {
            Notification::UserFetched { payload } => {
                tracing::debug!(user_id = %payload.id, "Appending fetched user");
                state.push(payload);
            },
            Notification::PostsFetched { .. } => {},
        }
    }
}

/// Reducer over the whole [`AppState`]
pub type RootReducer = CombinedReducer<
    ScopedReducer<AppState, PostsReducer>,
    ScopedReducer<AppState, UsersReducer>,
>;

/// The store type the application runs on
pub type PostboardStore = Store<AppState, Notification, (), RootReducer>;

fn posts_slice(state: &mut AppState) -> &mut Vec<Post> {
    &mut state.posts
}

fn users_slice(state: &mut AppState) -> &mut Vec<User> {
    &mut state.users
}

/// Builds the root reducer
#[must_use]
pub fn root_reducer() -> RootReducer {
    combine(
        scope_reducer::<AppState, _>(PostsReducer, posts_slice),
        scope_reducer::<AppState, _>(UsersReducer, users_slice),
    )
}

/// Creates an empty store
#[must_use]
pub fn new_store(config: StoreConfig) -> PostboardStore {
    Store::with_config(AppState::default(), root_reducer(), (), config)
}
