//! Reducer composition utilities
//!
//! - **`scope_reducer`**: Focus a reducer on one field of a larger state
//! - **`combine`**: Run two reducers over the same state and action
//!
//! Together they build a root reducer out of independent slice reducers:
//!
//! ```
//! use postboard_core::Reducer;
//! use postboard_core::composition::{combine, scope_reducer};
//!
//! #[derive(Clone, Debug)]
//! enum Msg {
//!     Push(char),
//!     Count,
//! }
//!
//! struct LettersReducer;
//! struct CountReducer;
//!
//! impl Reducer for LettersReducer {
//!     type State = Vec<char>;
//!     type Action = Msg;
//!     type Environment = ();
//!
//!     fn reduce(&self, state: &mut Vec<char>, action: Msg, _env: &()) {
//!         if let Msg::Push(c) = action {
//!             state.push(c);
//!         }
//!     }
//! }
//!
//! impl Reducer for CountReducer {
//!     type State = usize;
//!     type Action = Msg;
//!     type Environment = ();
//!
//!     fn reduce(&self, state: &mut usize, action: Msg, _env: &()) {
//!         if let Msg::Count = action {
//!             *state += 1;
//!         }
//!     }
//! }
//!
//! #[derive(Default)]
//! struct Root {
//!     letters: Vec<char>,
//!     count: usize,
//! }
//!
//! fn letters(root: &mut Root) -> &mut Vec<char> {
//!     &mut root.letters
//! }
//!
//! fn count(root: &mut Root) -> &mut usize {
//!     &mut root.count
//! }
//!
//! let root = combine(
//!     scope_reducer::<Root, _>(LettersReducer, letters),
//!     scope_reducer::<Root, _>(CountReducer, count),
//! );
//!
//! let mut state = Root::default();
//! root.reduce(&mut state, Msg::Push('a'), &());
//! root.reduce(&mut state, Msg::Count, &());
//! assert_eq!(state.letters, vec!['a']);
//! assert_eq!(state.count, 1);
//! ```

use crate::reducer::Reducer;
use std::marker::PhantomData;

/// Scopes a reducer to operate on a field of a larger state.
///
/// `lens` borrows the child state out of the parent. The child reducer mutates
/// it in place, so scoping never clones the sub-state.
pub const fn scope_reducer<S, R>(
    reducer: R,
    lens: fn(&mut S) -> &mut R::State,
) -> ScopedReducer<S, R>
where
    R: Reducer,
{
    ScopedReducer {
        reducer,
        lens,
        _parent: PhantomData,
    }
}

/// A scoped reducer that operates on a subset of state.
///
/// Created by [`scope_reducer`].
pub struct ScopedReducer<S, R>
where
    R: Reducer,
{
    reducer: R,
    lens: fn(&mut S) -> &mut R::State,
    _parent: PhantomData<fn() -> S>,
}

impl<S, R> Clone for ScopedReducer<S, R>
where
    R: Reducer + Clone,
{
    fn clone(&self) -> Self {
        Self {
            reducer: self.reducer.clone(),
            lens: self.lens,
            _parent: PhantomData,
        }
    }
}

impl<S, R> std::fmt::Debug for ScopedReducer<S, R>
where
    R: Reducer + std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedReducer")
            .field("reducer", &self.reducer)
            .finish_non_exhaustive()
    }
}

impl<S, R> Reducer for ScopedReducer<S, R>
where
    R: Reducer,
{
    type State = S;
    type Action = R::Action;
    type Environment = R::Environment;

    fn reduce(&self, state: &mut Self::State, action: Self::Action, env: &Self::Environment) {
        self.reducer.reduce((self.lens)(state), action, env);
    }
}

/// Combines two reducers that share state, action and environment types.
///
/// Both reducers see every action, `first` before `second`.
pub const fn combine<A, B>(first: A, second: B) -> CombinedReducer<A, B>
where
    A: Reducer,
    B: Reducer<State = A::State, Action = A::Action, Environment = A::Environment>,
    A::Action: Clone,
{
    CombinedReducer { first, second }
}

/// Two reducers run in sequence over the same state.
///
/// Created by [`combine`].
#[derive(Debug, Clone)]
pub struct CombinedReducer<A, B> {
    first: A,
    second: B,
}

impl<A, B> Reducer for CombinedReducer<A, B>
where
    A: Reducer,
    B: Reducer<State = A::State, Action = A::Action, Environment = A::Environment>,
    A::Action: Clone,
{
    type State = A::State;
    type Action = A::Action;
    type Environment = A::Environment;

    fn reduce(&self, state: &mut Self::State, action: Self::Action, env: &Self::Environment) {
        self.first.reduce(state, action.clone(), env);
        self.second.reduce(state, action, env);
    }
}
