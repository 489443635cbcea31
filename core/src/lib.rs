//! # Postboard Core
//!
//! Core traits for the Postboard state container.
//!
//! A Postboard application keeps all client-side data in one state value and
//! only changes it by dispatching actions through reducers.
//!
//! ## Core Concepts
//!
//! - **State**: Domain state held by the store
//! - **Action**: A tagged message describing something that happened
//! - **Reducer**: Pure function `(State, Action, Environment) → State`
//! - **Environment**: Injected dependencies
//!
//! Side effects (network calls) live outside reducers. They run as tasks the
//! store tracks and report back by dispatching actions.
//!
//! ## Example
//!
//! ```
//! use postboard_core::Reducer;
//!
//! #[derive(Clone, Debug)]
//! enum TallyAction {
//!     Add(u32),
//! }
//!
//! struct TallyReducer;
//!
//! impl Reducer for TallyReducer {
//!     type State = u32;
//!     type Action = TallyAction;
//!     type Environment = ();
//!
//!     fn reduce(&self, state: &mut u32, action: TallyAction, _env: &()) {
//!         match action {
//!             TallyAction::Add(n) => *state += n,
//!         }
//!     }
//! }
//!
//! let mut total = 0;
//! TallyReducer.reduce(&mut total, TallyAction::Add(2), &());
//! assert_eq!(total, 2);
//! ```

pub use reducer::Reducer;

/// Reducer composition utilities
pub mod composition;

/// Reducer module - The core trait for state transitions
///
/// Reducers are pure functions: `(State, Action, Environment) → State`.
/// They are deterministic and testable without a runtime.
pub mod reducer {
    /// The Reducer trait - core abstraction for state transitions
    ///
    /// # Type Parameters
    ///
    /// - `State`: The state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes
        ///
        /// Updates `state` in place. Actions a reducer does not handle leave
        /// the state untouched.
        fn reduce(&self, state: &mut Self::State, action: Self::Action, env: &Self::Environment);
    }
}
