//! Ergonomic testing utilities for reducers
//!
//! Fluent Given-When-Then API over a single reducer, without a runtime.

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use postboard_core::reducer::Reducer;

/// Type alias for state assertion functions
type StateAssertion<S> = Box<dyn FnOnce(&S)>;

/// Fluent API for testing reducers with Given-When-Then syntax
///
/// Actions given through [`when_action`](Self::when_action) are reduced in
/// order before any assertion runs.
///
/// # Example
///
/// ```ignore
/// ReducerTest::new(UsersReducer)
///     .with_env(())
///     .given_state(Vec::new())
///     .when_action(Notification::UserFetched { payload: alice.clone() })
///     .when_action(Notification::UserFetched { payload: alice })
///     .then_state(|users| assert_eq!(users.len(), 2))
///     .run();
/// ```
pub struct ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    reducer: R,
    environment: Option<E>,
    initial_state: Option<S>,
    actions: Vec<A>,
    state_assertions: Vec<StateAssertion<S>>,
}

impl<R, S, A, E> ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    /// Create a new reducer test with the given reducer
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            environment: None,
            initial_state: None,
            actions: Vec::new(),
            state_assertions: Vec::new(),
        }
    }

    /// Set the environment for the test
    #[must_use]
    pub fn with_env(mut self, env: E) -> Self {
        self.environment = Some(env);
        self
    }

    /// Set the initial state (Given)
    #[must_use]
    pub fn given_state(mut self, state: S) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Add an action to reduce (When)
    #[must_use]
    pub fn when_action(mut self, action: A) -> Self {
        self.actions.push(action);
        self
    }

    /// Add an assertion about the resulting state (Then)
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&S) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Run the test and execute all assertions
    ///
    /// # Panics
    ///
    /// Panics if initial state, environment or at least one action is not
    /// set, or if any assertion fails.
    #[allow(clippy::panic)] // Test code can panic
    #[allow(clippy::expect_used)] // Test code can use expect
    pub fn run(self) {
        let mut state = self
            .initial_state
            .expect("Initial state must be set with given_state()");

        let env = self
            .environment
            .expect("Environment must be set with with_env()");

        assert!(!self.actions.is_empty(), "At least one action must be set with when_action()");

        for action in self.actions {
            self.reducer.reduce(&mut state, action, &env);
        }

        for assertion in self.state_assertions {
            assertion(&state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug)]
    enum TestAction {
        Append(u8),
        Clear,
    }

    struct TestReducer;

    impl Reducer for TestReducer {
        type State = Vec<u8>;
        type Action = TestAction;
        type Environment = ();

        fn reduce(&self, state: &mut Self::State, action: Self::Action, _env: &Self::Environment) {
            match action {
                TestAction::Append(n) => state.push(n),
                TestAction::Clear => state.clear(),
            }
        }
    }

    #[test]
    fn test_actions_are_reduced_in_order() {
        ReducerTest::new(TestReducer)
            .with_env(())
            .given_state(vec![1])
            .when_action(TestAction::Append(2))
            .when_action(TestAction::Append(3))
            .then_state(|state| assert_eq!(state, &vec![1, 2, 3]))
            .run();
    }

    #[test]
    fn test_every_state_assertion_runs_on_final_state() {
        ReducerTest::new(TestReducer)
            .with_env(())
            .given_state(vec![4, 5])
            .when_action(TestAction::Clear)
            .when_action(TestAction::Append(9))
            .then_state(|state| assert_eq!(state.len(), 1))
            .then_state(|state| assert_eq!(state[0], 9))
            .run();
    }

    #[test]
    #[should_panic(expected = "At least one action")]
    fn test_run_without_action_panics() {
        ReducerTest::new(TestReducer)
            .with_env(())
            .given_state(Vec::new())
            .run();
    }
}
