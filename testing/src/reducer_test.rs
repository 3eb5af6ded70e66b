//! Ergonomic testing utilities for reducers
//!
//! This module provides a fluent API for testing reducers with readable
//! Given-When-Then syntax. Actions and assertions may be interleaved, so one
//! test can follow a request through its whole lifecycle.

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use composable_requests_core::reducer::Reducer;

/// Type alias for state assertion functions
type StateAssertion<S> = Box<dyn FnOnce(&S)>;

enum Step<S, A> {
    Action(A),
    Assert(StateAssertion<S>),
}

/// Fluent API for testing reducers with Given-When-Then syntax
///
/// Steps run in the order they were added: every `when_action` is reduced
/// into the state, every `then_state` sees the state as it is at that point.
///
/// # Example
///
/// ```
/// use composable_requests_testing::ReducerTest;
/// use composable_requests_core::Reducer;
///
/// struct Counter;
///
/// impl Reducer for Counter {
///     type State = i32;
///     type Action = i32;
///
///     fn reduce(&self, state: &mut i32, action: &i32) {
///         *state += action;
///     }
/// }
///
/// ReducerTest::new(Counter)
///     .given_state(0)
///     .when_action(2)
///     .then_state(|state| assert_eq!(*state, 2))
///     .when_action(3)
///     .then_state(|state| assert_eq!(*state, 5))
///     .run();
/// ```
pub struct ReducerTest<R: Reducer> {
    reducer: R,
    initial_state: Option<R::State>,
    steps: Vec<Step<R::State, R::Action>>,
}

impl<R: Reducer> ReducerTest<R> {
    /// Create a new reducer test with the given reducer
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            initial_state: None,
            steps: Vec::new(),
        }
    }

    /// Set the initial state (Given)
    #[must_use]
    pub fn given_state(mut self, state: R::State) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Reduce an action (When)
    #[must_use]
    pub fn when_action(mut self, action: R::Action) -> Self {
        self.steps.push(Step::Action(action));
        self
    }

    /// Reduce several actions in order (When)
    #[must_use]
    pub fn when_actions(mut self, actions: impl IntoIterator<Item = R::Action>) -> Self {
        self.steps.extend(actions.into_iter().map(Step::Action));
        self
    }

    /// Add an assertion about the state reached so far (Then)
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&R::State) + 'static,
    {
        self.steps.push(Step::Assert(Box::new(assertion)));
        self
    }

    /// Run the test and execute all assertions
    ///
    /// # Panics
    ///
    /// Panics if the initial state is not set, if no action was given, or if
    /// any assertion fails.
    #[allow(clippy::panic)] // Test code can panic
    #[allow(clippy::expect_used)] // Test code can use expect
    pub fn run(self) {
        let mut state = self
            .initial_state
            .expect("Initial state must be set with given_state()");

        assert!(
            self.steps.iter().any(|step| matches!(step, Step::Action(_))),
            "At least one action must be set with when_action()"
        );

        for step in self.steps {
            match step {
                Step::Action(action) => self.reducer.reduce(&mut state, &action),
                Step::Assert(assertion) => assertion(&state),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, Default)]
    struct TestState {
        count: i32,
        log: Vec<&'static str>,
    }

    #[derive(Clone, Debug)]
    enum TestAction {
        Increment,
        Decrement,
    }

    struct TestReducer;

    impl Reducer for TestReducer {
        type State = TestState;
        type Action = TestAction;

        fn reduce(&self, state: &mut Self::State, action: &Self::Action) {
            match action {
                TestAction::Increment => {
                    state.count += 1;
                    state.log.push("inc");
                },
                TestAction::Decrement => {
                    state.count -= 1;
                    state.log.push("dec");
                },
            }
        }
    }

    #[test]
    fn test_reducer_test_increment() {
        ReducerTest::new(TestReducer)
            .given_state(TestState::default())
            .when_action(TestAction::Increment)
            .then_state(|state| {
                assert_eq!(state.count, 1);
            })
            .run();
    }

    #[test]
    fn test_assertions_see_intermediate_state() {
        ReducerTest::new(TestReducer)
            .given_state(TestState { count: 5, log: vec![] })
            .when_action(TestAction::Decrement)
            .then_state(|state| assert_eq!(state.count, 4))
            .when_actions([TestAction::Increment, TestAction::Increment])
            .then_state(|state| {
                assert_eq!(state.count, 6);
                assert_eq!(state.log, vec!["dec", "inc", "inc"]);
            })
            .run();
    }

    #[test]
    #[should_panic(expected = "Initial state must be set")]
    fn test_missing_state_panics() {
        ReducerTest::new(TestReducer).when_action(TestAction::Increment).run();
    }

    #[test]
    #[should_panic(expected = "At least one action")]
    fn test_missing_action_panics() {
        ReducerTest::new(TestReducer)
            .given_state(TestState::default())
            .then_state(|_| {})
            .run();
    }
}
