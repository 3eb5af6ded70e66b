//! Reducer composition utilities
//!
//! This module provides utilities for composing reducers in various ways:
//! - **`combine_reducers`**: Run multiple reducers on the same state/action
//! - **`scope_reducer`**: Focus a reducer on a subset of state
//!
//! The usual application shape embeds the request cache next to application
//! state and scopes the cache reducer onto its field:
//!
//! ```ignore
//! let reducer = combine_reducers(vec![
//!     Box::new(scope_reducer(NetworkReducer::default(), |s: &mut AppState| &mut s.network)),
//!     Box::new(AppReducer),
//! ]);
//! ```

use crate::reducer::Reducer;

/// Combines multiple reducers that operate on the same state and action types.
///
/// Each reducer is run in sequence, in the order given.
///
/// # Examples
///
/// ```
/// use composable_requests_core::Reducer;
/// use composable_requests_core::composition::combine_reducers;
///
/// #[derive(Default)]
/// struct Counts {
///     even: u32,
///     odd: u32,
/// }
///
/// struct EvenReducer;
/// struct OddReducer;
///
/// impl Reducer for EvenReducer {
///     type State = Counts;
///     type Action = u32;
///
///     fn reduce(&self, state: &mut Counts, action: &u32) {
///         if action % 2 == 0 {
///             state.even += 1;
///         }
///     }
/// }
///
/// impl Reducer for OddReducer {
///     type State = Counts;
///     type Action = u32;
///
///     fn reduce(&self, state: &mut Counts, action: &u32) {
///         if action % 2 == 1 {
///             state.odd += 1;
///         }
///     }
/// }
///
/// let combined = combine_reducers(vec![Box::new(EvenReducer), Box::new(OddReducer)]);
/// let mut state = Counts::default();
/// combined.reduce(&mut state, &3);
/// assert_eq!(state.odd, 1);
/// ```
#[must_use]
pub fn combine_reducers<S, A>(
    reducers: Vec<Box<dyn Reducer<State = S, Action = A> + Send + Sync>>,
) -> CombinedReducer<S, A> {
    CombinedReducer { reducers }
}

/// A combined reducer that runs multiple reducers in sequence.
///
/// Created by [`combine_reducers`].
pub struct CombinedReducer<S, A> {
    reducers: Vec<Box<dyn Reducer<State = S, Action = A> + Send + Sync>>,
}

impl<S, A> Reducer for CombinedReducer<S, A> {
    type State = S;
    type Action = A;

    fn reduce(&self, state: &mut Self::State, action: &Self::Action) {
        for reducer in &self.reducers {
            reducer.reduce(state, action);
        }
    }
}

/// Scopes a reducer to operate on a subset of a larger state.
///
/// `focus` borrows the child state out of the parent; the child reducer then
/// mutates it in place.
///
/// # Examples
///
/// ```
/// use composable_requests_core::Reducer;
/// use composable_requests_core::composition::scope_reducer;
///
/// #[derive(Default)]
/// struct Tally {
///     seen: u32,
/// }
///
/// #[derive(Default)]
/// struct AppState {
///     tally: Tally,
///     title: String,
/// }
///
/// struct TallyReducer;
///
/// impl Reducer for TallyReducer {
///     type State = Tally;
///     type Action = ();
///
///     fn reduce(&self, state: &mut Tally, _action: &()) {
///         state.seen += 1;
///     }
/// }
///
/// let scoped = scope_reducer(TallyReducer, |app: &mut AppState| &mut app.tally);
/// let mut state = AppState::default();
/// scoped.reduce(&mut state, &());
/// assert_eq!(state.tally.seen, 1);
/// ```
pub fn scope_reducer<S, SubS, A, R>(
    reducer: R,
    focus: fn(&mut S) -> &mut SubS,
) -> ScopedReducer<S, SubS, A, R>
where
    R: Reducer<State = SubS, Action = A>,
{
    ScopedReducer {
        reducer,
        focus,
        _phantom: std::marker::PhantomData,
    }
}

/// A scoped reducer that operates on a subset of state.
///
/// Created by [`scope_reducer`].
pub struct ScopedReducer<S, SubS, A, R>
where
    R: Reducer<State = SubS, Action = A>,
{
    reducer: R,
    focus: fn(&mut S) -> &mut SubS,
    _phantom: std::marker::PhantomData<fn(A)>,
}

impl<S, SubS, A, R> Reducer for ScopedReducer<S, SubS, A, R>
where
    R: Reducer<State = SubS, Action = A>,
{
    type State = S;
    type Action = A;

    fn reduce(&self, state: &mut Self::State, action: &Self::Action) {
        self.reducer.reduce((self.focus)(state), action);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{Action, RequestAction};
    use crate::request::Request;
    use serde_json::Value;

    #[derive(Default)]
    struct Stats {
        requests: u32,
        custom: Vec<String>,
    }

    struct RequestCounter;

    impl Reducer for RequestCounter {
        type State = Stats;
        type Action = Action;

        fn reduce(&self, state: &mut Self::State, action: &Self::Action) {
            if action.as_request().is_some() {
                state.requests += 1;
            }
        }
    }

    struct CustomRecorder;

    impl Reducer for CustomRecorder {
        type State = Stats;
        type Action = Action;

        fn reduce(&self, state: &mut Self::State, action: &Self::Action) {
            if let Action::Custom { action_type, .. } = action {
                state.custom.push(action_type.clone());
            }
        }
    }

    fn fetch() -> Action {
        RequestAction::new("FETCH_BOOKS", Request::get("/books")).into()
    }

    #[test]
    fn test_combine_reducers() {
        let combined = combine_reducers(vec![Box::new(RequestCounter), Box::new(CustomRecorder)]);
        let mut state = Stats::default();

        combined.reduce(&mut state, &fetch());
        combined.reduce(&mut state, &Action::custom("LOGOUT", Value::Null));

        assert_eq!(state.requests, 1);
        assert_eq!(state.custom, vec!["LOGOUT".to_string()]);
    }

    #[derive(Default)]
    struct ParentState {
        stats: Stats,
        other: String,
    }

    #[test]
    fn test_scope_reducer() {
        let scoped = scope_reducer(RequestCounter, |parent: &mut ParentState| &mut parent.stats);
        let mut state = ParentState {
            stats: Stats::default(),
            other: "test".to_string(),
        };

        scoped.reduce(&mut state, &fetch());
        scoped.reduce(&mut state, &fetch());

        assert_eq!(state.stats.requests, 2);
        assert_eq!(state.other, "test");
    }
}
