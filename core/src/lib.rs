//! # Composable Requests Core
//!
//! Core types shared by the request orchestrator and the normalized cache.
//!
//! The system is split along the action stream:
//!
//! - **Request actions** describe calls to make
//! - The **orchestrator** (runtime crate) executes them through a driver and
//!   answers each with one lifecycle action (success, error or abort)
//! - **Reducers** (cache crate) fold request and lifecycle actions into state
//!
//! The orchestrator and reducers never call each other. This crate holds
//! what both sides agree on.
//!
//! ## Core Concepts
//!
//! - **Action**: [`Action`], the stream item
//! - **Request**: [`Request`] / [`RequestPayload`], what a driver executes
//! - **Response**: [`Response`], what a driver returns
//! - **Meta**: [`RequestMeta`], per-action options and hooks
//! - **Reducer**: `(State, Action) → State`, mutating state in place
//!
//! ## Example
//!
//! ```
//! use composable_requests_core::{Action, Request, RequestAction, RequestMeta};
//!
//! let fetch = RequestAction::new("FETCH_BOOK", Request::get("/books/1"))
//!     .with_meta(RequestMeta::default().with_request_key("1"));
//!
//! assert_eq!(fetch.dedup_key(), "FETCH_BOOK1");
//! let action: Action = fetch.into();
//! assert_eq!(action.action_type(), "FETCH_BOOK");
//! ```

pub use serde::{Deserialize, Serialize};
pub use serde_json::Value;

/// The action stream: request, lifecycle and control actions
pub mod action;

/// Query vs. mutation classification
pub mod classify;

/// Reducer composition utilities
pub mod composition;

/// Request failure taxonomy
pub mod error;

/// Hook and predicate capability types
pub mod hooks;

/// Per-action options
pub mod meta;

/// Request descriptors and responses
pub mod request;

/// Reducer module - The core trait for state transitions
///
/// Reducers are pure: given the current state and an action they update the
/// state in place and perform no I/O. Everything effectful happens in the
/// orchestrator, which only talks to reducers through dispatched actions.
pub mod reducer {
    /// The Reducer trait - core abstraction for state transitions
    ///
    /// # Example
    ///
    /// ```
    /// use composable_requests_core::reducer::Reducer;
    /// use composable_requests_core::Action;
    ///
    /// #[derive(Default)]
    /// struct Seen {
    ///     count: usize,
    /// }
    ///
    /// struct SeenReducer;
    ///
    /// impl Reducer for SeenReducer {
    ///     type State = Seen;
    ///     type Action = Action;
    ///
    ///     fn reduce(&self, state: &mut Seen, _action: &Action) {
    ///         state.count += 1;
    ///     }
    /// }
    ///
    /// let mut state = Seen::default();
    /// SeenReducer.reduce(&mut state, &Action::custom("PING", Default::default()));
    /// assert_eq!(state.count, 1);
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// Fold `action` into `state`
        ///
        /// Actions a reducer does not handle must leave the state untouched.
        fn reduce(&self, state: &mut Self::State, action: &Self::Action);
    }
}

/// State module - read access the orchestrator needs from store state
pub mod state {
    use serde_json::Value;

    /// Lookup of cached query data
    ///
    /// The orchestrator uses this to hand the currently cached data to a
    /// request's `get_data` transform.
    pub trait QueryLookup {
        /// Cached data for the query slice of `request_type`, if any
        fn query_data(&self, request_type: &str) -> Option<Value>;
    }
}

pub use action::{
    AbortAction, AbortRequests, Action, ErrorAction, RequestAction, RequestKey, ResetRequests,
    SuccessAction,
};
pub use error::RequestError;
pub use meta::{OperationsMeta, RequestMeta};
pub use reducer::Reducer;
pub use request::{Request, RequestPayload, Response};
pub use state::QueryLookup;
