//! # Composable Requests Cache
//!
//! Normalized cache of query and mutation state, built purely from the action
//! stream.
//!
//! ## State Shape
//!
//! ```text
//! NetworkState {
//!     queries:   { FETCH_BOOKS:  { data, error, pending }, ... },
//!     mutations: { DELETE_BOOK1: { error, pending },       ... },
//! }
//! ```
//!
//! ## How Actions Land
//!
//! - A request action classified as a **query** gets a sub-reducer for its
//!   type the first time that type is seen. The sub-reducer owns the
//!   `queries[type]` slice from then on; slices are only ever reset, never
//!   removed.
//! - A request action classified as a **mutation**, and every lifecycle action
//!   answering one, is folded into `mutations` under its mutation key.
//! - Lifecycle actions are classified through the request action they carry.
//!
//! ## Hydration
//!
//! A store may start from a snapshot (for instance state rendered on a
//! server). When the reducer first runs against a state that already holds
//! query slices but has no sub-reducers, it registers a default sub-reducer
//! per slice and marks those types as *pending adoption*: the first live
//! request action of each such type replaces the default sub-reducer with one
//! configured from that action's meta. Hydration touches state only; it never
//! reaches the orchestrator or its interceptors.
//!
//! ## Example
//!
//! ```
//! use composable_requests_cache::{NetworkReducer, NetworkState};
//! use composable_requests_core::{Action, Reducer, Request, RequestAction, Response, SuccessAction};
//!
//! let reducer = NetworkReducer::default();
//! let mut state = NetworkState::default();
//! let fetch = RequestAction::new("FETCH_BOOKS", Request::get("/books"));
//!
//! reducer.reduce(&mut state, &Action::Request(fetch.clone()));
//! assert_eq!(state.queries["FETCH_BOOKS"].pending, 1);
//!
//! reducer.reduce(&mut state, &SuccessAction::new(fetch, Response::with_data(vec![1, 2])).into());
//! assert_eq!(state.queries["FETCH_BOOKS"].data, serde_json::json!([1, 2]));
//! ```

use composable_requests_core::action::{Action, RequestAction};
use composable_requests_core::classify::{self, is_mutation_action};
use composable_requests_core::hooks::RequestPredicate;
use composable_requests_core::reducer::Reducer;
use composable_requests_core::state::QueryLookup;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, PoisonError};

/// Mutation slices and the operations reducer
pub mod mutation;

/// Query slices and the per-type sub-reducer
pub mod query;

/// Read helpers
pub mod selectors;

pub use mutation::{MutationState, mutation_key};
pub use query::QueryState;
pub use selectors::{MutationView, QueryView, get_mutation, get_query};

use query::{QueryConfig, QueryReducer};

/// The normalized cache
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkState {
    /// Query slices keyed by request type
    #[serde(default)]
    pub queries: BTreeMap<String, QueryState>,
    /// Mutation slices keyed by mutation key
    #[serde(default)]
    pub mutations: BTreeMap<String, MutationState>,
}

impl QueryLookup for NetworkState {
    fn query_data(&self, request_type: &str) -> Option<Value> {
        self.queries.get(request_type).map(|query| query.data.clone())
    }
}

/// Configuration shared by every sub-reducer
#[derive(Clone)]
pub struct NetworkConfig {
    /// Query vs. mutation classifier
    pub is_request_read_only: RequestPredicate,
    /// Keep response data in mutation slices
    pub handle_operations_state: bool,
    /// Action types resetting every query slice (overridable per query)
    pub reset_on: Vec<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            is_request_read_only: classify::default_read_only(),
            handle_operations_state: false,
            reset_on: Vec::new(),
        }
    }
}

impl NetworkConfig {
    /// Builder: replace the classifier
    #[must_use]
    pub fn with_is_request_read_only(mut self, predicate: RequestPredicate) -> Self {
        self.is_request_read_only = predicate;
        self
    }

    /// Builder: keep mutation response data
    #[must_use]
    pub const fn with_handle_operations_state(mut self, enabled: bool) -> Self {
        self.handle_operations_state = enabled;
        self
    }

    /// Builder: default reset types for queries
    #[must_use]
    pub fn with_reset_on(mut self, types: Vec<String>) -> Self {
        self.reset_on = types;
        self
    }
}

impl std::fmt::Debug for NetworkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkConfig")
            .field("handle_operations_state", &self.handle_operations_state)
            .field("reset_on", &self.reset_on)
            .finish_non_exhaustive()
    }
}

/// Sub-reducers known so far
///
/// Entries are created on first sight of a query type and never removed.
#[derive(Default)]
struct QueryRegistry {
    reducers: BTreeMap<String, QueryReducer>,
    hydrated: bool,
    pending_adoption: HashSet<String>,
}

impl QueryRegistry {
    /// Register default sub-reducers for a seeded state, once
    fn bootstrap(&mut self, state: &NetworkState, config: &NetworkConfig) {
        if self.hydrated || state.queries.is_empty() || !self.reducers.is_empty() {
            return;
        }

        self.hydrated = true;
        for request_type in state.queries.keys() {
            self.reducers.insert(
                request_type.clone(),
                QueryReducer::new(QueryConfig::new(config, request_type, None)),
            );
            self.pending_adoption.insert(request_type.clone());
        }

        tracing::debug!(
            queries = self.reducers.len(),
            "Cache initialized from snapshot"
        );
    }

    /// Make sure `request`'s type has a sub-reducer configured from its meta
    fn adopt(&mut self, request: &RequestAction, config: &NetworkConfig) {
        let request_type = &request.action_type;
        let adopting = self.pending_adoption.remove(request_type);
        if !adopting && self.reducers.contains_key(request_type) {
            return;
        }

        tracing::debug!(request_type = %request_type, adopting, "Registering query reducer");
        self.reducers.insert(
            request_type.clone(),
            QueryReducer::new(QueryConfig::new(config, request_type, Some(&request.meta))),
        );
    }
}

/// The normalized cache reducer
///
/// Owns the registry of per-type query sub-reducers. One instance should
/// serve one store: the registry tracks which slices of *that* store's state
/// it has already taken over.
pub struct NetworkReducer {
    config: NetworkConfig,
    registry: Mutex<QueryRegistry>,
}

impl NetworkReducer {
    /// Reducer with the given configuration
    #[must_use]
    pub fn new(config: NetworkConfig) -> Self {
        Self {
            config,
            registry: Mutex::new(QueryRegistry::default()),
        }
    }

    /// Query types that currently have a sub-reducer
    #[must_use]
    pub fn registered_queries(&self) -> Vec<String> {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .reducers
            .keys()
            .cloned()
            .collect()
    }

    /// Whether `request_type` came from a snapshot and awaits its first live action
    #[must_use]
    pub fn is_pending_adoption(&self, request_type: &str) -> bool {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending_adoption
            .contains(request_type)
    }
}

impl Default for NetworkReducer {
    fn default() -> Self {
        Self::new(NetworkConfig::default())
    }
}

impl Reducer for NetworkReducer {
    type State = NetworkState;
    type Action = Action;

    fn reduce(&self, state: &mut Self::State, action: &Self::Action) {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        registry.bootstrap(state, &self.config);

        if let Action::Request(request) = action {
            if (self.config.is_request_read_only)(request) {
                registry.adopt(request, &self.config);
            }
        }

        for (request_type, reducer) in &registry.reducers {
            if let Some(slice) = state.queries.get_mut(request_type) {
                reducer.reduce(slice, action);
            } else {
                let mut slice = reducer.initial_state();
                reducer.reduce(&mut slice, action);
                state.queries.insert(request_type.clone(), slice);
            }
        }

        match action {
            Action::ResetRequests(reset) => {
                mutation::reset_mutations(&mut state.mutations, reset.requests.as_deref());
            },
            _ if is_mutation_action(action, &self.config.is_request_read_only) => {
                mutation::reduce_mutation(
                    &mut state.mutations,
                    action,
                    self.config.handle_operations_state,
                );
            },
            _ => {},
        }
    }
}
