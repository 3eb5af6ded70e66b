//! Per-type query sub-reducer.

use crate::NetworkConfig;
use composable_requests_core::action::{Action, RequestAction, keys_select_type};
use composable_requests_core::hooks::{MutationUpdater, RequestPredicate};
use composable_requests_core::meta::RequestMeta;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Cached state of one query type
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryState {
    /// Last successful data, `null` (or `[]` for list queries) until then
    #[serde(default)]
    pub data: Value,
    /// Error of the last failed call, cleared by the next request or success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    /// Calls of this type currently in flight
    #[serde(default)]
    pub pending: u32,
}

impl QueryState {
    /// Whether at least one call is in flight
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.pending > 0
    }
}

/// Configuration of one query sub-reducer
///
/// Built once, when the reducer for a type is created: network-wide defaults
/// first, then the options of the request action that triggered creation.
#[derive(Clone)]
pub(crate) struct QueryConfig {
    action_type: String,
    is_read_only: RequestPredicate,
    multiple: bool,
    reset_on: Vec<String>,
    mutations: HashMap<String, MutationUpdater>,
}

impl QueryConfig {
    pub(crate) fn new(config: &NetworkConfig, action_type: &str, meta: Option<&RequestMeta>) -> Self {
        Self {
            action_type: action_type.to_string(),
            is_read_only: config.is_request_read_only.clone(),
            multiple: meta.and_then(|meta| meta.multiple).unwrap_or(false),
            reset_on: meta
                .and_then(|meta| meta.reset_on.clone())
                .unwrap_or_else(|| config.reset_on.clone()),
            mutations: meta.map(|meta| meta.mutations.clone()).unwrap_or_default(),
        }
    }
}

/// Folds the lifecycle of one query type into its [`QueryState`]
pub(crate) struct QueryReducer {
    config: QueryConfig,
}

impl QueryReducer {
    pub(crate) const fn new(config: QueryConfig) -> Self {
        Self { config }
    }

    pub(crate) fn initial_state(&self) -> QueryState {
        QueryState {
            data: self.initial_data(),
            error: None,
            pending: 0,
        }
    }

    fn initial_data(&self) -> Value {
        if self.config.multiple {
            Value::Array(Vec::new())
        } else {
            Value::Null
        }
    }

    fn owns(&self, request: &RequestAction) -> bool {
        request.action_type == self.config.action_type && (self.config.is_read_only)(request)
    }

    fn reset(&self, state: &mut QueryState) {
        state.data = self.initial_data();
        state.error = None;
    }

    pub(crate) fn reduce(&self, state: &mut QueryState, action: &Action) {
        if self.config.reset_on.iter().any(|t| t == action.action_type()) {
            self.reset(state);
        }

        match action {
            Action::Request(request) if self.owns(request) => {
                state.pending += 1;
                state.error = None;
            },
            Action::Success(success) if self.owns(&success.request) => {
                state.data = success.data();
                state.error = None;
                state.pending = state.pending.saturating_sub(1);
            },
            Action::Error(error) if self.owns(&error.request) => {
                state.error = Some(error.error.payload());
                state.pending = state.pending.saturating_sub(1);
            },
            Action::Abort(abort) if self.owns(&abort.request) => {
                state.pending = state.pending.saturating_sub(1);
            },
            Action::Success(success) => {
                if let Some(updater) = self.config.mutations.get(&success.request.action_type) {
                    if !(self.config.is_read_only)(&*success.request) {
                        state.data = updater(&state.data, &success.data());
                    }
                }
            },
            Action::ResetRequests(reset) => {
                if keys_select_type(reset.requests.as_deref(), &self.config.action_type) {
                    self.reset(state);
                }
            },
            _ => {},
        }
    }
}
