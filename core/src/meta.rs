//! Per-action options carried in a request action's `meta`.

use crate::hooks::{
    GetDataFn, GetErrorFn, MutationUpdater, OnAbortHook, OnErrorHook, OnRequestHook,
    OnSuccessHook, RequestKeyFn,
};
use crate::request::Response;
use serde_json::Value;
use std::collections::HashMap;

/// Overrides for how a mutation is tracked in cache state
#[derive(Clone, Default)]
pub struct OperationsMeta {
    /// Replaces the default `type + request_key` mutation key
    pub get_request_key: Option<RequestKeyFn>,
}

impl std::fmt::Debug for OperationsMeta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationsMeta")
            .field("get_request_key", &self.get_request_key.is_some())
            .finish()
    }
}

/// Options attached to a single request action
///
/// Every field is optional in spirit: the defaults describe a plain request
/// that runs all global interceptors, dispatches its lifecycle actions and
/// follows the configured `take_latest` policy.
///
/// The four `run_on_*` flags gate only the *global* interceptors. Per-action
/// hooks set here always run when present.
#[derive(Clone)]
pub struct RequestMeta {
    /// Name of the driver to use instead of the default one
    pub driver: Option<String>,
    /// Suffix distinguishing concurrent requests of the same type
    pub request_key: Option<String>,
    /// Overrides the configured `take_latest` policy
    pub take_latest: Option<bool>,
    /// Suppress dispatch of the request and lifecycle actions
    pub silent: bool,
    /// Force query classification
    pub as_query: bool,
    /// Run the global `on_request` interceptor
    pub run_on_request: bool,
    /// Run the global `on_success` interceptor
    pub run_on_success: bool,
    /// Run the global `on_error` interceptor
    pub run_on_error: bool,
    /// Run the global `on_abort` interceptor
    pub run_on_abort: bool,
    /// Per-action request hook, runs after the global one
    pub on_request: Option<OnRequestHook>,
    /// Per-action success hook, runs after the global one
    pub on_success: Option<OnSuccessHook>,
    /// Per-action error hook, runs after the global one
    pub on_error: Option<OnErrorHook>,
    /// Per-action abort hook, runs after the global one
    pub on_abort: Option<OnAbortHook>,
    /// Transform applied to response data together with the cached data
    pub get_data: Option<GetDataFn>,
    /// Transform applied to driver errors
    pub get_error: Option<GetErrorFn>,
    /// Pre-resolved response from a client-side cache
    pub cache_response: Option<Response>,
    /// Pre-resolved response recorded during server rendering
    pub ssr_response: Option<Response>,
    /// Pre-resolved failure recorded during server rendering
    pub ssr_error: Option<Value>,
    /// Mutation key override
    pub operations: Option<OperationsMeta>,
    /// Query slice holds a list (initial data `[]` instead of `null`)
    pub multiple: Option<bool>,
    /// Action types that reset this query's slice
    pub reset_on: Option<Vec<String>>,
    /// Mutation type -> updater applied to this query's data on that mutation's success
    pub mutations: HashMap<String, MutationUpdater>,
}

impl Default for RequestMeta {
    fn default() -> Self {
        Self {
            driver: None,
            request_key: None,
            take_latest: None,
            silent: false,
            as_query: false,
            run_on_request: true,
            run_on_success: true,
            run_on_error: true,
            run_on_abort: true,
            on_request: None,
            on_success: None,
            on_error: None,
            on_abort: None,
            get_data: None,
            get_error: None,
            cache_response: None,
            ssr_response: None,
            ssr_error: None,
            operations: None,
            multiple: None,
            reset_on: None,
            mutations: HashMap::new(),
        }
    }
}

impl RequestMeta {
    /// Whether the outcome is pre-resolved and must bypass the driver
    #[must_use]
    pub const fn is_rehydrated(&self) -> bool {
        self.cache_response.is_some() || self.ssr_response.is_some() || self.ssr_error.is_some()
    }

    /// Builder: select a named driver
    #[must_use]
    pub fn with_driver(mut self, driver: impl Into<String>) -> Self {
        self.driver = Some(driver.into());
        self
    }

    /// Builder: set the request key
    #[must_use]
    pub fn with_request_key(mut self, key: impl Into<String>) -> Self {
        self.request_key = Some(key.into());
        self
    }

    /// Builder: override `take_latest`
    #[must_use]
    pub const fn with_take_latest(mut self, take_latest: bool) -> Self {
        self.take_latest = Some(take_latest);
        self
    }

    /// Builder: set `silent`
    #[must_use]
    pub const fn with_silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    /// Builder: set `as_query`
    #[must_use]
    pub const fn with_as_query(mut self, as_query: bool) -> Self {
        self.as_query = as_query;
        self
    }

    /// Builder: gate the global `on_request` interceptor
    #[must_use]
    pub const fn with_run_on_request(mut self, run: bool) -> Self {
        self.run_on_request = run;
        self
    }

    /// Builder: gate the global `on_success` interceptor
    #[must_use]
    pub const fn with_run_on_success(mut self, run: bool) -> Self {
        self.run_on_success = run;
        self
    }

    /// Builder: gate the global `on_error` interceptor
    #[must_use]
    pub const fn with_run_on_error(mut self, run: bool) -> Self {
        self.run_on_error = run;
        self
    }

    /// Builder: gate the global `on_abort` interceptor
    #[must_use]
    pub const fn with_run_on_abort(mut self, run: bool) -> Self {
        self.run_on_abort = run;
        self
    }

    /// Builder: per-action request hook
    #[must_use]
    pub fn with_on_request(mut self, hook: OnRequestHook) -> Self {
        self.on_request = Some(hook);
        self
    }

    /// Builder: per-action success hook
    #[must_use]
    pub fn with_on_success(mut self, hook: OnSuccessHook) -> Self {
        self.on_success = Some(hook);
        self
    }

    /// Builder: per-action error hook
    #[must_use]
    pub fn with_on_error(mut self, hook: OnErrorHook) -> Self {
        self.on_error = Some(hook);
        self
    }

    /// Builder: per-action abort hook
    #[must_use]
    pub fn with_on_abort(mut self, hook: OnAbortHook) -> Self {
        self.on_abort = Some(hook);
        self
    }

    /// Builder: data transform
    #[must_use]
    pub fn with_get_data(mut self, get_data: GetDataFn) -> Self {
        self.get_data = Some(get_data);
        self
    }

    /// Builder: error transform
    #[must_use]
    pub fn with_get_error(mut self, get_error: GetErrorFn) -> Self {
        self.get_error = Some(get_error);
        self
    }

    /// Builder: pre-resolved cached response
    #[must_use]
    pub fn with_cache_response(mut self, response: Response) -> Self {
        self.cache_response = Some(response);
        self
    }

    /// Builder: pre-resolved server-rendered response
    #[must_use]
    pub fn with_ssr_response(mut self, response: Response) -> Self {
        self.ssr_response = Some(response);
        self
    }

    /// Builder: pre-resolved server-rendered failure
    #[must_use]
    pub fn with_ssr_error(mut self, error: Value) -> Self {
        self.ssr_error = Some(error);
        self
    }

    /// Builder: override the mutation key
    #[must_use]
    pub fn with_operations_key(mut self, get_request_key: RequestKeyFn) -> Self {
        self.operations = Some(OperationsMeta {
            get_request_key: Some(get_request_key),
        });
        self
    }

    /// Builder: mark the query slice as a list
    #[must_use]
    pub const fn with_multiple(mut self, multiple: bool) -> Self {
        self.multiple = Some(multiple);
        self
    }

    /// Builder: action types resetting this query slice
    #[must_use]
    pub fn with_reset_on(mut self, types: Vec<String>) -> Self {
        self.reset_on = Some(types);
        self
    }

    /// Builder: update this query's data when `mutation_type` succeeds
    #[must_use]
    pub fn with_mutation(mut self, mutation_type: impl Into<String>, updater: MutationUpdater) -> Self {
        self.mutations.insert(mutation_type.into(), updater);
        self
    }
}

impl std::fmt::Debug for RequestMeta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestMeta")
            .field("driver", &self.driver)
            .field("request_key", &self.request_key)
            .field("take_latest", &self.take_latest)
            .field("silent", &self.silent)
            .field("as_query", &self.as_query)
            .field("cache_response", &self.cache_response)
            .field("ssr_response", &self.ssr_response)
            .field("ssr_error", &self.ssr_error)
            .field("mutations", &self.mutations.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_run_all_global_interceptors() {
        let meta = RequestMeta::default();
        assert!(meta.run_on_request && meta.run_on_success && meta.run_on_error && meta.run_on_abort);
        assert!(!meta.silent);
        assert!(!meta.is_rehydrated());
    }

    #[test]
    fn test_any_preresolved_outcome_marks_rehydrated() {
        assert!(RequestMeta::default().with_cache_response(Response::with_data(1)).is_rehydrated());
        assert!(RequestMeta::default().with_ssr_response(Response::with_data(1)).is_rehydrated());
        assert!(RequestMeta::default().with_ssr_error(Value::Null).is_rehydrated());
    }
}
