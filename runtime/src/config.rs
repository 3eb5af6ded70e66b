//! Orchestrator and store configuration.

use crate::driver::{Driver, Drivers};
use composable_requests_core::RequestAction;
use composable_requests_core::classify;
use composable_requests_core::hooks::{
    self, OnAbortHook, OnErrorHook, OnRequestHook, OnSuccessHook, RequestPredicate,
};
use std::sync::Arc;

/// Policy deciding whether a new request cancels pending calls under its dedup key
///
/// `meta.take_latest` on an action always wins over this policy.
#[derive(Clone, Default)]
pub enum TakeLatest {
    /// Same answer for every request
    Fixed(bool),
    /// Take latest for queries, never for mutations
    #[default]
    Queries,
    /// Decided per action
    When(RequestPredicate),
}

impl TakeLatest {
    pub(crate) fn applies(&self, action: &RequestAction, is_read_only: &RequestPredicate) -> bool {
        match self {
            Self::Fixed(take_latest) => *take_latest,
            Self::Queries => is_read_only(action),
            Self::When(predicate) => predicate(action),
        }
    }
}

impl std::fmt::Debug for TakeLatest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fixed(take_latest) => f.debug_tuple("Fixed").field(take_latest).finish(),
            Self::Queries => f.write_str("Queries"),
            Self::When(_) => f.write_str("When(..)"),
        }
    }
}

/// Global interceptors, run before the per-action hooks of the same kind
#[derive(Clone, Default)]
pub struct Interceptors {
    /// Rewrites outgoing request payloads
    pub on_request: Option<OnRequestHook>,
    /// Replaces successful responses
    pub on_success: Option<OnSuccessHook>,
    /// Recovers from or rewrites failures
    pub on_error: Option<OnErrorHook>,
    /// Observes aborted requests
    pub on_abort: Option<OnAbortHook>,
}

impl Interceptors {
    /// Builder: global request interceptor
    #[must_use]
    pub fn with_on_request(mut self, hook: OnRequestHook) -> Self {
        self.on_request = Some(hook);
        self
    }

    /// Builder: global success interceptor
    #[must_use]
    pub fn with_on_success(mut self, hook: OnSuccessHook) -> Self {
        self.on_success = Some(hook);
        self
    }

    /// Builder: global error interceptor
    #[must_use]
    pub fn with_on_error(mut self, hook: OnErrorHook) -> Self {
        self.on_error = Some(hook);
        self
    }

    /// Builder: global abort interceptor
    #[must_use]
    pub fn with_on_abort(mut self, hook: OnAbortHook) -> Self {
        self.on_abort = Some(hook);
        self
    }
}

impl std::fmt::Debug for Interceptors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interceptors")
            .field("on_request", &self.on_request.is_some())
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_abort", &self.on_abort.is_some())
            .finish()
    }
}

/// Configuration of the request orchestrator
///
/// # Example
///
/// ```
/// use composable_requests_runtime::config::{OrchestratorConfig, TakeLatest};
/// use composable_requests_runtime::driver::{DriverCall, driver_fn};
/// use composable_requests_core::Response;
///
/// let config = OrchestratorConfig::new(driver_fn(|_request, _action| {
///     DriverCall::ready(Ok(Response::with_data(1)))
/// }))
/// .with_take_latest(TakeLatest::Fixed(false));
/// # let _ = config;
/// ```
#[derive(Clone)]
pub struct OrchestratorConfig {
    /// Available drivers
    pub drivers: Drivers,
    /// Default cancellation policy for repeated dedup keys
    pub take_latest: TakeLatest,
    /// Which request actions the orchestrator executes; others pass through
    pub is_request_action: RequestPredicate,
    /// Query vs. mutation classifier used by [`TakeLatest::Queries`]
    pub is_request_read_only: RequestPredicate,
    /// Global interceptors
    pub interceptors: Interceptors,
}

impl OrchestratorConfig {
    /// Configuration executing every request action with `driver`
    #[must_use]
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        Self::with_drivers(Drivers::new(driver))
    }

    /// Configuration with a full driver set
    #[must_use]
    pub fn with_drivers(drivers: Drivers) -> Self {
        Self {
            drivers,
            take_latest: TakeLatest::default(),
            is_request_action: hooks::predicate(|_| true),
            is_request_read_only: classify::default_read_only(),
            interceptors: Interceptors::default(),
        }
    }

    /// Builder: cancellation policy
    #[must_use]
    pub fn with_take_latest(mut self, take_latest: TakeLatest) -> Self {
        self.take_latest = take_latest;
        self
    }

    /// Builder: request action filter
    #[must_use]
    pub fn with_is_request_action(mut self, predicate: RequestPredicate) -> Self {
        self.is_request_action = predicate;
        self
    }

    /// Builder: query vs. mutation classifier
    #[must_use]
    pub fn with_is_request_read_only(mut self, predicate: RequestPredicate) -> Self {
        self.is_request_read_only = predicate;
        self
    }

    /// Builder: global interceptors
    #[must_use]
    pub fn with_interceptors(mut self, interceptors: Interceptors) -> Self {
        self.interceptors = interceptors;
        self
    }

    /// Effective take-latest flag for `action`
    ///
    /// `meta.take_latest` first, then the configured policy.
    #[must_use]
    pub fn take_latest_for(&self, action: &RequestAction) -> bool {
        action
            .meta
            .take_latest
            .unwrap_or_else(|| self.take_latest.applies(action, &self.is_request_read_only))
    }
}

impl std::fmt::Debug for OrchestratorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrchestratorConfig")
            .field("drivers", &self.drivers)
            .field("take_latest", &self.take_latest)
            .field("interceptors", &self.interceptors)
            .finish_non_exhaustive()
    }
}

/// Store configuration
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Number of actions buffered for slow subscribers
    pub broadcast_capacity: usize,
}

impl StoreConfig {
    /// Builder: broadcast capacity
    #[must_use]
    pub const fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{DriverCall, driver_fn};
    use composable_requests_core::{Request, RequestMeta, Response};

    fn config() -> OrchestratorConfig {
        OrchestratorConfig::new(driver_fn(|_request, _action| DriverCall::ready(Ok(Response::new()))))
    }

    #[test]
    fn test_default_takes_latest_for_queries_only() {
        let config = config();
        assert!(config.take_latest_for(&RequestAction::new("FETCH", Request::get("/books"))));
        assert!(!config.take_latest_for(&RequestAction::new("ADD", Request::post("/books"))));
    }

    #[test]
    fn test_meta_overrides_policy() {
        let config = config().with_take_latest(TakeLatest::Fixed(true));
        let action = RequestAction::new("FETCH", Request::get("/books"))
            .with_meta(RequestMeta::default().with_take_latest(false));
        assert!(!config.take_latest_for(&action));
    }

    #[test]
    fn test_policy_function() {
        let config = config().with_take_latest(TakeLatest::When(hooks::predicate(|action| {
            action.meta.request_key.is_some()
        })));
        let plain = RequestAction::new("FETCH", Request::get("/books"));
        let keyed = plain.clone().with_meta(RequestMeta::default().with_request_key("1"));

        assert!(!config.take_latest_for(&plain));
        assert!(config.take_latest_for(&keyed));
    }
}
