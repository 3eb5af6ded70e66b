//! The request orchestrator.
//!
//! Sits between whoever sends actions and the reducers. Control actions
//! cancel pending calls; request actions run through the interceptor
//! pipeline and end in exactly one lifecycle action; everything else passes
//! straight through to the [`Dispatcher`].

use crate::config::OrchestratorConfig;
use crate::driver::DriverCall;
use crate::error::StoreError;
use crate::interceptor::Pipeline;
use crate::registry::{CallHandle, PendingCallRegistry};
use composable_requests_core::action::{AbortAction, Action, ErrorAction, RequestKey, SuccessAction};
use composable_requests_core::{RequestAction, RequestError, Response, Value};
use futures::future::{AbortHandle, Abortable, BoxFuture, FutureExt};
use thiserror::Error;

/// Where the orchestrator delivers actions
///
/// In a store this reduces the action and notifies subscribers.
pub trait Dispatcher: Send + Sync {
    /// Deliver `action` to the reducers
    fn dispatch(&self, action: Action) -> BoxFuture<'_, ()>;

    /// Currently cached data of the query slice `request_type`
    fn query_data(&self, request_type: String) -> BoxFuture<'_, Option<Value>>;
}

/// A request that ended in a success action
#[derive(Clone, Debug)]
pub struct RequestSuccess {
    /// The success action (dispatched unless the request was silent)
    pub action: SuccessAction,
    /// Final response
    pub response: Response,
}

/// A request that ended in an error or abort action
#[derive(Error, Clone, Debug)]
pub enum RequestFailure {
    /// The request failed
    #[error("Request failed: {error}")]
    Error {
        /// The error action (dispatched unless the request was silent)
        action: ErrorAction,
        /// Final error
        error: RequestError,
    },

    /// The request was cancelled
    #[error("Request aborted")]
    Aborted {
        /// The abort action (dispatched unless the request was silent)
        action: AbortAction,
    },
}

impl RequestFailure {
    /// Whether the request was cancelled
    #[must_use]
    pub const fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }

    /// The terminal lifecycle action
    #[must_use]
    pub fn action(&self) -> Action {
        match self {
            Self::Error { action, .. } => Action::Error(action.clone()),
            Self::Aborted { action } => Action::Abort(action.clone()),
        }
    }
}

/// Terminal result of one request action
pub type RequestOutcome = Result<RequestSuccess, RequestFailure>;

/// What [`Orchestrator::handle`] did with an action
#[derive(Debug)]
pub enum Handled {
    /// Not a request action: passed through to the dispatcher
    Forwarded,
    /// A request action, run to its terminal lifecycle action
    Request(RequestOutcome),
}

impl Handled {
    /// The request outcome, if the action was a request
    #[must_use]
    pub fn into_outcome(self) -> Option<RequestOutcome> {
        match self {
            Self::Forwarded => None,
            Self::Request(outcome) => Some(outcome),
        }
    }
}

/// Executes request actions and owns the pending call registry
///
/// Each orchestrator instance has its own registry, so two stores never
/// cancel each other's calls.
#[derive(Debug)]
pub struct Orchestrator {
    config: OrchestratorConfig,
    registry: PendingCallRegistry,
}

impl Orchestrator {
    /// Orchestrator with an empty registry
    #[must_use]
    pub fn new(config: OrchestratorConfig) -> Self {
        Self {
            config,
            registry: PendingCallRegistry::new(),
        }
    }

    /// The configuration
    #[must_use]
    pub const fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// The pending call registry
    #[must_use]
    pub const fn registry(&self) -> &PendingCallRegistry {
        &self.registry
    }

    /// Handle one action
    ///
    /// Request actions are awaited until their lifecycle action has been
    /// dispatched. Callers that must not block spawn this.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidPayload`] for a request action with an
    /// empty batch. Nothing is dispatched in that case.
    #[tracing::instrument(skip_all, fields(action_type = %action.action_type()))]
    pub async fn handle(&self, action: Action, dispatcher: &dyn Dispatcher) -> Result<Handled, StoreError> {
        match action {
            Action::Request(request) if (self.config.is_request_action)(&request) => {
                if request.request.is_empty() {
                    tracing::warn!("Rejected request action with an empty batch");
                    return Err(StoreError::InvalidPayload(request.action_type));
                }

                let outcome = Pipeline::new(self, dispatcher, request).run().await;
                Ok(Handled::Request(outcome))
            },
            action => {
                match &action {
                    Action::AbortRequests(abort) => {
                        self.cancel(abort.requests.as_deref());
                    },
                    Action::ResetRequests(reset) if reset.abort_pending => {
                        self.cancel(reset.requests.as_deref());
                    },
                    _ => {},
                }

                dispatcher.dispatch(action).await;
                Ok(Handled::Forwarded)
            },
        }
    }

    /// Cancel pending calls under the listed keys, or all of them
    ///
    /// The cancelled requests dispatch their own abort actions once their
    /// pipelines observe the cancellation.
    pub fn cancel(&self, keys: Option<&[RequestKey]>) -> usize {
        let cancelled = self.registry.cancel_keys(keys);
        tracing::debug!(cancelled, all = keys.is_none(), "Cancelled pending calls");
        cancelled
    }

    /// Run the driver calls of `action` and wait for all of them
    ///
    /// Applies take-latest, records every call in the registry for the
    /// lifetime of the wait and fails fast on the first failing call.
    pub(crate) async fn execute(&self, action: &RequestAction) -> Result<Vec<Response>, RequestError> {
        let driver = self.config.drivers.resolve(action.meta.driver.as_deref())?;
        let key = action.dedup_key();

        if self.config.take_latest_for(action) {
            let superseded = self.registry.cancel_key(&key);
            if superseded > 0 {
                tracing::debug!(key = %key, superseded, "Superseded pending calls");
            }
        }

        let mut handles = Vec::with_capacity(action.request.len());
        let mut calls = Vec::with_capacity(action.request.len());
        for request in action.request.as_slice() {
            let DriverCall { future, cancel } = driver.execute(request.clone(), action);
            let (abort, registration) = AbortHandle::new_pair();
            handles.push(CallHandle::new(abort, cancel));
            calls.push(
                Abortable::new(future, registration)
                    .map(|result| result.unwrap_or_else(|_aborted| Err(RequestError::Aborted))),
            );
        }

        let _settle = Settle {
            registry: &self.registry,
            generation: self.registry.register(&key, handles),
            key,
        };

        futures::future::try_join_all(calls).await
    }
}

/// Removes an execution from the registry when its wait ends, however it ends
struct Settle<'a> {
    registry: &'a PendingCallRegistry,
    key: String,
    generation: u64,
}

impl Drop for Settle<'_> {
    fn drop(&mut self) {
        self.registry.complete(&self.key, self.generation);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::driver::driver_fn;
    use composable_requests_core::{Request, RequestMeta};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        actions: Mutex<Vec<String>>,
    }

    impl Dispatcher for Recorder {
        fn dispatch(&self, action: Action) -> BoxFuture<'_, ()> {
            self.actions.lock().unwrap().push(action.action_type().to_string());
            futures::future::ready(()).boxed()
        }

        fn query_data(&self, _request_type: String) -> BoxFuture<'_, Option<Value>> {
            futures::future::ready(None).boxed()
        }
    }

    fn orchestrator() -> Orchestrator {
        Orchestrator::new(OrchestratorConfig::new(driver_fn(|request, _action| {
            DriverCall::ready(Ok(Response::with_data(request.url)))
        })))
    }

    #[tokio::test]
    async fn test_plain_actions_pass_through() {
        let dispatcher = Recorder::default();
        let handled = orchestrator()
            .handle(Action::custom("TOGGLE", Value::Null), &dispatcher)
            .await
            .unwrap();

        assert!(matches!(handled, Handled::Forwarded));
        assert_eq!(*dispatcher.actions.lock().unwrap(), vec!["TOGGLE".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_batch_is_rejected_before_dispatch() {
        let dispatcher = Recorder::default();
        let action = RequestAction::new("FETCH", Vec::<Request>::new());

        let result = orchestrator().handle(action.into(), &dispatcher).await;

        assert!(matches!(result, Err(StoreError::InvalidPayload(ref t)) if t == "FETCH"));
        assert!(dispatcher.actions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_filtered_request_actions_pass_through() {
        let config = OrchestratorConfig::new(driver_fn(|_request, _action| {
            DriverCall::ready(Ok(Response::new()))
        }))
        .with_is_request_action(composable_requests_core::hooks::predicate(|action| {
            !action.action_type.starts_with("LOCAL_")
        }));
        let dispatcher = Recorder::default();

        let handled = Orchestrator::new(config)
            .handle(RequestAction::new("LOCAL_ONLY", Request::get("/")).into(), &dispatcher)
            .await
            .unwrap();

        assert!(matches!(handled, Handled::Forwarded));
        assert_eq!(*dispatcher.actions.lock().unwrap(), vec!["LOCAL_ONLY".to_string()]);
    }

    #[tokio::test]
    async fn test_registry_is_empty_after_settling() {
        let orchestrator = orchestrator();
        let dispatcher = Recorder::default();
        let action = RequestAction::new("FETCH", Request::get("/books"))
            .with_meta(RequestMeta::default().with_request_key("1"));

        let outcome = orchestrator.handle(action.into(), &dispatcher).await.unwrap().into_outcome();

        assert!(matches!(outcome, Some(Ok(_))));
        assert_eq!(orchestrator.registry().pending_keys(), 0);
        assert_eq!(
            *dispatcher.actions.lock().unwrap(),
            vec!["FETCH".to_string(), "FETCH_SUCCESS".to_string()]
        );
    }
}
