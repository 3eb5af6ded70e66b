//! The interceptor pipeline of one request action.
//!
//! Written as an explicit state machine. Every stage consumes the previous
//! stage's value and names its successor:
//!
//! ```text
//! Requesting ──► Executing ──► Resolving ──────────────► Done(Ok)
//!                    │             ▲
//!                    ▼             │ (on_error recovered)
//!                Erroring ─────────┘
//!                    │  ╲
//!                    │   ╲──────────────────────────────► Done(Err: error)
//!                    ▼
//!                Aborting ──────────────────────────────► Done(Err: aborted)
//! ```
//!
//! Global interceptors always run before the per-action hook of the same
//! kind, and the `meta.run_on_*` flags gate only the global ones.

use crate::metrics::RequestMetrics;
use crate::orchestrator::{Dispatcher, Orchestrator, RequestFailure, RequestOutcome, RequestSuccess};
use composable_requests_core::action::{AbortAction, Action, ErrorAction, SuccessAction};
use composable_requests_core::{RequestAction, RequestError, Response, Value};
use std::time::Instant;

/// Where a request currently is
#[derive(Debug)]
pub(crate) enum Stage {
    /// Run the on-request chain and forward the request action
    Requesting,
    /// Obtain the raw outcome from the meta or the driver
    Executing,
    /// Run the success chain over a response
    Resolving(Response),
    /// Run the error chain over a failure
    Erroring(RequestError),
    /// Run the abort hooks
    Aborting,
    /// Terminal lifecycle action emitted
    Done(RequestOutcome),
}

/// How a stage hands over to the next one
#[derive(Debug)]
pub(crate) enum Transition {
    /// Ordinary progression
    Continue(Stage),
    /// An error interceptor recovered the request onto the success path
    Divert(Stage),
}

/// State carried through the stages of one request action
pub(crate) struct Pipeline<'a> {
    orchestrator: &'a Orchestrator,
    dispatcher: &'a dyn Dispatcher,
    action: RequestAction,
    started: Instant,
}

impl<'a> Pipeline<'a> {
    pub(crate) fn new(
        orchestrator: &'a Orchestrator,
        dispatcher: &'a dyn Dispatcher,
        action: RequestAction,
    ) -> Self {
        Self {
            orchestrator,
            dispatcher,
            action,
            started: Instant::now(),
        }
    }

    /// Drive the machine to its terminal stage
    pub(crate) async fn run(mut self) -> RequestOutcome {
        RequestMetrics::record_dispatched();

        let mut stage = Stage::Requesting;
        loop {
            stage = match stage {
                Stage::Done(outcome) => return outcome,
                Stage::Requesting => self.request().await,
                Stage::Executing => self.execute().await,
                Stage::Resolving(response) => self.resolve(response).await,
                Stage::Erroring(error) => self.fail(error).await,
                Stage::Aborting => self.abort().await,
            }
            .into_stage();
        }
    }

    async fn request(&mut self) -> Transition {
        let interceptors = &self.orchestrator.config().interceptors;

        if self.action.meta.run_on_request {
            if let Some(hook) = &interceptors.on_request {
                self.action.request = hook(self.action.request.clone(), self.action.clone()).await;
            }
        }
        if let Some(hook) = self.action.meta.on_request.clone() {
            self.action.request = hook(self.action.request.clone(), self.action.clone()).await;
        }

        self.emit(Action::Request(self.action.clone())).await;
        Transition::Continue(Stage::Executing)
    }

    async fn execute(&mut self) -> Transition {
        let meta = &self.action.meta;
        if let Some(response) = meta.cache_response.as_ref().or(meta.ssr_response.as_ref()) {
            tracing::debug!("Resolving from a pre-resolved response");
            return Transition::Continue(Stage::Resolving(response.clone()));
        }
        if let Some(error) = &meta.ssr_error {
            tracing::debug!("Resolving from a pre-resolved error");
            return Transition::Continue(Stage::Erroring(RequestError::Driver(error.clone())));
        }

        match self.orchestrator.execute(&self.action).await {
            Ok(responses) if self.action.is_batch() => {
                Transition::Continue(Stage::Resolving(Response::merge_batch(&responses)))
            },
            Ok(responses) => Transition::Continue(Stage::Resolving(
                responses.into_iter().next().unwrap_or_default(),
            )),
            Err(error) => Transition::Continue(Stage::Erroring(error)),
        }
    }

    async fn resolve(&mut self, mut response: Response) -> Transition {
        let rehydrated = self.action.is_rehydrated();
        let interceptors = &self.orchestrator.config().interceptors;

        if !rehydrated {
            if let Some(get_data) = self.action.meta.get_data.clone() {
                let cached = self.dispatcher.query_data(self.action.action_type.clone()).await;
                let data = response.data().cloned().unwrap_or(Value::Null);
                response.set_data(get_data(data, cached));
            }
        }

        // For rehydrated actions the hooks only observe; the response stays.
        if self.action.meta.run_on_success {
            if let Some(hook) = &interceptors.on_success {
                let replaced = hook(response.clone(), self.action.clone()).await;
                if !rehydrated {
                    response = replaced;
                }
            }
        }
        if let Some(hook) = self.action.meta.on_success.clone() {
            let replaced = hook(response.clone(), self.action.clone()).await;
            if !rehydrated {
                response = replaced;
            }
        }

        let success = SuccessAction::new(self.action.clone(), response.clone());
        RequestMetrics::record_succeeded(self.started.elapsed());
        tracing::debug!(action_type = %success.action_type, "Request succeeded");
        self.emit(Action::Success(success.clone())).await;

        Transition::Continue(Stage::Done(Ok(RequestSuccess {
            action: success,
            response,
        })))
    }

    async fn fail(&mut self, mut error: RequestError) -> Transition {
        let interceptors = &self.orchestrator.config().interceptors;

        if !error.is_aborted() && !self.action.is_rehydrated() {
            if let Some(get_error) = &self.action.meta.get_error {
                error = RequestError::Transformed(get_error(&error));
            }
        }

        if !error.is_aborted() && self.action.meta.run_on_error {
            if let Some(hook) = &interceptors.on_error {
                match hook(error, self.action.clone()).await {
                    Ok(response) => return Transition::Divert(Stage::Resolving(response)),
                    Err(rethrown) => error = rethrown,
                }
            }
        }
        if !error.is_aborted() {
            if let Some(hook) = self.action.meta.on_error.clone() {
                match hook(error, self.action.clone()).await {
                    Ok(response) => return Transition::Divert(Stage::Resolving(response)),
                    Err(rethrown) => error = rethrown,
                }
            }
        }

        if error.is_aborted() {
            return Transition::Continue(Stage::Aborting);
        }

        let action = ErrorAction::new(self.action.clone(), error.clone());
        RequestMetrics::record_failed(self.started.elapsed());
        tracing::debug!(action_type = %action.action_type, error = %error, "Request failed");
        self.emit(Action::Error(action.clone())).await;

        Transition::Continue(Stage::Done(Err(RequestFailure::Error { action, error })))
    }

    async fn abort(&mut self) -> Transition {
        let interceptors = &self.orchestrator.config().interceptors;

        if self.action.meta.run_on_abort {
            if let Some(hook) = &interceptors.on_abort {
                hook(self.action.clone()).await;
            }
        }
        if let Some(hook) = self.action.meta.on_abort.clone() {
            hook(self.action.clone()).await;
        }

        let action = AbortAction::new(self.action.clone());
        RequestMetrics::record_aborted();
        tracing::debug!(action_type = %action.action_type, "Request aborted");
        self.emit(Action::Abort(action.clone())).await;

        Transition::Continue(Stage::Done(Err(RequestFailure::Aborted { action })))
    }

    /// Dispatch unless the request is silent
    async fn emit(&self, action: Action) {
        if !self.action.meta.silent {
            self.dispatcher.dispatch(action).await;
        }
    }
}

impl Transition {
    fn into_stage(self) -> Stage {
        match self {
            Self::Continue(stage) => stage,
            Self::Divert(stage) => {
                tracing::debug!("Error interceptor recovered the request");
                RequestMetrics::record_recovered();
                stage
            },
        }
    }
}
