//! Mock driver and dispatcher.

use composable_requests_core::{Action, Request, RequestAction, RequestError, Response, Value};
use composable_requests_runtime::driver::{Driver, DriverCall};
use composable_requests_runtime::orchestrator::Dispatcher;
use futures::future::{BoxFuture, FutureExt};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;

type Reply = Result<Response, RequestError>;

#[derive(Default)]
struct MockState {
    replies: HashMap<String, Reply>,
    gates: HashMap<String, VecDeque<oneshot::Receiver<Reply>>>,
    calls: Vec<Request>,
    cancelled: Vec<String>,
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Scripted driver keyed by request URL
///
/// - [`respond`](Self::respond) / [`fail`](Self::fail) script an immediate
///   reply reused for every call to a URL
/// - [`gate`](Self::gate) makes the next call to a URL wait until the test
///   settles the returned [`Gate`]
/// - Calls to URLs without a script fail with a driver error
///
/// Every call and every invocation of a call's cancel capability is recorded.
///
/// # Example
///
/// ```
/// use composable_requests_testing::MockDriver;
/// use composable_requests_core::Response;
///
/// let driver = MockDriver::new().respond("/books", Response::with_data(vec!["Dune"]));
/// let shared = driver.clone().into_driver();
/// # let _ = shared;
/// assert!(driver.calls().is_empty());
/// ```
#[derive(Clone, Default)]
pub struct MockDriver {
    state: Arc<Mutex<MockState>>,
    uncancellable: bool,
}

impl MockDriver {
    /// Driver with nothing scripted
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: calls expose no cancel capability
    #[must_use]
    pub const fn without_cancel(mut self) -> Self {
        self.uncancellable = true;
        self
    }

    /// Builder: every call to `url` succeeds with `response`
    #[must_use]
    pub fn respond(self, url: impl Into<String>, response: Response) -> Self {
        lock(&self.state).replies.insert(url.into(), Ok(response));
        self
    }

    /// Builder: every call to `url` fails with `error` as driver payload
    #[must_use]
    pub fn fail(self, url: impl Into<String>, error: Value) -> Self {
        lock(&self.state)
            .replies
            .insert(url.into(), Err(RequestError::Driver(error)));
        self
    }

    /// Hold the next call to `url` until the returned gate is settled
    ///
    /// Dropping the gate unsettled makes the call report an abort.
    #[must_use]
    pub fn gate(&self, url: impl Into<String>) -> Gate {
        let (sender, receiver) = oneshot::channel();
        lock(&self.state)
            .gates
            .entry(url.into())
            .or_default()
            .push_back(receiver);
        Gate { sender }
    }

    /// Share as a driver trait object
    #[must_use]
    pub fn into_driver(self) -> Arc<dyn Driver> {
        Arc::new(self)
    }

    /// Requests received so far, in call order
    #[must_use]
    pub fn calls(&self) -> Vec<Request> {
        lock(&self.state).calls.clone()
    }

    /// URLs whose calls had their cancel capability invoked
    #[must_use]
    pub fn cancelled(&self) -> Vec<String> {
        lock(&self.state).cancelled.clone()
    }

    /// Wait until at least `count` calls were made
    ///
    /// Returns `false` if that did not happen within `timeout`.
    pub async fn wait_for_calls(&self, count: usize, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, async {
            while lock(&self.state).calls.len() < count {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .is_ok()
    }
}

impl Driver for MockDriver {
    fn execute(&self, request: Request, _action: &RequestAction) -> DriverCall {
        let url = request.url.clone().unwrap_or_default();

        let call = {
            let mut state = lock(&self.state);
            state.calls.push(request);

            let gated = state.gates.get_mut(&url).and_then(VecDeque::pop_front);
            match gated {
                Some(receiver) => DriverCall::new(async move {
                    receiver.await.unwrap_or(Err(RequestError::Aborted))
                }),
                None => DriverCall::ready(state.replies.get(&url).cloned().unwrap_or_else(|| {
                    Err(RequestError::driver(serde_json::json!({
                        "message": format!("No reply scripted for {url}")
                    })))
                })),
            }
        };

        if self.uncancellable {
            return call;
        }

        let state = Arc::clone(&self.state);
        call.with_cancel(move || lock(&state).cancelled.push(url))
    }
}

/// Pending reply of a gated [`MockDriver`] call
#[derive(Debug)]
pub struct Gate {
    sender: oneshot::Sender<Reply>,
}

impl Gate {
    /// Let the call succeed; `false` if nobody waits for it anymore
    pub fn resolve(self, response: Response) -> bool {
        self.sender.send(Ok(response)).is_ok()
    }

    /// Let the call fail; `false` if nobody waits for it anymore
    pub fn reject(self, error: RequestError) -> bool {
        self.sender.send(Err(error)).is_ok()
    }
}

/// Dispatcher recording every action, with scripted cached query data
///
/// Lets orchestrator tests run without a store or reducer.
#[derive(Default)]
pub struct RecordingDispatcher {
    actions: Mutex<Vec<Action>>,
    queries: HashMap<String, Value>,
}

impl RecordingDispatcher {
    /// Dispatcher with no cached data
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: cached data returned for the query slice `request_type`
    #[must_use]
    pub fn with_query_data(mut self, request_type: impl Into<String>, data: Value) -> Self {
        self.queries.insert(request_type.into(), data);
        self
    }

    /// Actions dispatched so far
    #[must_use]
    pub fn actions(&self) -> Vec<Action> {
        self.actions.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Types of the actions dispatched so far
    #[must_use]
    pub fn action_types(&self) -> Vec<String> {
        self.actions()
            .iter()
            .map(|action| action.action_type().to_string())
            .collect()
    }
}

impl Dispatcher for RecordingDispatcher {
    fn dispatch(&self, action: Action) -> BoxFuture<'_, ()> {
        self.actions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(action);
        futures::future::ready(()).boxed()
    }

    fn query_data(&self, request_type: String) -> BoxFuture<'_, Option<Value>> {
        futures::future::ready(self.queries.get(&request_type).cloned()).boxed()
    }
}
