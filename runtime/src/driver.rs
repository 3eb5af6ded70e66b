//! Driver contract.
//!
//! A driver turns one [`Request`] into one pending call. The orchestrator
//! never looks inside a request descriptor; transport, serialization and
//! retries are the driver's business.

use composable_requests_core::{Request, RequestAction, RequestError, Response};
use futures::future::{BoxFuture, FutureExt};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// Cancels an in-flight call
///
/// Called at most once. Cancellation is cooperative: the orchestrator stops
/// waiting for the call whether or not the driver honours this.
pub type CancelFn = Box<dyn FnOnce() + Send>;

/// One pending driver call
pub struct DriverCall {
    /// Settles with the call's response or failure
    pub future: BoxFuture<'static, Result<Response, RequestError>>,
    /// Driver-side cancel capability, if the transport has one
    pub cancel: Option<CancelFn>,
}

impl DriverCall {
    /// Call without a cancel capability
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = Result<Response, RequestError>> + Send + 'static,
    {
        Self {
            future: future.boxed(),
            cancel: None,
        }
    }

    /// Call that has already settled
    #[must_use]
    pub fn ready(result: Result<Response, RequestError>) -> Self {
        Self::new(futures::future::ready(result))
    }

    /// Builder: attach a cancel capability
    #[must_use]
    pub fn with_cancel<C>(mut self, cancel: C) -> Self
    where
        C: FnOnce() + Send + 'static,
    {
        self.cancel = Some(Box::new(cancel));
        self
    }
}

impl std::fmt::Debug for DriverCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverCall")
            .field("cancellable", &self.cancel.is_some())
            .finish_non_exhaustive()
    }
}

/// Executes request descriptors
pub trait Driver: Send + Sync {
    /// Start one call for `request`, issued on behalf of `action`
    fn execute(&self, request: Request, action: &RequestAction) -> DriverCall;
}

/// Driver backed by a closure
pub struct FnDriver<F> {
    f: F,
}

impl<F> Driver for FnDriver<F>
where
    F: Fn(Request, &RequestAction) -> DriverCall + Send + Sync,
{
    fn execute(&self, request: Request, action: &RequestAction) -> DriverCall {
        (self.f)(request, action)
    }
}

/// Wrap a closure as a shareable driver
///
/// # Example
///
/// ```
/// use composable_requests_runtime::driver::{DriverCall, driver_fn};
/// use composable_requests_core::Response;
///
/// let echo = driver_fn(|request, _action| {
///     DriverCall::ready(Ok(Response::with_data(request.url)))
/// });
/// # let _ = echo;
/// ```
pub fn driver_fn<F>(f: F) -> Arc<dyn Driver>
where
    F: Fn(Request, &RequestAction) -> DriverCall + Send + Sync + 'static,
{
    Arc::new(FnDriver { f })
}

/// The default driver plus drivers selectable by name through `meta.driver`
#[derive(Clone)]
pub struct Drivers {
    default: Arc<dyn Driver>,
    named: HashMap<String, Arc<dyn Driver>>,
}

impl Drivers {
    /// Driver set with only a default driver
    #[must_use]
    pub fn new(default: Arc<dyn Driver>) -> Self {
        Self {
            default,
            named: HashMap::new(),
        }
    }

    /// Builder: register a named driver
    #[must_use]
    pub fn with_driver(mut self, name: impl Into<String>, driver: Arc<dyn Driver>) -> Self {
        self.named.insert(name.into(), driver);
        self
    }

    /// The driver for `name`, or the default when `name` is `None`
    ///
    /// # Errors
    ///
    /// Returns a driver failure when `name` is not registered.
    pub fn resolve(&self, name: Option<&str>) -> Result<Arc<dyn Driver>, RequestError> {
        match name {
            None => Ok(Arc::clone(&self.default)),
            Some(name) => self.named.get(name).cloned().ok_or_else(|| {
                RequestError::driver(serde_json::json!({ "message": format!("Unknown driver: {name}") }))
            }),
        }
    }
}

impl std::fmt::Debug for Drivers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Drivers")
            .field("named", &self.named.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn constant(data: &'static str) -> Arc<dyn Driver> {
        driver_fn(move |_request, _action| DriverCall::ready(Ok(Response::with_data(data))))
    }

    #[tokio::test]
    async fn test_resolve_default_and_named() {
        let drivers = Drivers::new(constant("default")).with_driver("graphql", constant("graphql"));
        let action = RequestAction::new("FETCH", Request::get("/"));

        let default = drivers.resolve(None).unwrap();
        let named = drivers.resolve(Some("graphql")).unwrap();

        let response = default.execute(Request::get("/"), &action).future.await.unwrap();
        assert_eq!(response.data(), Some(&json!("default")));
        let response = named.execute(Request::get("/"), &action).future.await.unwrap();
        assert_eq!(response.data(), Some(&json!("graphql")));
    }

    #[test]
    fn test_unknown_driver_is_a_driver_failure() {
        let drivers = Drivers::new(constant("default"));
        let error = drivers.resolve(Some("missing")).err().unwrap();
        assert_eq!(error.payload(), json!({ "message": "Unknown driver: missing" }));
    }

    #[test]
    fn test_boxed_call_settles() {
        let call = DriverCall::new(async { Ok(Response::with_data(7)) });
        let response = tokio_test::block_on(call.future);
        tokio_test::assert_ok!(&response);
        assert_eq!(response, Ok(Response::with_data(7)));
    }

    #[test]
    fn test_cancel_is_optional() {
        assert!(DriverCall::ready(Ok(Response::new())).cancel.is_none());
        assert!(DriverCall::ready(Ok(Response::new())).with_cancel(|| {}).cancel.is_some());
    }
}
