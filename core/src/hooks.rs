//! Hook and predicate capability types
//!
//! Every hook is an `Arc<dyn Fn>` so actions and configs stay cheap to clone.
//! Hooks that may suspend return a [`BoxFuture`]. The constructor functions in
//! this module take ordinary closures and do the boxing, which keeps closure
//! signatures inferable at the call site:
//!
//! ```
//! use composable_requests_core::hooks;
//! use composable_requests_core::Response;
//!
//! let on_success = hooks::on_success(|response: Response, _action| async move {
//!     response.with_field("seen", true)
//! });
//! # let _ = on_success;
//! ```

use crate::action::RequestAction;
use crate::error::RequestError;
use crate::request::{RequestPayload, Response};
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// Rewrites the outgoing request payload before execution
pub type OnRequestHook =
    Arc<dyn Fn(RequestPayload, RequestAction) -> BoxFuture<'static, RequestPayload> + Send + Sync>;

/// Receives the response and returns the one to keep
pub type OnSuccessHook =
    Arc<dyn Fn(Response, RequestAction) -> BoxFuture<'static, Response> + Send + Sync>;

/// Either recovers with a response (`Ok`) or keeps failing (`Err`)
pub type OnErrorHook = Arc<
    dyn Fn(RequestError, RequestAction) -> BoxFuture<'static, Result<Response, RequestError>>
        + Send
        + Sync,
>;

/// Side effect run when a call is aborted
pub type OnAbortHook = Arc<dyn Fn(RequestAction) -> BoxFuture<'static, ()> + Send + Sync>;

/// `(new data, currently cached data) -> data to store`
pub type GetDataFn = Arc<dyn Fn(Value, Option<Value>) -> Value + Send + Sync>;

/// Maps a failure to the error value reported downstream
pub type GetErrorFn = Arc<dyn Fn(&RequestError) -> Value + Send + Sync>;

/// Derives a key from a request action
pub type RequestKeyFn = Arc<dyn Fn(&RequestAction) -> String + Send + Sync>;

/// Boolean test over a request action
pub type RequestPredicate = Arc<dyn Fn(&RequestAction) -> bool + Send + Sync>;

/// `(current query data, mutation response data) -> new query data`
pub type MutationUpdater = Arc<dyn Fn(&Value, &Value) -> Value + Send + Sync>;

/// Build an [`OnRequestHook`] from an async closure
pub fn on_request<F, Fut>(f: F) -> OnRequestHook
where
    F: Fn(RequestPayload, RequestAction) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = RequestPayload> + Send + 'static,
{
    Arc::new(move |payload, action| f(payload, action).boxed())
}

/// Build an [`OnSuccessHook`] from an async closure
pub fn on_success<F, Fut>(f: F) -> OnSuccessHook
where
    F: Fn(Response, RequestAction) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    Arc::new(move |response, action| f(response, action).boxed())
}

/// Build an [`OnErrorHook`] from an async closure
pub fn on_error<F, Fut>(f: F) -> OnErrorHook
where
    F: Fn(RequestError, RequestAction) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, RequestError>> + Send + 'static,
{
    Arc::new(move |error, action| f(error, action).boxed())
}

/// Build an [`OnAbortHook`] from an async closure
pub fn on_abort<F, Fut>(f: F) -> OnAbortHook
where
    F: Fn(RequestAction) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |action| f(action).boxed())
}

/// Build a [`GetDataFn`]
pub fn get_data<F>(f: F) -> GetDataFn
where
    F: Fn(Value, Option<Value>) -> Value + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Build a [`GetErrorFn`]
pub fn get_error<F>(f: F) -> GetErrorFn
where
    F: Fn(&RequestError) -> Value + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Build a [`RequestKeyFn`]
pub fn request_key<F>(f: F) -> RequestKeyFn
where
    F: Fn(&RequestAction) -> String + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Build a [`RequestPredicate`]
pub fn predicate<F>(f: F) -> RequestPredicate
where
    F: Fn(&RequestAction) -> bool + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Build a [`MutationUpdater`]
pub fn mutation_updater<F>(f: F) -> MutationUpdater
where
    F: Fn(&Value, &Value) -> Value + Send + Sync + 'static,
{
    Arc::new(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Request;
    use serde_json::json;

    fn action() -> RequestAction {
        RequestAction::new("FETCH", Request::get("/books"))
    }

    #[tokio::test]
    async fn test_async_hooks_resolve() {
        let hook = on_success(|response: Response, action: RequestAction| async move {
            response.with_field("type", action.action_type)
        });
        let response = hook(Response::with_data(1), action()).await;
        assert_eq!(response.get("type"), Some(&json!("FETCH")));

        let recover = on_error(|_error, _action| async { Ok::<_, RequestError>(Response::with_data("cached")) });
        assert_eq!(recover(RequestError::driver("down"), action()).await, Ok(Response::with_data("cached")));
    }

    #[test]
    fn test_sync_hooks() {
        let merge = get_data(|data, cached| json!([cached, data]));
        assert_eq!(merge(json!(2), Some(json!(1))), json!([1, 2]));

        let key = request_key(|action| format!("{}:{}", action.action_type, action.request.len()));
        assert_eq!(key(&action()), "FETCH:1");
    }
}
