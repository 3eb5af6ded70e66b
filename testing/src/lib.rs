//! # Composable Requests Testing
//!
//! Testing utilities and helpers for Composable Requests.
//!
//! This crate provides:
//! - A scripted [`MockDriver`] with gated calls and cancel recording
//! - A [`RecordingDispatcher`] for running the orchestrator without a store
//! - [`ReducerTest`], a Given-When-Then harness for reducers
//! - Property-based testing strategies for requests and responses
//!
//! ## Example
//!
//! ```
//! use composable_requests_testing::{MockDriver, RecordingDispatcher};
//! use composable_requests_core::{Request, RequestAction, Response};
//! use composable_requests_runtime::{Orchestrator, OrchestratorConfig};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let driver = MockDriver::new().respond("/books", Response::with_data(vec!["Dune"]));
//! let orchestrator = Orchestrator::new(OrchestratorConfig::new(driver.clone().into_driver()));
//! let dispatcher = RecordingDispatcher::new();
//!
//! let fetch = RequestAction::new("FETCH_BOOKS", Request::get("/books"));
//! let _ = orchestrator.handle(fetch.into(), &dispatcher).await;
//!
//! assert_eq!(dispatcher.action_types(), vec!["FETCH_BOOKS", "FETCH_BOOKS_SUCCESS"]);
//! assert_eq!(driver.calls().len(), 1);
//! # }
//! ```

/// Mock driver and dispatcher
pub mod mocks;

mod reducer_test;

/// Test helpers and utilities
pub mod helpers {
    /// Route `tracing` output through the test harness
    ///
    /// Honors `RUST_LOG`. Safe to call from every test; only the first call
    /// installs the subscriber.
    pub fn init_test_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use composable_requests_core::{Request, RequestPayload, Response};
    use proptest::prelude::*;
    use serde_json::{Value, json};

    fn arb_path() -> impl Strategy<Value = String> {
        "[a-z]{1,8}(/[a-z0-9]{1,6}){0,2}".prop_map(|path| format!("/{path}"))
    }

    /// Requests of every shape the read-only heuristic distinguishes
    pub fn arb_request() -> impl Strategy<Value = Request> {
        prop_oneof![
            arb_path().prop_map(Request::get),
            arb_path().prop_map(Request::post),
            arb_path().prop_map(Request::delete),
            "[a-z]{1,12}".prop_map(|field| Request::graphql(format!("query {{ {field} }}"))),
            "[a-z]{1,12}".prop_map(|field| Request::graphql(format!("mutation {{ {field} }}"))),
        ]
    }

    /// Scalar or small list JSON values
    pub fn arb_data() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::from),
            any::<i64>().prop_map(Value::from),
            "[a-zA-Z ]{0,16}".prop_map(Value::from),
            prop::collection::vec(any::<i32>(), 0..4).prop_map(|items| json!(items)),
        ]
    }

    /// Responses carrying `data` and up to two extra fields
    pub fn arb_response() -> impl Strategy<Value = Response> {
        (arb_data(), prop::collection::btree_map("[a-z]{1,6}", arb_data(), 0..3)).prop_map(
            |(data, extra)| {
                extra
                    .into_iter()
                    .filter(|(field, _)| field != "data")
                    .fold(Response::with_data(data), |response, (field, value)| {
                        response.with_field(field, value)
                    })
            },
        )
    }

    /// Non-empty batches of requests
    pub fn arb_batch() -> impl Strategy<Value = RequestPayload> {
        prop::collection::vec(arb_request(), 1..5).prop_map(RequestPayload::from)
    }
}

pub use helpers::init_test_tracing;
pub use mocks::{Gate, MockDriver, RecordingDispatcher};
pub use reducer_test::ReducerTest;

#[cfg(test)]
mod tests {
    use super::properties::{arb_batch, arb_response};
    use composable_requests_core::Response;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_batches_are_never_empty(batch in arb_batch()) {
            prop_assert!(batch.is_batch());
            prop_assert!(!batch.is_empty());
        }

        #[test]
        fn test_merging_one_response_keeps_every_field(response in arb_response()) {
            let merged = Response::merge_batch(std::slice::from_ref(&response));
            for (field, _) in response.fields() {
                prop_assert!(merged.get(field).is_some());
            }
        }
    }
}
