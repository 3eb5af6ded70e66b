//! # Composable Requests Runtime
//!
//! Runtime side of Composable Requests: everything that performs I/O.
//!
//! ## Core Components
//!
//! - **Driver**: executes request descriptors ([`driver::Driver`])
//! - **Orchestrator**: turns request actions into driver calls, tracks them
//!   for cancellation and runs the interceptor pipeline
//!   ([`orchestrator::Orchestrator`])
//! - **Registry**: in-flight calls by dedup key ([`registry::PendingCallRegistry`])
//! - **Store**: state + reducer behind the orchestrator ([`Store`])
//!
//! ## Example
//!
//! ```
//! use composable_requests_cache::{NetworkReducer, NetworkState, get_query};
//! use composable_requests_core::{Request, RequestAction, Response};
//! use composable_requests_runtime::Store;
//! use composable_requests_runtime::config::OrchestratorConfig;
//! use composable_requests_runtime::driver::{DriverCall, driver_fn};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let driver = driver_fn(|_request, _action| DriverCall::ready(Ok(Response::with_data(vec!["Dune"]))));
//! let store = Store::new(NetworkState::default(), NetworkReducer::default(), OrchestratorConfig::new(driver));
//!
//! store.send(RequestAction::new("FETCH_BOOKS", Request::get("/books")).into()).await?;
//!
//! let books = store.state(|s| get_query(s, "FETCH_BOOKS").data).await;
//! assert_eq!(books, serde_json::json!(["Dune"]));
//! # Ok(())
//! # }
//! ```

/// Orchestrator and store configuration
pub mod config;

/// Driver contract
pub mod driver;

/// Interceptor pipeline state machine
mod interceptor;

/// Prometheus metrics for observability
pub mod metrics;

/// Request orchestration
pub mod orchestrator;

/// Pending call registry
pub mod registry;

/// Store runtime
pub mod store;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    ///
    /// Request failures are not store errors: they end in error or abort
    /// actions and are reported through
    /// [`RequestFailure`](crate::orchestrator::RequestFailure).
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum StoreError {
        /// A request action carried an empty batch
        ///
        /// Rejected before any interceptor runs or anything is dispatched.
        #[error("Request action {0} has an empty batch")]
        InvalidPayload(String),

        /// Store is shutting down and not accepting new actions
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for pending calls
        #[error("Shutdown timed out with {0} keys still pending")]
        ShutdownTimeout(usize),

        /// Timeout waiting for a matching action
        ///
        /// Returned by `send_and_wait_for` when the timeout expires before
        /// a matching action is received.
        #[error("Timeout waiting for action")]
        Timeout,

        /// Action broadcast channel closed
        #[error("Action broadcast channel closed")]
        ChannelClosed,
    }
}

pub use config::{Interceptors, OrchestratorConfig, StoreConfig, TakeLatest};
pub use driver::{Driver, DriverCall, Drivers};
pub use error::StoreError;
pub use orchestrator::{Dispatcher, Handled, Orchestrator, RequestFailure, RequestOutcome, RequestSuccess};
pub use store::Store;
