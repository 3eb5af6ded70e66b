//! Books Demo - request orchestration against an in-memory catalogue
//!
//! Walks through the request lifecycle end to end:
//! - a query cached in the store, kept in sync by a mutation updater
//! - a superseded query (take latest) and an explicit `ABORT_REQUESTS`
//! - a failing request whose error is normalized by `get_error`
//!
//! # Running the Example
//!
//! ```bash
//! RUST_LOG=info,composable_requests=debug cargo run -p books-demo
//! ```

#![allow(missing_docs)]

use composable_requests_cache::{NetworkReducer, NetworkState, get_mutation, get_query};
use composable_requests_core::{
    AbortRequests, Request, RequestAction, RequestError, RequestMeta, Response, hooks,
};
use composable_requests_runtime::driver::{Driver, DriverCall};
use composable_requests_runtime::metrics::MetricsExporter;
use composable_requests_runtime::{Interceptors, OrchestratorConfig, Store};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Catalogue served by [`LibraryDriver`]
#[derive(Default)]
struct Library {
    books: Vec<Value>,
    next_id: u64,
}

impl Library {
    fn answer(&mut self, request: &Request) -> Result<Response, RequestError> {
        let url = request.url.as_deref().unwrap_or_default();
        let method = request.method.as_deref().unwrap_or("get");

        match (method, url.strip_prefix("/books")) {
            ("get", Some("")) => Ok(Response::with_data(self.books.clone())),
            ("get", Some(path)) => {
                let id = path.trim_start_matches('/');
                self.books
                    .iter()
                    .find(|book| book["id"] == id)
                    .cloned()
                    .map(Response::with_data)
                    .ok_or_else(|| RequestError::driver(json!({ "status": 404, "id": id })))
            },
            ("post", Some("")) => {
                self.next_id += 1;
                let mut book = request.body.clone().unwrap_or_else(|| json!({}));
                book["id"] = json!(self.next_id.to_string());
                self.books.push(book.clone());
                Ok(Response::with_data(book))
            },
            _ => Err(RequestError::driver(json!({ "status": 405, "url": url }))),
        }
    }
}

/// Driver answering from [`Library`] after a fixed latency
///
/// Cancelling a call drops it before the catalogue is touched.
struct LibraryDriver {
    library: Arc<Mutex<Library>>,
    latency: Duration,
}

impl Driver for LibraryDriver {
    fn execute(&self, request: Request, _action: &RequestAction) -> DriverCall {
        let library = Arc::clone(&self.library);
        let latency = self.latency;
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();

        DriverCall::new(async move {
            tokio::select! {
                Ok(()) = cancel_rx => Err(RequestError::Aborted),
                () = tokio::time::sleep(latency) => library
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .answer(&request),
            }
        })
        .with_cancel(move || {
            tracing::debug!("Transport call cancelled");
            let _ = cancel_tx.send(());
        })
    }
}

fn fetch_books() -> RequestAction {
    let append_added = hooks::mutation_updater(|books, added| {
        let mut books = books.as_array().cloned().unwrap_or_default();
        books.push(added.clone());
        Value::Array(books)
    });

    RequestAction::new("FETCH_BOOKS", Request::get("/books"))
        .with_meta(RequestMeta::default().with_multiple(true).with_mutation("ADD_BOOK", append_added))
}

fn add_book(title: &str) -> RequestAction {
    RequestAction::new("ADD_BOOK", Request::post("/books").with_body(json!({ "title": title })))
}

fn fetch_book(id: &str) -> RequestAction {
    RequestAction::new("FETCH_BOOK", Request::get(format!("/books/{id}"))).with_meta(
        RequestMeta::default()
            .with_request_key(id)
            .with_get_error(hooks::get_error(|error| {
                json!({ "message": "Book not available", "cause": error.payload() })
            })),
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,composable_requests_runtime=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Books Demo");

    // 2. Install the metrics recorder
    let mut exporter = MetricsExporter::new();
    exporter.install()?;

    // 3. Create store with an in-memory driver and a logging interceptor
    let driver = Arc::new(LibraryDriver {
        library: Arc::new(Mutex::new(Library::default())),
        latency: Duration::from_millis(50),
    });
    let interceptors = Interceptors::default().with_on_request(hooks::on_request(|payload, action| async move {
        tracing::info!(action_type = %action.action_type, calls = payload.len(), "Sending request");
        payload
    }));
    let store = Store::new(
        NetworkState::default(),
        NetworkReducer::default(),
        OrchestratorConfig::new(driver).with_interceptors(interceptors),
    );

    // 4. Query, then mutate; the updater keeps the cached list current
    store.send(fetch_books().into()).await?;
    for title in ["Dune", "Emma"] {
        store.send(add_book(title).into()).await?;
    }
    let books = store.state(|s| get_query(s, "FETCH_BOOKS")).await;
    tracing::info!(data = %books.data, "Cached books after mutations");
    let adding = store.state(|s| get_mutation(s, "ADD_BOOK")).await;
    tracing::info!(loading = adding.loading, "ADD_BOOK mutation state");

    // 5. Take latest: the first fetch is superseded by the second
    let (first, second) = tokio::join!(store.send(fetch_books().into()), store.send(fetch_books().into()));
    let superseded = first?.into_outcome().is_some_and(|outcome| outcome.is_err());
    let latest = second?.into_outcome().is_some_and(|outcome| outcome.is_ok());
    tracing::info!(superseded, latest, "Concurrent fetches settled");

    // 6. Abort a pending request explicitly
    let (fetch, abort) = tokio::join!(store.send(fetch_book("1").into()), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        store.send(AbortRequests::default().into()).await
    });
    abort?;
    if let Some(Err(failure)) = fetch?.into_outcome() {
        tracing::info!(aborted = failure.is_aborted(), "FETCH_BOOK settled");
    }

    // 7. A failing request ends in an error action with a normalized payload
    store.send(fetch_book("42").into()).await?;
    let missing = store.state(|s| get_query(s, "FETCH_BOOK")).await;
    tracing::info!(error = ?missing.error, "FETCH_BOOK error");

    // 8. Report metrics and shut down
    if let Some(metrics) = exporter.render() {
        println!("{metrics}");
    }

    store.shutdown(Duration::from_secs(5)).await?;
    tracing::info!("✓ Clean shutdown complete");

    Ok(())
}
