//! Request pipeline benchmarks
//!
//! Measures the orchestrator overhead around an instantly answering driver:
//! - One query through the store (pipeline + reducer + broadcast)
//! - A batch of queries under distinct keys
//! - Cancellation of many pending keys
//!
//! Run with: `cargo bench -p composable-requests-runtime`

#![allow(missing_docs)] // Benchmarks don't need extensive docs
#![allow(clippy::expect_used)] // Benchmarks can use expect for setup

use composable_requests_cache::{NetworkReducer, NetworkState};
use composable_requests_core::{AbortRequests, Request, RequestAction, RequestMeta, Response};
use composable_requests_runtime::driver::{DriverCall, driver_fn};
use composable_requests_runtime::{OrchestratorConfig, Store};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use std::time::Duration;

fn instant_store() -> Store<NetworkState, NetworkReducer> {
    let driver = driver_fn(|request, _action| DriverCall::ready(Ok(Response::with_data(request.url))));
    Store::new(NetworkState::default(), NetworkReducer::default(), OrchestratorConfig::new(driver))
}

fn pending_store() -> Store<NetworkState, NetworkReducer> {
    let driver = driver_fn(|_request, _action| DriverCall::new(futures::future::pending()));
    Store::new(NetworkState::default(), NetworkReducer::default(), OrchestratorConfig::new(driver))
}

fn fetch_book(id: usize) -> RequestAction {
    RequestAction::new("FETCH_BOOK", Request::get(format!("/books/{id}")))
        .with_meta(RequestMeta::default().with_request_key(id.to_string()))
}

/// Single query: request, driver call, success, two reductions
fn bench_single_request(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_single");
    group.measurement_time(Duration::from_secs(5));

    let runtime = tokio::runtime::Runtime::new().expect("Failed to create runtime");
    let store = instant_store();

    group.bench_function("query_roundtrip", |b| {
        b.to_async(&runtime).iter(|| async {
            store.send(black_box(fetch_book(1)).into()).await.ok();
        });
    });

    group.finish();
}

/// Many keyed queries sent concurrently
fn bench_concurrent_requests(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_concurrent");
    group.measurement_time(Duration::from_secs(5));

    let runtime = tokio::runtime::Runtime::new().expect("Failed to create runtime");

    for count in [10_usize, 100] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.to_async(&runtime).iter(|| async move {
                let store = instant_store();
                let sends = (0..count).map(|id| store.send(fetch_book(id).into()));
                futures::future::join_all(sends).await;
            });
        });
    }

    group.finish();
}

/// Cancelling every pending key with one ABORT_REQUESTS
fn bench_abort_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_abort");
    group.measurement_time(Duration::from_secs(5));

    let runtime = tokio::runtime::Runtime::new().expect("Failed to create runtime");

    group.bench_function("abort_100_pending", |b| {
        b.to_async(&runtime).iter(|| async {
            let store = pending_store();
            let sends = futures::future::join_all((0..100).map(|id| store.send(fetch_book(id).into())));
            let abort = async {
                while store.orchestrator().registry().pending_keys() < 100 {
                    tokio::task::yield_now().await;
                }
                store.send(AbortRequests::default().into()).await.ok();
            };
            futures::future::join(sends, abort).await;
        });
    });

    group.finish();
}

criterion_group!(benches, bench_single_request, bench_concurrent_requests, bench_abort_all);
criterion_main!(benches);
