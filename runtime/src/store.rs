//! Store runtime: state, reducer and orchestrator in one place.
//!
//! Every action sent to the store first passes the [`Orchestrator`]. Actions
//! it forwards, and the lifecycle actions it emits, are reduced into state
//! under a write lock and then broadcast to subscribers.

use crate::config::{OrchestratorConfig, StoreConfig};
use crate::error::StoreError;
use crate::orchestrator::{Dispatcher, Handled, Orchestrator};
use composable_requests_core::{Action, QueryLookup, Reducer, Value};
use futures::future::{BoxFuture, FutureExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{RwLock, broadcast};

/// The Store - runtime coordinator for a reducer and the request orchestrator
///
/// # Type Parameters
///
/// - `S`: State type
/// - `R`: Reducer implementation
///
/// # Example
///
/// ```ignore
/// let store = Store::new(
///     NetworkState::default(),
///     NetworkReducer::default(),
///     OrchestratorConfig::new(http_driver),
/// );
///
/// let handled = store.send(fetch_books.into()).await?;
/// let books = store.state(|s| get_query(s, "FETCH_BOOKS")).await;
/// ```
pub struct Store<S, R> {
    state: RwLock<S>,
    reducer: R,
    orchestrator: Orchestrator,
    shutdown: AtomicBool,
    /// Every action that reached the reducer, in reduction order.
    action_broadcast: broadcast::Sender<Action>,
}

impl<S, R> Store<S, R>
where
    R: Reducer<State = S, Action = Action> + Send + Sync,
    S: QueryLookup + Send + Sync,
{
    /// Create a new store with default configuration
    #[must_use]
    pub fn new(initial_state: S, reducer: R, orchestrator: OrchestratorConfig) -> Self {
        Self::with_config(initial_state, reducer, orchestrator, StoreConfig::default())
    }

    /// Create a new store with custom configuration
    ///
    /// # Example
    ///
    /// ```ignore
    /// // High throughput: 256 actions buffered
    /// let store = Store::with_config(
    ///     NetworkState::default(),
    ///     NetworkReducer::default(),
    ///     orchestrator_config,
    ///     StoreConfig::default().with_broadcast_capacity(256),
    /// );
    /// ```
    #[must_use]
    pub fn with_config(
        initial_state: S,
        reducer: R,
        orchestrator: OrchestratorConfig,
        config: StoreConfig,
    ) -> Self {
        let (action_broadcast, _) = broadcast::channel(config.broadcast_capacity);

        Self {
            state: RwLock::new(initial_state),
            reducer,
            orchestrator: Orchestrator::new(orchestrator),
            shutdown: AtomicBool::new(false),
            action_broadcast,
        }
    }

    /// The orchestrator in front of the reducer
    #[must_use]
    pub const fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Send an action to the store
    ///
    /// For a request action this resolves once the terminal lifecycle action
    /// has been reduced; spawn the call to keep sending meanwhile.
    ///
    /// # Errors
    ///
    /// - [`StoreError::ShutdownInProgress`] if the store is shutting down
    /// - [`StoreError::InvalidPayload`] for a request action with an empty batch
    #[tracing::instrument(skip(self, action), name = "store_send", fields(action_type = %action.action_type()))]
    pub async fn send(&self, action: Action) -> Result<Handled, StoreError> {
        if self.shutdown.load(Ordering::Acquire) {
            tracing::warn!("Rejected action: store is shutting down");
            return Err(StoreError::ShutdownInProgress);
        }

        self.orchestrator.handle(action, self).await
    }

    /// Send an action and wait for a matching action to be reduced
    ///
    /// Subscribes before sending, so a matching action can never be missed
    /// because it was reduced too early.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Timeout`]: Timeout expired before matching action received
    /// - [`StoreError::ChannelClosed`]: Action broadcast channel closed
    /// - Any error of [`Store::send`]
    pub async fn send_and_wait_for<F>(
        &self,
        action: Action,
        predicate: F,
        timeout: Duration,
    ) -> Result<Action, StoreError>
    where
        F: Fn(&Action) -> bool,
    {
        // Subscribe BEFORE sending to avoid race condition
        let mut rx = self.action_broadcast.subscribe();

        tokio::time::timeout(timeout, async {
            self.send(action).await?;

            loop {
                match rx.recv().await {
                    Ok(action) if predicate(&action) => return Ok(action),
                    Ok(_) => {},
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Action observer lagged, {} actions skipped", skipped);
                    },
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(StoreError::ChannelClosed);
                    },
                }
            }
        })
        .await
        .map_err(|_| StoreError::Timeout)?
    }

    /// Subscribe to every action reduced by this store
    ///
    /// If the receiver lags, it skips old actions and receives
    /// [`broadcast::error::RecvError::Lagged`].
    #[must_use]
    pub fn subscribe_actions(&self) -> broadcast::Receiver<Action> {
        self.action_broadcast.subscribe()
    }

    /// Read current state via a closure
    ///
    /// ```ignore
    /// let loading = store.state(|s| get_query(s, "FETCH_BOOKS").loading).await;
    /// ```
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&S) -> T,
    {
        let state = self.state.read().await;
        f(&state)
    }

    /// Stop accepting actions and wait for pending calls to settle
    ///
    /// Calls still pending when `timeout` expires are cancelled; their
    /// requests then settle with abort actions.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if calls were still pending at
    /// the deadline.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        tracing::info!("Initiating graceful shutdown");
        self.shutdown.store(true, Ordering::Release);

        let start = std::time::Instant::now();
        let poll_interval = Duration::from_millis(10);

        loop {
            let pending = self.orchestrator.registry().pending_keys();

            if pending == 0 {
                tracing::info!("All calls settled, shutdown successful");
                return Ok(());
            }

            if start.elapsed() >= timeout {
                let cancelled = self.orchestrator.cancel(None);
                tracing::error!(pending_keys = pending, cancelled, "Shutdown timeout, cancelling pending calls");
                return Err(StoreError::ShutdownTimeout(pending));
            }

            tokio::time::sleep(poll_interval).await;
        }
    }
}

impl<S, R> Dispatcher for Store<S, R>
where
    R: Reducer<State = S, Action = Action> + Send + Sync,
    S: QueryLookup + Send + Sync,
{
    fn dispatch(&self, action: Action) -> BoxFuture<'_, ()> {
        async move {
            {
                let mut state = self.state.write().await;
                let span = tracing::debug_span!("reducer_execution", action_type = %action.action_type());
                let _enter = span.enter();
                self.reducer.reduce(&mut state, &action);
            }

            // No subscribers is fine
            let _ = self.action_broadcast.send(action);
        }
        .boxed()
    }

    fn query_data(&self, request_type: String) -> BoxFuture<'_, Option<Value>> {
        async move { self.state.read().await.query_data(&request_type) }.boxed()
    }
}
