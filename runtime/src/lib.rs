//! # Switchboard Runtime
//!
//! Runtime implementation for Switchboard.
//!
//! This crate provides the Store that coordinates reducer execution and effect
//! handling, the typed async operations that surround a fallible body with
//! lifecycle events, and the workflow composer that sequences operations.
//!
//! ## Core Components
//!
//! - **Store**: Owns application state, applies actions through the reducer and broadcasts them
//! - **`AsyncOperation`**: Named asynchronous operation with `pending`/`fulfilled`/`rejected` events
//! - **`OperationContext`**: What an operation body sees: state snapshots and nested dispatch
//! - **Workflow**: Ordered steps with first-failure attribution and compensation
//!
//! ## Example
//!
//! ```ignore
//! use switchboard_runtime::Store;
//!
//! let store = Store::new(AppState::default(), app_reducer(), ());
//! let operations = Operations::new(services);
//!
//! match store.dispatch(&operations.login_and_register, ()).await {
//!     Settled::Fulfilled { .. } => println!("registered"),
//!     Settled::Rejected { reason } => println!("failed: {reason:?}"),
//! }
//!
//! let registration = store.state(|s| s.voice.registration.clone()).await;
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use switchboard_core::{effect::Effect, reducer::Reducer};
use tokio::sync::RwLock;

/// Typed async operations and the context their bodies run in
pub mod operation;

/// Workflow composer: ordered steps, first-failure attribution, compensation
pub mod workflow;

pub use operation::{AsyncOperation, OperationContext};
pub use workflow::Workflow;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        ///
        /// Returned when `send()` is called after shutdown was initiated. An
        /// operation that is refused this way settles as rejected without
        /// running its body.
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for in-flight work
        ///
        /// Some effects or operations were still running when the timeout elapsed.
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),
    }
}

pub use error::StoreError;

/// Configuration for Store instances
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use switchboard_runtime::StoreConfig;
///
/// let config = StoreConfig::default()
///     .with_broadcast_capacity(256)
///     .with_shutdown_timeout(Duration::from_secs(5));
///
/// assert_eq!(config.broadcast_capacity, 256);
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Capacity of the action broadcast channel
    ///
    /// Observers that fall further behind than this lag and miss actions.
    pub broadcast_capacity: usize,
    /// Default timeout for graceful shutdown
    pub default_shutdown_timeout: Duration,
}

impl StoreConfig {
    /// Create a new configuration with custom values
    #[must_use]
    pub const fn new(broadcast_capacity: usize, default_shutdown_timeout: Duration) -> Self {
        Self {
            broadcast_capacity,
            default_shutdown_timeout,
        }
    }

    /// Set the action broadcast capacity
    #[must_use]
    pub const fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity;
        self
    }

    /// Set the default shutdown timeout
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.default_shutdown_timeout = timeout;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 64,
            default_shutdown_timeout: Duration::from_secs(30),
        }
    }
}

/// Guard that decrements an atomic counter on drop (shutdown tracking)
pub(crate) struct AtomicCounterGuard(Arc<AtomicUsize>);

impl AtomicCounterGuard {
    pub(crate) fn acquire(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for AtomicCounterGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Whether an action opens new work or finishes work the store already admitted
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Admission {
    /// Refused once shutdown has started
    New,
    /// Belongs to admitted work: terminal events, nested operations and
    /// effect feedback. Always applied.
    InFlight,
}

/// Store runtime for coordinating reducer execution and effect handling.
pub mod store {
    use super::{
        Admission, Arc, AtomicCounterGuard, AtomicUsize, Duration, Effect, Ordering, Reducer,
        RwLock, StoreConfig, StoreError,
    };
    use crate::operation::{ActionSink, AsyncOperation, OperationContext};
    use futures::future::BoxFuture;
    use std::sync::atomic::AtomicBool;
    use switchboard_core::{Rejection, Settled};
    use tokio::sync::{broadcast, watch};

    /// The Store - the process-wide dispatcher
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock`, mutated only by the reducer)
    /// 2. Reducer (the combined slice reducers)
    /// 3. Environment (injected dependencies for reducers)
    /// 4. Action broadcast to observers, in application order
    /// 5. Effect execution (with feedback loop)
    ///
    /// The store is created once and shared by cloning; clones share state,
    /// broadcast channel and shutdown flag.
    ///
    /// # Type Parameters
    ///
    /// - `S`: State type
    /// - `A`: Action type
    /// - `E`: Environment type
    /// - `R`: Reducer implementation
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: Arc<R>,
        environment: Arc<E>,
        config: StoreConfig,
        shutdown: Arc<AtomicBool>,
        pending_effects: Arc<AtomicUsize>,
        /// Every reduced action, sent while the state write lock is held.
        action_broadcast: broadcast::Sender<A>,
        /// Bumped after every reduction.
        revision: Arc<watch::Sender<u64>>,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Send + Sync + Clone + 'static,
        S: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        ///
        /// Uses [`StoreConfig::default()`].
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_config(initial_state, reducer, environment, StoreConfig::default())
        }

        /// Create a new store with custom configuration
        ///
        /// # Example
        ///
        /// ```ignore
        /// let config = StoreConfig::default().with_broadcast_capacity(1024);
        /// let store = Store::with_config(AppState::default(), app_reducer(), (), config);
        /// ```
        #[must_use]
        pub fn with_config(initial_state: S, reducer: R, environment: E, config: StoreConfig) -> Self {
            let (action_broadcast, _) = broadcast::channel(config.broadcast_capacity.max(1));
            let (revision, _) = watch::channel(0);

            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer: Arc::new(reducer),
                environment: Arc::new(environment),
                config,
                shutdown: Arc::new(AtomicBool::new(false)),
                pending_effects: Arc::new(AtomicUsize::new(0)),
                action_broadcast,
                revision: Arc::new(revision),
            }
        }

        /// The configuration this store was created with
        #[must_use]
        pub const fn config(&self) -> &StoreConfig {
            &self.config
        }

        /// Initiate graceful shutdown
        ///
        /// 1. Stops accepting new actions and new operation invocations
        /// 2. Waits for running effects and in-flight operations to finish
        ///
        /// Operations already past their `pending` event still deliver their
        /// terminal event, and the nested operations they start still run.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if the timeout expires before
        /// all in-flight work completes.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            tracing::info!("Initiating graceful shutdown");
            metrics::counter!("store.shutdown.initiated").increment(1);

            self.shutdown.store(true, Ordering::Release);

            let start = std::time::Instant::now();
            let poll_interval = Duration::from_millis(10);

            loop {
                let pending = self.pending_effects.load(Ordering::Acquire);

                if pending == 0 {
                    tracing::info!("All effects completed, shutdown successful");
                    metrics::counter!("store.shutdown.completed").increment(1);
                    return Ok(());
                }

                if start.elapsed() >= timeout {
                    tracing::error!(pending_effects = pending, "Shutdown timed out");
                    metrics::counter!("store.shutdown.timeout").increment(1);
                    return Err(StoreError::ShutdownTimeout(pending));
                }

                tracing::debug!(
                    pending_effects = pending,
                    elapsed_ms = start.elapsed().as_millis(),
                    "Waiting for effects to complete"
                );

                tokio::time::sleep(poll_interval).await;
            }
        }

        /// Whether shutdown has been initiated
        #[must_use]
        pub fn is_shutting_down(&self) -> bool {
            self.shutdown.load(Ordering::Acquire)
        }

        /// Send an action to the store
        ///
        /// 1. Acquires the write lock on state
        /// 2. Calls the reducer with (state, action, environment)
        /// 3. Broadcasts the action to observers while still holding the lock
        /// 4. Bumps the state revision
        /// 5. Starts the returned effects
        ///
        /// Concurrent `send()` calls serialize at the reducer, so observers see
        /// actions in exactly the order they were applied. Actions fed back by
        /// effects arrive later through the same path.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<(), StoreError> {
            self.send_internal(action, Admission::New).await
        }

        pub(crate) async fn send_internal(
            &self,
            action: A,
            admission: Admission,
        ) -> Result<(), StoreError> {
            if admission == Admission::New && self.shutdown.load(Ordering::Acquire) {
                tracing::warn!("Rejected action: store is shutting down");
                metrics::counter!("store.shutdown.rejected_actions").increment(1);
                return Err(StoreError::ShutdownInProgress);
            }

            metrics::counter!("store.actions.total").increment(1);

            let effects = {
                let mut state = self.state.write().await;

                let start = std::time::Instant::now();
                let effects = self
                    .reducer
                    .reduce(&mut state, action.clone(), &self.environment);
                metrics::histogram!("store.reducer.duration_seconds")
                    .record(start.elapsed().as_secs_f64());

                // No receivers is fine; observers are optional.
                let _ = self.action_broadcast.send(action);
                self.revision.send_modify(|revision| *revision += 1);

                effects
            };

            tracing::trace!("Reducer returned {} effects", effects.len());
            for effect in effects {
                self.execute_effect(effect);
            }

            Ok(())
        }

        /// Run an operation and return its settlement
        ///
        /// The operation's `pending` event is applied before its body starts and
        /// exactly one terminal event follows. The settlement is returned here
        /// and the events reach observers through [`Store::subscribe_actions`].
        #[tracing::instrument(skip(self, operation, arg), fields(operation = operation.name()))]
        pub async fn dispatch<Arg, T, Rej>(
            &self,
            operation: &AsyncOperation<Arg, T, Rej, S, A>,
            arg: Arg,
        ) -> Settled<T, Rejection<Rej>>
        where
            Arg: Clone + Send + 'static,
            T: Clone + Send + 'static,
            Rej: Clone + Send + 'static,
        {
            operation.run(&self.context(), arg).await
        }

        /// Context handed to operation bodies started from this store
        #[must_use]
        pub fn context(&self) -> OperationContext<S, A> {
            OperationContext::new(Arc::clone(&self.state), Arc::new(self.clone()))
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let token = store.state(|s| s.voice.access_token.value.clone()).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&state)
        }

        /// Clone of the full state
        pub async fn snapshot(&self) -> S
        where
            S: Clone,
        {
            self.state.read().await.clone()
        }

        /// Subscribe to every action the store applies
        ///
        /// Receivers see actions in application order, starting with the first
        /// action applied after subscribing. A receiver that falls more than
        /// [`StoreConfig::broadcast_capacity`] actions behind gets
        /// `RecvError::Lagged`.
        #[must_use]
        pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
            self.action_broadcast.subscribe()
        }

        /// Subscribe to state changes
        ///
        /// The value is a revision counter bumped after every reduction; read
        /// the state itself with [`Store::state`] once it changes.
        #[must_use]
        pub fn subscribe_state(&self) -> watch::Receiver<u64> {
            self.revision.subscribe()
        }

        /// Execute an effect
        ///
        /// A `Future` runs in its own task and counts as in-flight work until it
        /// finishes. The action it produces is applied and broadcast like any
        /// other action, also after shutdown started.
        fn execute_effect(&self, effect: Effect<A>) {
            match effect {
                Effect::None => {
                    metrics::counter!("store.effects.executed", "type" => "none").increment(1);
                },
                Effect::Future(fut) => {
                    metrics::counter!("store.effects.executed", "type" => "future").increment(1);

                    let pending_guard = AtomicCounterGuard::acquire(&self.pending_effects);
                    let store = self.clone();

                    tokio::spawn(async move {
                        let _pending_guard = pending_guard;

                        if let Some(action) = fut.await {
                            tracing::trace!("Effect::Future produced an action, sending to store");
                            if let Err(error) = store.send_internal(action, Admission::InFlight).await {
                                tracing::warn!(error = %error, "Dropped action produced by effect");
                            }
                        }
                    });
                },
            }
        }
    }

    impl<S, A, E, R> ActionSink<A> for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Send + Sync + Clone + 'static,
        S: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        fn emit(&self, action: A, admission: Admission) -> BoxFuture<'_, Result<(), StoreError>> {
            Box::pin(self.send_internal(action, admission))
        }

        fn in_flight(&self) -> AtomicCounterGuard {
            AtomicCounterGuard::acquire(&self.pending_effects)
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: Arc::clone(&self.reducer),
                environment: Arc::clone(&self.environment),
                config: self.config.clone(),
                shutdown: Arc::clone(&self.shutdown),
                pending_effects: Arc::clone(&self.pending_effects),
                action_broadcast: self.action_broadcast.clone(),
                revision: Arc::clone(&self.revision),
            }
        }
    }
}

pub use store::Store;

#[cfg(test)]
#[allow(clippy::panic)] // Test code can panic
mod tests {
    use super::*;
    use switchboard_core::{SmallVec, smallvec};

    #[derive(Debug, Clone, PartialEq)]
    enum CounterAction {
        Increment,
        IncrementLater,
    }

    #[derive(Debug, Clone, Default)]
    struct CounterState {
        count: u32,
    }

    struct CounterReducer;

    impl Reducer for CounterReducer {
        type State = CounterState;
        type Action = CounterAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                CounterAction::Increment => {
                    state.count += 1;
                    smallvec![Effect::None]
                },
                CounterAction::IncrementLater => smallvec![Effect::future(async {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    Some(CounterAction::Increment)
                })],
            }
        }
    }

    fn store() -> Store<CounterState, CounterAction, (), CounterReducer> {
        Store::new(CounterState::default(), CounterReducer, ())
    }

    #[tokio::test]
    async fn send_applies_reducer_and_bumps_revision() {
        let store = store();
        let revisions = store.subscribe_state();

        let _ = store.send(CounterAction::Increment).await;

        assert_eq!(store.state(|s| s.count).await, 1);
        assert_eq!(*revisions.borrow(), 1);
    }

    #[tokio::test]
    async fn future_effect_feeds_action_back() {
        let store = store();
        let mut actions = store.subscribe_actions();

        if store.send(CounterAction::IncrementLater).await.is_err() {
            panic!("store refused action");
        }

        assert_eq!(actions.recv().await.ok(), Some(CounterAction::IncrementLater));
        let fed_back = tokio::time::timeout(Duration::from_secs(1), actions.recv()).await;
        assert!(matches!(fed_back, Ok(Ok(CounterAction::Increment))));
        assert_eq!(store.snapshot().await.count, 1);
    }

    #[tokio::test]
    async fn shutdown_refuses_new_actions() {
        let store = store();

        assert!(store.shutdown(Duration::from_secs(1)).await.is_ok());
        assert!(store.is_shutting_down());
        assert!(matches!(
            store.send(CounterAction::Increment).await,
            Err(StoreError::ShutdownInProgress)
        ));
    }
}
