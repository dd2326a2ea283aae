//! Typed async operations.
//!
//! An [`AsyncOperation`] pairs a stable name with a fallible asynchronous body.
//! Running it through [`Store::dispatch`](crate::Store::dispatch) or
//! [`OperationContext::dispatch`] surrounds the body with lifecycle events:
//!
//! 1. `<name>/pending`, applied before the body starts
//! 2. the body runs; explicit rejects, propagated errors and panics are all captured
//! 3. `<name>/fulfilled` or `<name>/rejected`, exactly one of them
//!
//! The settlement is returned to the caller as well, so a caller never has to
//! observe the event stream to learn the outcome.

use crate::{Admission, AtomicCounterGuard, StoreError};
use futures::FutureExt;
use futures::future::BoxFuture;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use switchboard_core::{
    Lifecycle, LifecycleAction, Meta, OperationAction, Phase, Rejection, RequestId,
    SerializedError, Settled,
};
use tokio::sync::RwLock;

/// Type-erased operation body
type Body<Arg, T, R, S, A> =
    Arc<dyn Fn(Arg, OperationContext<S, A>) -> BoxFuture<'static, Result<T, Rejection<R>>> + Send + Sync>;

/// Where lifecycle events go. Implemented by the store.
pub(crate) trait ActionSink<A>: Send + Sync {
    /// Apply and broadcast one action
    fn emit(&self, action: A, admission: Admission) -> BoxFuture<'_, Result<(), StoreError>>;

    /// Count an invocation as in-flight work until the guard drops
    fn in_flight(&self) -> AtomicCounterGuard;
}

/// A named asynchronous operation with derived lifecycle events.
///
/// # Type Parameters
///
/// - `Arg`: Invocation argument, recorded in every event's metadata
/// - `T`: Fulfilled value
/// - `R`: Explicit rejection reason
/// - `S`, `A`: State and action type of the store it runs against
///
/// Cloning is cheap; clones share the body.
///
/// # Example
///
/// ```ignore
/// let get_access_token = AsyncOperation::new(
///     "voice/getAccessToken",
///     AppAction::GetAccessToken,
///     move |(), _ctx| {
///         let tokens = Arc::clone(&tokens);
///         async move { Ok(tokens.fetch_access_token().await?) }
///     },
/// );
///
/// let settled = store.dispatch(&get_access_token, ()).await;
/// ```
pub struct AsyncOperation<Arg, T, R, S, A> {
    name: &'static str,
    wrap: fn(OperationAction<Arg, T, R>) -> A,
    body: Body<Arg, T, R, S, A>,
}

impl<Arg, T, R, S, A> AsyncOperation<Arg, T, R, S, A>
where
    Arg: Clone + Send + 'static,
    T: Clone + Send + 'static,
    R: Clone + Send + 'static,
    S: Send + Sync + 'static,
    A: Send + 'static,
{
    /// Create an operation.
    ///
    /// - `name`: unique per process; the event type prefix
    /// - `wrap`: lifts a lifecycle event into the application action type
    /// - `body`: the fallible work. Return `Err(Rejection::Reason(..))` to
    ///   reject explicitly; `?` on any `std::error::Error` rejects with a
    ///   serialized error.
    pub fn new<F, Fut>(name: &'static str, wrap: fn(OperationAction<Arg, T, R>) -> A, body: F) -> Self
    where
        F: Fn(Arg, OperationContext<S, A>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, Rejection<R>>> + Send + 'static,
    {
        Self {
            name,
            wrap,
            body: Arc::new(move |arg, ctx| body(arg, ctx).boxed()),
        }
    }

    /// Run one invocation: pending, body, terminal event, settlement.
    pub(crate) async fn run(&self, ctx: &OperationContext<S, A>, arg: Arg) -> Settled<T, Rejection<R>> {
        let meta = Meta {
            request_id: RequestId::new(),
            arg: arg.clone(),
        };

        let _in_flight = ctx.sink.in_flight();
        let pending = self.event(meta.clone(), Lifecycle::Pending);
        if let Err(error) = ctx.sink.emit(pending, ctx.admission).await {
            tracing::warn!(operation = self.name, error = %error, "Operation refused before start");
            return Settled::Rejected {
                reason: Rejection::from(error),
            };
        }
        tracing::debug!(operation = self.name, request_id = %meta.request_id, "pending");

        let body = Arc::clone(&self.body);
        let body_ctx = ctx.admitted();
        let result = AssertUnwindSafe(async move { body(arg, body_ctx).await })
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(Rejection::Error(SerializedError::from_panic(payload.as_ref()))));

        let terminal = match &result {
            Ok(value) => Lifecycle::Fulfilled(value.clone()),
            Err(rejection) => Lifecycle::Rejected(rejection.clone()),
        };
        let phase = terminal.phase();
        match phase {
            Phase::Rejected => {
                tracing::warn!(operation = self.name, request_id = %meta.request_id, "rejected");
            },
            Phase::Pending | Phase::Fulfilled => {
                tracing::debug!(operation = self.name, request_id = %meta.request_id, "{phase}");
            },
        }
        metrics::counter!("store.operations.settled", "phase" => phase.as_str()).increment(1);

        if let Err(error) = ctx.sink.emit(self.event(meta, terminal), Admission::InFlight).await {
            tracing::error!(operation = self.name, error = %error, "Terminal event was not applied");
        }

        result.into()
    }

    fn event(&self, meta: Meta<Arg>, event: Lifecycle<T, R>) -> A {
        (self.wrap)(OperationAction {
            operation: self.name,
            meta,
            event,
        })
    }
}

impl<Arg, T, R, S, A> AsyncOperation<Arg, T, R, S, A> {
    /// Operation name
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Event type of the pending event, e.g. `registration/register/pending`
    #[must_use]
    pub fn pending_type(&self) -> String {
        self.event_type(Phase::Pending)
    }

    /// Event type of the fulfilled event
    #[must_use]
    pub fn fulfilled_type(&self) -> String {
        self.event_type(Phase::Fulfilled)
    }

    /// Event type of the rejected event
    #[must_use]
    pub fn rejected_type(&self) -> String {
        self.event_type(Phase::Rejected)
    }

    fn event_type(&self, phase: Phase) -> String {
        format!("{}/{phase}", self.name)
    }

    /// Whether `action` is one of this operation's lifecycle events
    pub fn matches(&self, action: &A) -> bool
    where
        A: LifecycleAction,
    {
        action
            .lifecycle()
            .is_some_and(|record| record.operation == self.name)
    }
}

impl<Arg, T, R, S, A> Clone for AsyncOperation<Arg, T, R, S, A> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            wrap: self.wrap,
            body: Arc::clone(&self.body),
        }
    }
}

impl<Arg, T, R, S, A> std::fmt::Debug for AsyncOperation<Arg, T, R, S, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncOperation")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// What an operation body can see and do.
///
/// Bodies read state through snapshots and start nested operations with
/// [`OperationContext::dispatch`]; they never mutate state directly.
///
/// A context handed to a running body belongs to an invocation the store has
/// already admitted. Nested operations started through it keep running after
/// shutdown begins, so a workflow can finish its steps and compensations.
pub struct OperationContext<S, A> {
    state: Arc<RwLock<S>>,
    sink: Arc<dyn ActionSink<A>>,
    admission: Admission,
}

impl<S, A> OperationContext<S, A>
where
    S: Send + Sync + 'static,
    A: Send + 'static,
{
    pub(crate) fn new(state: Arc<RwLock<S>>, sink: Arc<dyn ActionSink<A>>) -> Self {
        Self {
            state,
            sink,
            admission: Admission::New,
        }
    }

    /// The context for the body of an admitted invocation
    fn admitted(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            sink: Arc::clone(&self.sink),
            admission: Admission::InFlight,
        }
    }

    /// Read state via a closure.
    ///
    /// Everything read inside one call comes from a single consistent snapshot.
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&S) -> T,
    {
        let state = self.state.read().await;
        f(&state)
    }

    /// Run a nested operation and return its settlement
    ///
    /// From inside a running body the nested operation is admitted even when
    /// shutdown has started.
    pub async fn dispatch<Arg, T, R>(
        &self,
        operation: &AsyncOperation<Arg, T, R, S, A>,
        arg: Arg,
    ) -> Settled<T, Rejection<R>>
    where
        Arg: Clone + Send + 'static,
        T: Clone + Send + 'static,
        R: Clone + Send + 'static,
    {
        operation.run(self, arg).await
    }
}

impl<S, A> Clone for OperationContext<S, A> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            sink: Arc::clone(&self.sink),
            admission: self.admission,
        }
    }
}
