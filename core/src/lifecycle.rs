//! Operation lifecycle model.
//!
//! Every asynchronous operation produces exactly three kinds of lifecycle
//! events: `pending` when it starts, then exactly one of `fulfilled` or
//! `rejected`. This module defines those events ([`OperationAction`]), the
//! rejection payload they carry ([`Rejection`]), and two status slices built
//! from them:
//!
//! - [`AsyncStatus`]: a typed status for one operation, embedded in domain slices
//! - [`OperationStatuses`]: a name-keyed view of the latest phase of every operation
//!
//! ```text
//!            dispatch
//!               │
//!               ▼
//!   ┌───────────────────────┐
//!   │ <name>/pending        │  Meta { request_id, arg }
//!   └───────────┬───────────┘
//!               │ body runs
//!        ┌──────┴───────┐
//!        ▼              ▼
//!   <name>/fulfilled  <name>/rejected
//!     (value)         (Rejection::Reason | Rejection::Error)
//! ```

use crate::effect::Effect;
use crate::error::SerializedError;
use crate::reducer::Reducer;
use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt;
use uuid::Uuid;

/// Identifier shared by the three lifecycle events of one invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generate a fresh random request id
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The three lifecycle phases.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// The operation has started
    Pending,
    /// The operation completed with a value
    Fulfilled,
    /// The operation failed
    Rejected,
}

impl Phase {
    /// Event-name suffix for this phase
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fulfilled => "fulfilled",
            Self::Rejected => "rejected",
        }
    }

    /// Whether this phase ends an invocation
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Fulfilled | Self::Rejected)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata recorded on every lifecycle event of one invocation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta<Arg> {
    /// Request id shared by pending and the terminal event
    pub request_id: RequestId,
    /// The argument the operation was invoked with
    pub arg: Arg,
}

/// A tagged rejection reason.
///
/// Implemented by every per-operation reason enum. The tag is the stable,
/// UI-facing discriminant (`"NO_ACCESS_TOKEN"`, `"LOGIN_REJECTED"`, ...).
pub trait RejectReason {
    /// Stable tag of this reason
    fn tag(&self) -> &'static str;
}

/// Operations that never reject with an explicit reason use `Infallible`.
impl RejectReason for Infallible {
    fn tag(&self) -> &'static str {
        match *self {}
    }
}

/// Payload of a `rejected` event.
///
/// `Reason` is an explicit reject chosen by the operation body. `Error` is the
/// case without a reason: an unexpected failure, serialized generically.
///
/// Any `std::error::Error` converts into `Rejection::Error`, so operation
/// bodies can use `?` on collaborator results they do not want to re-tag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Rejection<R> {
    /// Explicit, tagged reason
    Reason(R),
    /// Unexpected failure
    Error(SerializedError),
}

impl<R> Rejection<R> {
    /// The explicit reason, if any
    #[must_use]
    pub const fn reason(&self) -> Option<&R> {
        match self {
            Self::Reason(reason) => Some(reason),
            Self::Error(_) => None,
        }
    }

    /// The serialized error, if this rejection carries no reason
    #[must_use]
    pub const fn error(&self) -> Option<&SerializedError> {
        match self {
            Self::Reason(_) => None,
            Self::Error(error) => Some(error),
        }
    }

    /// Tag of the explicit reason, `None` for unexpected failures
    #[must_use]
    pub fn tag(&self) -> Option<&'static str>
    where
        R: RejectReason,
    {
        self.reason().map(RejectReason::tag)
    }
}

impl<R, E> From<E> for Rejection<R>
where
    E: std::error::Error + 'static,
{
    fn from(error: E) -> Self {
        Self::Error(SerializedError::from_error(&error))
    }
}

impl<R: fmt::Display> fmt::Display for Rejection<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reason(reason) => reason.fmt(f),
            Self::Error(error) => error.fmt(f),
        }
    }
}

/// The phase-specific part of a lifecycle event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Lifecycle<T, R> {
    /// The operation has started
    Pending,
    /// The operation completed with a value
    Fulfilled(T),
    /// The operation failed
    Rejected(Rejection<R>),
}

impl<T, R> Lifecycle<T, R> {
    /// Phase of this event
    #[must_use]
    pub const fn phase(&self) -> Phase {
        match self {
            Self::Pending => Phase::Pending,
            Self::Fulfilled(_) => Phase::Fulfilled,
            Self::Rejected(_) => Phase::Rejected,
        }
    }
}

/// One lifecycle event of a named operation.
///
/// Applications embed these in their action enum, one variant per operation:
///
/// ```ignore
/// enum AppAction {
///     Register(OperationAction<(), (), RegisterRejection>),
///     GetAccessToken(OperationAction<(), String, Infallible>),
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperationAction<Arg, T, R> {
    /// Unique operation name, the event type prefix
    pub operation: &'static str,
    /// Invocation metadata
    pub meta: Meta<Arg>,
    /// Phase and payload
    pub event: Lifecycle<T, R>,
}

impl<Arg, T, R> OperationAction<Arg, T, R> {
    /// Phase of this event
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.event.phase()
    }

    /// Full event type, e.g. `registration/register/pending`
    #[must_use]
    pub fn action_type(&self) -> String {
        format!("{}/{}", self.operation, self.phase())
    }

    /// Condensed, type-erased view of this event
    #[must_use]
    pub fn record(&self) -> LifecycleRecord
    where
        R: RejectReason,
    {
        LifecycleRecord {
            operation: self.operation,
            request_id: self.meta.request_id,
            phase: self.phase(),
            reason: match &self.event {
                Lifecycle::Rejected(rejection) => rejection.tag(),
                Lifecycle::Pending | Lifecycle::Fulfilled(_) => None,
            },
        }
    }
}

/// Type-erased summary of a lifecycle event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleRecord {
    /// Operation name
    pub operation: &'static str,
    /// Invocation id
    pub request_id: RequestId,
    /// Phase of the event
    pub phase: Phase,
    /// Reason tag for explicit rejections
    pub reason: Option<&'static str>,
}

impl LifecycleRecord {
    /// Full event type, e.g. `registration/register/rejected`
    #[must_use]
    pub fn action_type(&self) -> String {
        format!("{}/{}", self.operation, self.phase)
    }
}

/// Actions that may carry an operation lifecycle event.
///
/// Implemented by application action enums so generic slices such as
/// [`OperationStatuses`] can observe every operation.
pub trait LifecycleAction {
    /// Lifecycle summary, `None` for actions that are not lifecycle events
    fn lifecycle(&self) -> Option<LifecycleRecord>;
}

impl<Arg, T, R: RejectReason> LifecycleAction for OperationAction<Arg, T, R> {
    fn lifecycle(&self) -> Option<LifecycleRecord> {
        Some(self.record())
    }
}

/// Typed status of one operation inside a domain slice.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "rejection", rename_all = "lowercase")]
pub enum AsyncStatus<R> {
    /// Never invoked, or reset
    Idle,
    /// An invocation is in flight
    Pending,
    /// The latest invocation completed
    Fulfilled,
    /// The latest invocation failed
    Rejected(Rejection<R>),
}

impl<R> Default for AsyncStatus<R> {
    fn default() -> Self {
        Self::Idle
    }
}

impl<R> AsyncStatus<R> {
    /// Apply one lifecycle event.
    ///
    /// `pending` clears any earlier rejection, `rejected` stores the payload
    /// verbatim.
    pub fn apply<T>(&mut self, event: &Lifecycle<T, R>)
    where
        R: Clone,
    {
        *self = match event {
            Lifecycle::Pending => Self::Pending,
            Lifecycle::Fulfilled(_) => Self::Fulfilled,
            Lifecycle::Rejected(rejection) => Self::Rejected(rejection.clone()),
        };
    }

    /// Whether no invocation has happened yet
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Whether an invocation is in flight
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Whether the latest invocation completed
    #[must_use]
    pub const fn is_fulfilled(&self) -> bool {
        matches!(self, Self::Fulfilled)
    }

    /// Whether the latest invocation failed
    #[must_use]
    pub const fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    /// Lowercase status name: `idle`, `pending`, `fulfilled` or `rejected`
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Pending => "pending",
            Self::Fulfilled => "fulfilled",
            Self::Rejected(_) => "rejected",
        }
    }

    /// Rejection of the latest invocation, if it failed
    #[must_use]
    pub const fn rejection(&self) -> Option<&Rejection<R>> {
        match self {
            Self::Rejected(rejection) => Some(rejection),
            Self::Idle | Self::Pending | Self::Fulfilled => None,
        }
    }
}

/// Latest lifecycle state of one named operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationStatus {
    /// Id of the latest invocation
    pub request_id: RequestId,
    /// Phase reached by the latest invocation
    pub phase: Phase,
    /// Reason tag when the latest invocation was explicitly rejected
    pub reason: Option<&'static str>,
}

/// Name-keyed status of every operation that has been dispatched.
///
/// Operations that were never dispatched are absent, which reads as idle.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct OperationStatuses {
    by_name: BTreeMap<&'static str, OperationStatus>,
}

impl OperationStatuses {
    /// Create an empty status table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a lifecycle event; a new `pending` overwrites any terminal state
    pub fn apply(&mut self, record: LifecycleRecord) {
        self.by_name.insert(
            record.operation,
            OperationStatus {
                request_id: record.request_id,
                phase: record.phase,
                reason: record.reason,
            },
        );
    }

    /// Status of one operation, `None` while idle
    #[must_use]
    pub fn get(&self, operation: &str) -> Option<&OperationStatus> {
        self.by_name.get(operation)
    }

    /// Latest phase of one operation, `None` while idle
    #[must_use]
    pub fn phase(&self, operation: &str) -> Option<Phase> {
        self.get(operation).map(|status| status.phase)
    }

    /// Iterate over all known operations in name order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &OperationStatus)> {
        self.by_name.iter().map(|(name, status)| (*name, status))
    }
}

/// Generic reducer that maintains an [`OperationStatuses`] table from any
/// lifecycle-carrying action type.
pub struct OperationStatusesReducer<A, E> {
    _phantom: std::marker::PhantomData<fn(A, &E)>,
}

impl<A, E> OperationStatusesReducer<A, E> {
    /// Create the reducer
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<A, E> Default for OperationStatusesReducer<A, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A, E> Reducer for OperationStatusesReducer<A, E>
where
    A: LifecycleAction,
{
    type State = OperationStatuses;
    type Action = A;
    type Environment = E;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        if let Some(record) = action.lifecycle() {
            state.apply(record);
        }
        smallvec![Effect::None]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq)]
    enum TokenRejection {
        Expired,
    }

    impl RejectReason for TokenRejection {
        fn tag(&self) -> &'static str {
            match self {
                Self::Expired => "EXPIRED",
            }
        }
    }

    fn action(event: Lifecycle<u32, TokenRejection>) -> OperationAction<(), u32, TokenRejection> {
        OperationAction {
            operation: "token/refresh",
            meta: Meta {
                request_id: RequestId::new(),
                arg: (),
            },
            event,
        }
    }

    #[test]
    fn action_type_joins_name_and_phase() {
        assert_eq!(action(Lifecycle::Pending).action_type(), "token/refresh/pending");
        assert_eq!(
            action(Lifecycle::Fulfilled(1)).action_type(),
            "token/refresh/fulfilled"
        );
        assert_eq!(
            action(Lifecycle::Rejected(Rejection::Reason(TokenRejection::Expired))).action_type(),
            "token/refresh/rejected"
        );
    }

    #[test]
    fn record_carries_reason_tag_only_for_explicit_rejections() {
        let explicit = action(Lifecycle::Rejected(Rejection::Reason(TokenRejection::Expired)));
        assert_eq!(explicit.record().reason, Some("EXPIRED"));

        let unexpected = action(Lifecycle::Rejected(Rejection::Error(SerializedError::new(
            "Panic", "boom",
        ))));
        assert_eq!(unexpected.record().reason, None);
        assert_eq!(unexpected.record().phase, Phase::Rejected);
    }

    #[test]
    fn std_errors_convert_into_error_rejections() {
        let io = std::io::Error::other("disk full");
        let rejection: Rejection<TokenRejection> = io.into();
        assert_eq!(rejection.tag(), None);
        assert_eq!(rejection.error().map(|e| e.message.as_str()), Some("disk full"));
    }

    #[test]
    fn async_status_pending_clears_prior_rejection() {
        let mut status: AsyncStatus<TokenRejection> = AsyncStatus::default();
        assert!(status.is_idle());

        status.apply(&Lifecycle::<(), TokenRejection>::Rejected(Rejection::Reason(TokenRejection::Expired)));
        assert!(status.is_rejected());

        status.apply(&Lifecycle::<(), TokenRejection>::Pending);
        assert!(status.is_pending());
        assert_eq!(status.rejection(), None);

        status.apply(&Lifecycle::<(), TokenRejection>::Fulfilled(()));
        assert!(status.is_fulfilled());
    }

    #[test]
    fn operation_statuses_track_latest_invocation_per_name() {
        let reducer = OperationStatusesReducer::<OperationAction<(), u32, TokenRejection>, ()>::new();
        let mut statuses = OperationStatuses::new();
        assert_eq!(statuses.phase("token/refresh"), None);

        let first = action(Lifecycle::Pending);
        let first_id = first.meta.request_id;
        let _ = reducer.reduce(&mut statuses, first, &());
        assert_eq!(statuses.phase("token/refresh"), Some(Phase::Pending));

        let second = action(Lifecycle::Rejected(Rejection::Reason(TokenRejection::Expired)));
        let _ = reducer.reduce(&mut statuses, second, &());

        let status = statuses.get("token/refresh").copied();
        assert_eq!(status.map(|s| s.phase), Some(Phase::Rejected));
        assert_eq!(status.and_then(|s| s.reason), Some("EXPIRED"));
        assert_ne!(status.map(|s| s.request_id), Some(first_id));
        assert_eq!(statuses.iter().count(), 1);
    }

    fn event_strategy() -> impl proptest::strategy::Strategy<Value = Lifecycle<u32, TokenRejection>> {
        use proptest::prelude::*;
        prop_oneof![
            Just(Lifecycle::Pending),
            any::<u32>().prop_map(Lifecycle::Fulfilled),
            Just(Lifecycle::Rejected(Rejection::Reason(TokenRejection::Expired))),
        ]
    }

    proptest::proptest! {
        /// Whatever came before, the status reflects only the latest event
        #[test]
        fn async_status_reflects_latest_event(events in proptest::collection::vec(event_strategy(), 1..16)) {
            let mut status: AsyncStatus<TokenRejection> = AsyncStatus::default();
            for event in &events {
                status.apply(event);
            }
            let last = events.last().map(Lifecycle::phase);
            proptest::prop_assert_eq!(Some(status.label()), last.map(Phase::as_str));
            proptest::prop_assert_eq!(status.is_rejected(), last == Some(Phase::Rejected));
        }
    }
}
