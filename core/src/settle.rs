//! The settle primitive.
//!
//! [`settle`] awaits a fallible future and turns its outcome into a
//! [`Settled`] value, so a caller can inspect a failure without unwinding its
//! own control flow through `?`.

use serde::{Deserialize, Serialize};
use std::future::IntoFuture;

/// Non-throwing outcome of an asynchronous call.
///
/// Serializes as `{"status": "fulfilled", "value": ...}` or
/// `{"status": "rejected", "reason": ...}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Settled<T, E> {
    /// The call completed with a value
    Fulfilled {
        /// Completion value
        value: T,
    },
    /// The call failed
    Rejected {
        /// Failure reason
        reason: E,
    },
}

impl<T, E> Settled<T, E> {
    /// Whether the call completed
    #[must_use]
    pub const fn is_fulfilled(&self) -> bool {
        matches!(self, Self::Fulfilled { .. })
    }

    /// Whether the call failed
    #[must_use]
    pub const fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    /// The completion value, if any
    #[must_use]
    pub const fn value(&self) -> Option<&T> {
        match self {
            Self::Fulfilled { value } => Some(value),
            Self::Rejected { .. } => None,
        }
    }

    /// The failure reason, if any
    #[must_use]
    pub const fn reason(&self) -> Option<&E> {
        match self {
            Self::Fulfilled { .. } => None,
            Self::Rejected { reason } => Some(reason),
        }
    }

    /// Map the completion value
    pub fn map<U, F>(self, f: F) -> Settled<U, E>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Self::Fulfilled { value } => Settled::Fulfilled { value: f(value) },
            Self::Rejected { reason } => Settled::Rejected { reason },
        }
    }

    /// Map the failure reason
    pub fn map_reason<R, F>(self, f: F) -> Settled<T, R>
    where
        F: FnOnce(E) -> R,
    {
        match self {
            Self::Fulfilled { value } => Settled::Fulfilled { value },
            Self::Rejected { reason } => Settled::Rejected { reason: f(reason) },
        }
    }

    /// Convert back into a `Result`
    ///
    /// # Errors
    ///
    /// Returns the failure reason for a rejected settlement.
    pub fn into_result(self) -> Result<T, E> {
        match self {
            Self::Fulfilled { value } => Ok(value),
            Self::Rejected { reason } => Err(reason),
        }
    }
}

impl<T, E> From<Result<T, E>> for Settled<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Fulfilled { value },
            Err(reason) => Self::Rejected { reason },
        }
    }
}

impl<T, E> From<Settled<T, E>> for Result<T, E> {
    fn from(settled: Settled<T, E>) -> Self {
        settled.into_result()
    }
}

/// Await a fallible future and capture its outcome.
///
/// # Example
///
/// ```
/// use switchboard_core::{Settled, settle};
///
/// # tokio_test::block_on(async {
/// let outcome = settle(async { Err::<(), _>("native module unavailable") }).await;
/// assert_eq!(outcome, Settled::Rejected { reason: "native module unavailable" });
/// # });
/// ```
pub async fn settle<F, T, E>(future: F) -> Settled<T, E>
where
    F: IntoFuture<Output = Result<T, E>>,
{
    future.await.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn settle_captures_fulfilled_value() {
        let outcome: Settled<u8, String> = settle(async { Ok(7) }).await;
        assert!(outcome.is_fulfilled());
        assert_eq!(outcome.value(), Some(&7));
        assert_eq!(outcome.reason(), None);
    }

    #[tokio::test]
    async fn settle_captures_rejection_without_propagating() {
        let outcome = settle(async { "not-a-number".parse::<u32>() }).await;
        assert!(outcome.is_rejected());
        assert!(outcome.into_result().is_err());
    }

    #[test]
    fn map_and_map_reason_touch_only_their_side() {
        let fulfilled: Settled<u8, &str> = Settled::Fulfilled { value: 2 };
        assert_eq!(fulfilled.map(|v| v * 2), Settled::Fulfilled { value: 4 });

        let rejected: Settled<u8, &str> = Settled::Rejected { reason: "nope" };
        assert_eq!(
            rejected.map_reason(str::len),
            Settled::Rejected { reason: 4 }
        );
    }

    #[test]
    fn settled_serializes_with_status_tag() -> Result<(), serde_json::Error> {
        let fulfilled: Settled<&str, ()> = Settled::Fulfilled { value: "token" };
        assert_eq!(
            serde_json::to_value(fulfilled)?,
            serde_json::json!({ "status": "fulfilled", "value": "token" })
        );

        let rejected: Settled<(), &str> = Settled::Rejected { reason: "LOGIN_REJECTED" };
        assert_eq!(
            serde_json::to_value(rejected)?,
            serde_json::json!({ "status": "rejected", "reason": "LOGIN_REJECTED" })
        );
        Ok(())
    }
}
