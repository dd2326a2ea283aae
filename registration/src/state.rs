//! Application state.
//!
//! Each slice is owned by one reducer in [`crate::reducers`]. Nothing else
//! mutates it; operations only read snapshots through their context.

use crate::actions::{RegisterRejection, UnregisterRejection};
use serde::{Serialize, Serializer};
use std::convert::Infallible;
use switchboard_core::{AsyncStatus, OperationStatuses, Rejection};

/// Root state of the application store
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    /// Signed-in user
    pub user: UserState,
    /// Access token and registration
    pub voice: VoiceState,
    /// Latest phase of every dispatched operation, by name
    pub operations: OperationStatuses,
}

/// Login status
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserState {
    /// Status of the latest `user/login`
    #[serde(serialize_with = "status_label")]
    pub status: AsyncStatus<Infallible>,
    /// Whether a login has completed and no logout followed
    pub signed_in: bool,
}

/// The voice slices exposed to the UI
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceState {
    /// Latest access token
    pub access_token: AccessTokenState,
    /// Registration with the calling service
    pub registration: RegistrationState,
}

/// Access token record.
///
/// `value` is only meaningful while `status` is fulfilled. `Some("")` means
/// the endpoint issued no token; `None` means none was fetched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenState {
    /// Status of the latest `voice/getAccessToken`
    #[serde(serialize_with = "status_label")]
    pub status: AsyncStatus<Infallible>,
    /// Token issued by the latest successful fetch
    pub value: Option<String>,
}

impl AccessTokenState {
    /// The token, if the latest fetch succeeded
    #[must_use]
    pub fn fulfilled_value(&self) -> Option<&str> {
        if self.status.is_fulfilled() {
            self.value.as_deref()
        } else {
            None
        }
    }
}

/// Registration with the calling service
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationState {
    /// Driven by `registration/register`; `registration/unregister` moves it
    /// to pending and, once it succeeds, back to idle
    #[serde(flatten)]
    pub status: AsyncStatus<RegisterRejection>,
    /// Rejection of the latest failed `registration/unregister`, cleared by
    /// the next unregister attempt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_unregister_failure: Option<Rejection<UnregisterRejection>>,
}

impl RegistrationState {
    /// Whether the endpoint is currently registered
    #[must_use]
    pub const fn is_registered(&self) -> bool {
        self.status.is_fulfilled()
    }
}

fn status_label<R, S>(status: &AsyncStatus<R>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(status.label())
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchboard_core::SerializedError;

    #[test]
    fn fulfilled_value_requires_fulfilled_status() {
        let mut token = AccessTokenState {
            status: AsyncStatus::Pending,
            value: Some("stale".to_string()),
        };
        assert_eq!(token.fulfilled_value(), None);

        token.status = AsyncStatus::Fulfilled;
        assert_eq!(token.fulfilled_value(), Some("stale"));
    }

    #[test]
    fn voice_state_serializes_for_the_ui() -> Result<(), serde_json::Error> {
        let voice = VoiceState {
            access_token: AccessTokenState {
                status: AsyncStatus::Fulfilled,
                value: Some(String::new()),
            },
            registration: RegistrationState {
                status: AsyncStatus::Rejected(Rejection::Reason(RegisterRejection::NativeModuleRejected {
                    error: SerializedError::new("VoiceError", "Registration failed"),
                })),
                last_unregister_failure: None,
            },
        };

        let json = serde_json::to_value(&voice)?;

        assert_eq!(json["accessToken"]["status"], "fulfilled");
        assert_eq!(json["accessToken"]["value"], "");
        assert_eq!(json["registration"]["status"], "rejected");
        assert_eq!(
            json["registration"]["rejection"]["reason"],
            "NATIVE_MODULE_REJECTED"
        );
        assert_eq!(
            json["registration"]["rejection"]["error"]["message"],
            "Registration failed"
        );
        assert!(json["registration"].get("lastUnregisterFailure").is_none());
        Ok(())
    }
}
