//! Actions and rejection reasons of the registration domain.

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use switchboard_core::{LifecycleAction, LifecycleRecord, OperationAction, RejectReason, SerializedError};

/// Operation names, also the prefixes of their event types
pub mod names {
    /// Sign the user in
    pub const LOGIN: &str = "user/login";
    /// Sign the user out
    pub const LOGOUT: &str = "user/logout";
    /// Fetch a calling access token
    pub const GET_ACCESS_TOKEN: &str = "voice/getAccessToken";
    /// Register the client endpoint with the calling service
    pub const REGISTER: &str = "registration/register";
    /// Remove the client endpoint registration
    pub const UNREGISTER: &str = "registration/unregister";
    /// Login, fetch a token, then register
    pub const LOGIN_AND_REGISTER: &str = "registration/loginAndRegister";
}

/// Why `registration/register` rejected
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegisterRejection {
    /// The access token slice is not `fulfilled`
    AccessTokenNotFulfilled,
    /// The token endpoint issued an empty token
    NoAccessToken,
    /// The native SDK rejected the registration
    NativeModuleRejected {
        /// The SDK error
        error: SerializedError,
    },
}

impl RejectReason for RegisterRejection {
    fn tag(&self) -> &'static str {
        match self {
            Self::AccessTokenNotFulfilled => "ACCESS_TOKEN_NOT_FULFILLED",
            Self::NoAccessToken => "NO_ACCESS_TOKEN",
            Self::NativeModuleRejected { .. } => "NATIVE_MODULE_REJECTED",
        }
    }
}

/// Why `registration/unregister` rejected
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnregisterRejection {
    /// The access token slice is not `fulfilled`
    AccessTokenNotFulfilled,
    /// The token endpoint issued an empty token
    NoAccessToken,
    /// The native SDK rejected the request
    NativeModuleRejected {
        /// The SDK error
        error: SerializedError,
    },
}

impl RejectReason for UnregisterRejection {
    fn tag(&self) -> &'static str {
        match self {
            Self::AccessTokenNotFulfilled => "ACCESS_TOKEN_NOT_FULFILLED",
            Self::NoAccessToken => "NO_ACCESS_TOKEN",
            Self::NativeModuleRejected { .. } => "NATIVE_MODULE_REJECTED",
        }
    }
}

/// Which step of `registration/loginAndRegister` failed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoginAndRegisterRejection {
    /// `user/login` rejected
    LoginRejected,
    /// `voice/getAccessToken` rejected; the user was logged out again
    GetAccessTokenRejected,
    /// `registration/register` rejected
    RegisterRejected,
}

impl RejectReason for LoginAndRegisterRejection {
    fn tag(&self) -> &'static str {
        match self {
            Self::LoginRejected => "LOGIN_REJECTED",
            Self::GetAccessTokenRejected => "GET_ACCESS_TOKEN_REJECTED",
            Self::RegisterRejected => "REGISTER_REJECTED",
        }
    }
}

/// Every action the application store applies.
///
/// One variant per operation; each carries that operation's lifecycle events.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AppAction {
    /// `user/login`
    Login(OperationAction<(), (), Infallible>),
    /// `user/logout`
    Logout(OperationAction<(), (), Infallible>),
    /// `voice/getAccessToken`, fulfilled with the token
    GetAccessToken(OperationAction<(), String, Infallible>),
    /// `registration/register`
    Register(OperationAction<(), (), RegisterRejection>),
    /// `registration/unregister`
    Unregister(OperationAction<(), (), UnregisterRejection>),
    /// `registration/loginAndRegister`
    LoginAndRegister(OperationAction<(), (), LoginAndRegisterRejection>),
}

impl LifecycleAction for AppAction {
    fn lifecycle(&self) -> Option<LifecycleRecord> {
        match self {
            Self::Login(action) | Self::Logout(action) => action.lifecycle(),
            Self::GetAccessToken(action) => action.lifecycle(),
            Self::Register(action) => action.lifecycle(),
            Self::Unregister(action) => action.lifecycle(),
            Self::LoginAndRegister(action) => action.lifecycle(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasons_serialize_with_their_tag() -> Result<(), serde_json::Error> {
        let reasons = [
            serde_json::to_value(RegisterRejection::NoAccessToken)?,
            serde_json::to_value(UnregisterRejection::AccessTokenNotFulfilled)?,
            serde_json::to_value(LoginAndRegisterRejection::GetAccessTokenRejected)?,
        ];
        let tags = [
            RegisterRejection::NoAccessToken.tag(),
            UnregisterRejection::AccessTokenNotFulfilled.tag(),
            LoginAndRegisterRejection::GetAccessTokenRejected.tag(),
        ];

        for (json, tag) in reasons.iter().zip(tags) {
            assert_eq!(json["reason"], tag);
        }
        Ok(())
    }

    #[test]
    fn native_rejection_carries_the_error() -> Result<(), serde_json::Error> {
        let reason = RegisterRejection::NativeModuleRejected {
            error: SerializedError::new("VoiceError", "Registration failed").with_code("31301"),
        };

        let json = serde_json::to_value(&reason)?;

        assert_eq!(json["reason"], "NATIVE_MODULE_REJECTED");
        assert_eq!(json["error"]["code"], "31301");
        assert_eq!(serde_json::from_value::<RegisterRejection>(json)?, reason);
        Ok(())
    }
}
