//! The registration operations.
//!
//! | Operation | Rejection |
//! |-----------|-----------|
//! | `user/login` | collaborator errors only |
//! | `user/logout` | collaborator errors only |
//! | `voice/getAccessToken` | collaborator errors only |
//! | `registration/register` | [`RegisterRejection`] |
//! | `registration/unregister` | [`UnregisterRejection`] |
//! | `registration/loginAndRegister` | [`LoginAndRegisterRejection`] |
//!
//! `register` and `unregister` check the access token slice before calling
//! the SDK: it must be fulfilled and the token non-empty. Both checks read
//! one snapshot taken before any await on the SDK.
//!
//! Concurrent invocations of the same operation are not serialized. Each one
//! settles on its own request id, and the slice shows the last terminal event.

use crate::actions::{AppAction, LoginAndRegisterRejection, RegisterRejection, UnregisterRejection, names};
use crate::services::{AuthProvider, Services, TokenProvider, VoiceClient, VoiceError};
use crate::state::{AccessTokenState, AppState};
use std::convert::Infallible;
use std::sync::Arc;
use switchboard_core::{Rejection, SerializedError, Settled, settle};
use switchboard_runtime::{AsyncOperation, OperationContext, Workflow};

/// An operation over the application state and actions
pub type Op<Arg, T, R> = AsyncOperation<Arg, T, R, AppState, AppAction>;

type Context = OperationContext<AppState, AppAction>;

/// Every operation, built once against a set of collaborators.
#[derive(Clone, Debug)]
pub struct Operations {
    /// `user/login`
    pub login: Op<(), (), Infallible>,
    /// `user/logout`
    pub logout: Op<(), (), Infallible>,
    /// `voice/getAccessToken`
    pub get_access_token: Op<(), String, Infallible>,
    /// `registration/register`
    pub register: Op<(), (), RegisterRejection>,
    /// `registration/unregister`
    pub unregister: Op<(), (), UnregisterRejection>,
    /// `registration/loginAndRegister`
    pub login_and_register: Op<(), (), LoginAndRegisterRejection>,
}

impl Operations {
    /// Build every operation against `services`
    #[must_use]
    pub fn new(services: &Services) -> Self {
        let login = login(Arc::clone(&services.auth));
        let logout = logout(Arc::clone(&services.auth));
        let get_access_token = get_access_token(Arc::clone(&services.tokens));
        let register = register(Arc::clone(&services.voice));
        let unregister = unregister(Arc::clone(&services.voice));
        let login_and_register = login_and_register(&login, &get_access_token, &logout, &register);

        Self {
            login,
            logout,
            get_access_token,
            register,
            unregister,
            login_and_register,
        }
    }
}

/// `user/login`
#[must_use]
pub fn login(auth: Arc<dyn AuthProvider>) -> Op<(), (), Infallible> {
    AsyncOperation::new(names::LOGIN, AppAction::Login, move |(), _ctx| {
        run_login(Arc::clone(&auth))
    })
}

/// `user/logout`
#[must_use]
pub fn logout(auth: Arc<dyn AuthProvider>) -> Op<(), (), Infallible> {
    AsyncOperation::new(names::LOGOUT, AppAction::Logout, move |(), _ctx| {
        run_logout(Arc::clone(&auth))
    })
}

/// `voice/getAccessToken`, fulfilled with the token (possibly empty)
#[must_use]
pub fn get_access_token(tokens: Arc<dyn TokenProvider>) -> Op<(), String, Infallible> {
    AsyncOperation::new(names::GET_ACCESS_TOKEN, AppAction::GetAccessToken, move |(), _ctx| {
        run_get_access_token(Arc::clone(&tokens))
    })
}

/// `registration/register`
#[must_use]
pub fn register(voice: Arc<dyn VoiceClient>) -> Op<(), (), RegisterRejection> {
    AsyncOperation::new(names::REGISTER, AppAction::Register, move |(), ctx| {
        run_register(Arc::clone(&voice), ctx)
    })
}

/// `registration/unregister`
#[must_use]
pub fn unregister(voice: Arc<dyn VoiceClient>) -> Op<(), (), UnregisterRejection> {
    AsyncOperation::new(names::UNREGISTER, AppAction::Unregister, move |(), ctx| {
        run_unregister(Arc::clone(&voice), ctx)
    })
}

/// `registration/loginAndRegister`.
///
/// Runs login, then getAccessToken, then register. A failed token fetch logs
/// the user out again before the operation rejects.
#[must_use]
pub fn login_and_register(
    login: &Op<(), (), Infallible>,
    get_access_token: &Op<(), String, Infallible>,
    logout: &Op<(), (), Infallible>,
    register: &Op<(), (), RegisterRejection>,
) -> Op<(), (), LoginAndRegisterRejection> {
    let workflow = Arc::new(
        Workflow::new(names::LOGIN_AND_REGISTER)
            .step(login, (), LoginAndRegisterRejection::LoginRejected)
            .step(get_access_token, (), LoginAndRegisterRejection::GetAccessTokenRejected)
            .compensate_with(logout, ())
            .step(register, (), LoginAndRegisterRejection::RegisterRejected),
    );

    AsyncOperation::new(names::LOGIN_AND_REGISTER, AppAction::LoginAndRegister, move |(), ctx| {
        let workflow = Arc::clone(&workflow);
        async move { workflow.run(&ctx).await.map_err(Rejection::Reason) }
    })
}

async fn run_login(auth: Arc<dyn AuthProvider>) -> Result<(), Rejection<Infallible>> {
    auth.login().await?;
    Ok(())
}

async fn run_logout(auth: Arc<dyn AuthProvider>) -> Result<(), Rejection<Infallible>> {
    auth.logout().await?;
    Ok(())
}

async fn run_get_access_token(tokens: Arc<dyn TokenProvider>) -> Result<String, Rejection<Infallible>> {
    let token = tokens.fetch_access_token().await?;
    if token.is_empty() {
        tracing::debug!("Token endpoint issued an empty access token");
    }
    Ok(token)
}

async fn run_register(voice: Arc<dyn VoiceClient>, ctx: Context) -> Result<(), Rejection<RegisterRejection>> {
    let token = ctx
        .state(|s| usable_token(&s.voice.access_token))
        .await
        .map_err(|unusable| Rejection::Reason(unusable.into()))?;

    match settle(voice.register(&token)).await {
        Settled::Fulfilled { .. } => Ok(()),
        Settled::Rejected { reason } => Err(Rejection::Reason(RegisterRejection::NativeModuleRejected {
            error: native_error(&reason),
        })),
    }
}

async fn run_unregister(voice: Arc<dyn VoiceClient>, ctx: Context) -> Result<(), Rejection<UnregisterRejection>> {
    let token = ctx
        .state(|s| usable_token(&s.voice.access_token))
        .await
        .map_err(|unusable| Rejection::Reason(unusable.into()))?;

    match settle(voice.unregister(&token)).await {
        Settled::Fulfilled { .. } => Ok(()),
        Settled::Rejected { reason } => Err(Rejection::Reason(UnregisterRejection::NativeModuleRejected {
            error: native_error(&reason),
        })),
    }
}

/// Why the access token slice cannot be used for an SDK call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum UnusableToken {
    NotFulfilled,
    Empty,
}

impl From<UnusableToken> for RegisterRejection {
    fn from(unusable: UnusableToken) -> Self {
        match unusable {
            UnusableToken::NotFulfilled => Self::AccessTokenNotFulfilled,
            UnusableToken::Empty => Self::NoAccessToken,
        }
    }
}

impl From<UnusableToken> for UnregisterRejection {
    fn from(unusable: UnusableToken) -> Self {
        match unusable {
            UnusableToken::NotFulfilled => Self::AccessTokenNotFulfilled,
            UnusableToken::Empty => Self::NoAccessToken,
        }
    }
}

fn usable_token(access_token: &AccessTokenState) -> Result<String, UnusableToken> {
    if !access_token.status.is_fulfilled() {
        return Err(UnusableToken::NotFulfilled);
    }
    match access_token.value.as_deref() {
        Some(token) if !token.is_empty() => Ok(token.to_string()),
        Some(_) | None => Err(UnusableToken::Empty),
    }
}

fn native_error(error: &VoiceError) -> SerializedError {
    SerializedError::from_error(error).with_code(error.code.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchboard_core::AsyncStatus;

    #[test]
    fn token_must_be_fulfilled_before_it_is_checked_for_content() {
        let pending = AccessTokenState {
            status: AsyncStatus::Pending,
            value: Some(String::new()),
        };
        assert_eq!(usable_token(&pending), Err(UnusableToken::NotFulfilled));

        let empty = AccessTokenState {
            status: AsyncStatus::Fulfilled,
            value: Some(String::new()),
        };
        assert_eq!(usable_token(&empty), Err(UnusableToken::Empty));

        let issued = AccessTokenState {
            status: AsyncStatus::Fulfilled,
            value: Some("jwt".to_string()),
        };
        assert_eq!(usable_token(&issued), Ok("jwt".to_string()));
    }

    #[test]
    fn native_errors_keep_the_sdk_code() {
        let error = native_error(&VoiceError::new("31301", "Registration failed"));

        assert_eq!(error.name, "VoiceError");
        assert_eq!(error.message, "Registration failed");
        assert_eq!(error.code.as_deref(), Some("31301"));
    }
}
