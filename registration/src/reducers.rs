//! Slice reducers.
//!
//! Every reducer sees every action (see [`app_reducer`]) and reacts only to
//! the lifecycle events of the operations that drive its slice. Rejections are
//! matched exhaustively, so a new reason variant does not compile until each
//! reducer decides what to do with it.

use crate::actions::{AppAction, RegisterRejection, UnregisterRejection};
use crate::state::{AccessTokenState, AppState, RegistrationState, UserState};
use switchboard_core::composition::{CombinedReducer, combine_reducers, scope_reducer};
use switchboard_core::{
    AsyncStatus, Effect, Lifecycle, OperationStatusesReducer, Rejection, SmallVec, reducer::Reducer,
    smallvec,
};

/// The application reducer
pub type AppReducer = CombinedReducer<AppState, AppAction, ()>;

/// Combine every slice reducer into the application reducer
#[must_use]
pub fn app_reducer() -> AppReducer {
    combine_reducers(vec![
        Box::new(scope_reducer(UserReducer, |s: &mut AppState| &mut s.user)),
        Box::new(scope_reducer(AccessTokenReducer, |s: &mut AppState| {
            &mut s.voice.access_token
        })),
        Box::new(scope_reducer(RegistrationReducer, |s: &mut AppState| {
            &mut s.voice.registration
        })),
        Box::new(scope_reducer(
            OperationStatusesReducer::<AppAction, ()>::new(),
            |s: &mut AppState| &mut s.operations,
        )),
    ])
}

/// Owns [`UserState`]
#[derive(Clone, Copy, Debug, Default)]
pub struct UserReducer;

impl Reducer for UserReducer {
    type State = UserState;
    type Action = AppAction;
    type Environment = ();

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            AppAction::Login(action) => {
                state.status.apply(&action.event);
                if let Lifecycle::Fulfilled(()) = action.event {
                    state.signed_in = true;
                }
            },
            AppAction::Logout(action) => match action.event {
                Lifecycle::Fulfilled(()) => *state = UserState::default(),
                Lifecycle::Pending | Lifecycle::Rejected(_) => {},
            },
            AppAction::GetAccessToken(_)
            | AppAction::Register(_)
            | AppAction::Unregister(_)
            | AppAction::LoginAndRegister(_) => {},
        }
        smallvec![Effect::None]
    }
}

/// Owns [`AccessTokenState`]
#[derive(Clone, Copy, Debug, Default)]
pub struct AccessTokenReducer;

impl Reducer for AccessTokenReducer {
    type State = AccessTokenState;
    type Action = AppAction;
    type Environment = ();

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            AppAction::GetAccessToken(action) => {
                state.status.apply(&action.event);
                match action.event {
                    Lifecycle::Fulfilled(token) => state.value = Some(token),
                    Lifecycle::Rejected(_) => state.value = None,
                    Lifecycle::Pending => {},
                }
            },
            // A token belongs to the user it was issued for.
            AppAction::Logout(action) => match action.event {
                Lifecycle::Fulfilled(()) => *state = AccessTokenState::default(),
                Lifecycle::Pending | Lifecycle::Rejected(_) => {},
            },
            AppAction::Login(_)
            | AppAction::Register(_)
            | AppAction::Unregister(_)
            | AppAction::LoginAndRegister(_) => {},
        }
        smallvec![Effect::None]
    }
}

/// Owns [`RegistrationState`]
#[derive(Clone, Copy, Debug, Default)]
pub struct RegistrationReducer;

impl Reducer for RegistrationReducer {
    type State = RegistrationState;
    type Action = AppAction;
    type Environment = ();

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            AppAction::Register(action) => match action.event {
                Lifecycle::Rejected(rejection) => {
                    log_register_rejection(&rejection);
                    state.status = AsyncStatus::Rejected(rejection);
                },
                event @ (Lifecycle::Pending | Lifecycle::Fulfilled(())) => state.status.apply(&event),
            },
            AppAction::Unregister(action) => match action.event {
                Lifecycle::Pending => {
                    state.status = AsyncStatus::Pending;
                    state.last_unregister_failure = None;
                },
                Lifecycle::Fulfilled(()) => state.status = AsyncStatus::Idle,
                // Not recovered: the status stays pending until the next
                // register or unregister.
                Lifecycle::Rejected(rejection) => {
                    log_unregister_rejection(&rejection);
                    state.last_unregister_failure = Some(rejection);
                },
            },
            AppAction::Login(_)
            | AppAction::Logout(_)
            | AppAction::GetAccessToken(_)
            | AppAction::LoginAndRegister(_) => {},
        }
        smallvec![Effect::None]
    }
}

fn log_register_rejection(rejection: &Rejection<RegisterRejection>) {
    match rejection {
        Rejection::Reason(
            reason @ (RegisterRejection::AccessTokenNotFulfilled | RegisterRejection::NoAccessToken),
        ) => {
            tracing::debug!(reason = ?reason, "Register precondition failed");
        },
        Rejection::Reason(RegisterRejection::NativeModuleRejected { error }) => {
            tracing::warn!(code = ?error.code, message = %error.message, "Native register rejected");
        },
        Rejection::Error(error) => {
            tracing::warn!(name = %error.name, message = %error.message, "Register failed unexpectedly");
        },
    }
}

fn log_unregister_rejection(rejection: &Rejection<UnregisterRejection>) {
    match rejection {
        Rejection::Reason(
            reason @ (UnregisterRejection::AccessTokenNotFulfilled | UnregisterRejection::NoAccessToken),
        ) => {
            tracing::warn!(reason = ?reason, "Unregister precondition failed");
        },
        Rejection::Reason(UnregisterRejection::NativeModuleRejected { error }) => {
            tracing::warn!(code = ?error.code, message = %error.message, "Native unregister rejected");
        },
        Rejection::Error(error) => {
            tracing::warn!(name = %error.name, message = %error.message, "Unregister failed unexpectedly");
        },
    }
}
