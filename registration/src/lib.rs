//! Voice registration built on Switchboard.
//!
//! Signs a user in, fetches a calling access token and registers this client
//! endpoint with the calling service, tracking every step in an observable
//! store so a UI can render it.
//!
//! # Architecture
//!
//! 1. **Services** ([`services`]) are the external collaborators: login
//!    provider, token endpoint, native calling SDK
//! 2. **Operations** ([`operations`]) wrap collaborator calls in typed async
//!    operations with `pending`/`fulfilled`/`rejected` events
//! 3. **Reducers** ([`reducers`]) fold those events into the slices of
//!    [`AppState`]
//! 4. **`loginAndRegister`** composes login, getAccessToken and register and
//!    attributes a failure to the step that caused it
//!
//! # Example Usage
//!
//! ```no_run
//! use voice_registration::mocks::MockServices;
//! use voice_registration::{Operations, app_store};
//! use switchboard_runtime::StoreConfig;
//!
//! # async fn example() {
//! let store = app_store(StoreConfig::default());
//! let operations = Operations::new(&MockServices::succeeding().services());
//!
//! let settled = store.dispatch(&operations.login_and_register, ()).await;
//! assert!(settled.is_fulfilled());
//!
//! let registration = store.state(|s| s.voice.registration.clone()).await;
//! assert!(registration.is_registered());
//! # }
//! ```

pub mod actions;
pub mod config;
pub mod mocks;
pub mod operations;
pub mod reducers;
pub mod services;
pub mod state;

pub use actions::{AppAction, LoginAndRegisterRejection, RegisterRejection, UnregisterRejection};
pub use config::{DemoConfig, Scenario};
pub use operations::Operations;
pub use reducers::{AppReducer, app_reducer};
pub use services::Services;
pub use state::{AccessTokenState, AppState, RegistrationState, UserState, VoiceState};

use switchboard_runtime::{Store, StoreConfig};

/// The application store
pub type AppStore = Store<AppState, AppAction, (), AppReducer>;

/// Create an empty application store
#[must_use]
pub fn app_store(config: StoreConfig) -> AppStore {
    Store::with_config(AppState::default(), app_reducer(), (), config)
}
