//! # Switchboard Core
//!
//! Core traits and types for the Switchboard workflow engine.
//!
//! This crate provides the pure building blocks: reducers that own slices of
//! state, effect descriptions, the settle primitive, and the lifecycle model
//! shared by every asynchronous operation.
//!
//! ## Core Concepts
//!
//! - **State**: Application state, split into slices
//! - **Action**: Everything a reducer can observe, including operation lifecycle events
//! - **Reducer**: Pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: Side effect descriptions (not execution)
//! - **Settlement**: Non-throwing outcome of an asynchronous call
//! - **Lifecycle**: `pending` → `fulfilled | rejected`, emitted around every operation
//!
//! ## Example
//!
//! ```ignore
//! use switchboard_core::*;
//!
//! #[derive(Clone, Debug, Default)]
//! struct RegistrationState {
//!     status: AsyncStatus<RegisterRejection>,
//! }
//!
//! impl Reducer for RegistrationReducer {
//!     type State = RegistrationState;
//!     type Action = AppAction;
//!     type Environment = ();
//!
//!     fn reduce(
//!         &self,
//!         state: &mut RegistrationState,
//!         action: AppAction,
//!         _env: &(),
//!     ) -> SmallVec<[Effect<AppAction>; 4]> {
//!         if let AppAction::Register(action) = action {
//!             state.status.apply(&action.event);
//!         }
//!         smallvec![Effect::None]
//!     }
//! }
//! ```

// Re-export commonly used types
pub use serde::{Deserialize, Serialize};
pub use smallvec::{SmallVec, smallvec};

/// Reducer composition (combining and scoping slice reducers)
pub mod composition;

/// Serialized error payloads for unexpected failures
pub mod error;

/// Operation lifecycle: phases, metadata, rejections and status slices
pub mod lifecycle;

/// The settle primitive
pub mod settle;

pub use error::SerializedError;
pub use lifecycle::{
    AsyncStatus, Lifecycle, LifecycleAction, LifecycleRecord, Meta, OperationAction,
    OperationStatus, OperationStatuses, OperationStatusesReducer, Phase, RejectReason, Rejection,
    RequestId,
};
pub use settle::{Settled, settle};

/// Reducer module - The core trait for state transitions
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`.
/// Each slice of application state is owned by exactly one reducer.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for state transitions
    ///
    /// # Type Parameters
    ///
    /// - `State`: The slice of state this reducer owns
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    ///
    /// # Example
    ///
    /// ```ignore
    /// impl Reducer for AccessTokenReducer {
    ///     type State = AccessTokenState;
    ///     type Action = AppAction;
    ///     type Environment = ();
    ///
    ///     fn reduce(
    ///         &self,
    ///         state: &mut AccessTokenState,
    ///         action: AppAction,
    ///         _env: &(),
    ///     ) -> SmallVec<[Effect<AppAction>; 4]> {
    ///         match action {
    ///             AppAction::GetAccessToken(action) => { /* ... */ }
    ///             _ => {}
    ///         }
    ///         smallvec![Effect::None]
    ///     }
    /// }
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// This is a pure function that:
        /// 1. Inspects the action
        /// 2. Updates state in place
        /// 3. Returns effect descriptions to be executed by the store
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe side effects to be performed by the store runtime.
/// They are values, not execution.
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are returned from reducers
    /// and executed by the Store runtime.
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Wrap an async computation that may feed an action back
        pub fn future<F>(future: F) -> Self
        where
            F: Future<Output = Option<Action>> + Send + 'static,
        {
            Effect::Future(Box::pin(future))
        }

        /// Whether this effect does nothing when executed
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Effect::None)
        }
    }
}

pub use effect::Effect;
pub use reducer::Reducer;
