//! Reducer composition utilities
//!
//! Application state is split into slices, each owned by exactly one reducer.
//! This module assembles those slice reducers into the single reducer a store
//! runs:
//! - **`scope_reducer`**: Run a slice reducer against one field of the parent state
//! - **`combine_reducers`**: Run several reducers on the same state and action
//!
//! # Example
//!
//! ```
//! use switchboard_core::composition::{combine_reducers, scope_reducer};
//! use switchboard_core::{Effect, Reducer, SmallVec, smallvec};
//!
//! #[derive(Clone, Debug)]
//! enum AppAction {
//!     SignedIn,
//!     TokenIssued(String),
//! }
//!
//! #[derive(Default)]
//! struct AppState {
//!     signed_in: bool,
//!     token: Option<String>,
//! }
//!
//! struct SessionReducer;
//! struct TokenReducer;
//!
//! impl Reducer for SessionReducer {
//!     type State = bool;
//!     type Action = AppAction;
//!     type Environment = ();
//!
//!     fn reduce(&self, state: &mut bool, action: AppAction, _env: &()) -> SmallVec<[Effect<AppAction>; 4]> {
//!         if matches!(action, AppAction::SignedIn) {
//!             *state = true;
//!         }
//!         smallvec![Effect::None]
//!     }
//! }
//!
//! impl Reducer for TokenReducer {
//!     type State = Option<String>;
//!     type Action = AppAction;
//!     type Environment = ();
//!
//!     fn reduce(&self, state: &mut Option<String>, action: AppAction, _env: &()) -> SmallVec<[Effect<AppAction>; 4]> {
//!         if let AppAction::TokenIssued(token) = action {
//!             *state = Some(token);
//!         }
//!         smallvec![Effect::None]
//!     }
//! }
//!
//! let app = combine_reducers(vec![
//!     Box::new(scope_reducer(SessionReducer, |s: &mut AppState| &mut s.signed_in)),
//!     Box::new(scope_reducer(TokenReducer, |s: &mut AppState| &mut s.token)),
//! ]);
//!
//! let mut state = AppState::default();
//! let _ = app.reduce(&mut state, AppAction::SignedIn, &());
//! let _ = app.reduce(&mut state, AppAction::TokenIssued("abc".into()), &());
//! assert!(state.signed_in);
//! assert_eq!(state.token.as_deref(), Some("abc"));
//! ```

use crate::effect::Effect;
use crate::reducer::Reducer;
use smallvec::SmallVec;

/// Boxed reducer over a shared state, action and environment
pub type BoxedReducer<S, A, E> = Box<dyn Reducer<State = S, Action = A, Environment = E> + Send + Sync>;

/// Combines multiple reducers that operate on the same state and action types.
///
/// Each reducer is run in order with a clone of the action, and all effects are
/// concatenated. Every slice reducer therefore observes every action, which is
/// how one operation's events can update several slices.
#[must_use]
pub fn combine_reducers<S, A, E>(reducers: Vec<BoxedReducer<S, A, E>>) -> CombinedReducer<S, A, E>
where
    A: Clone,
{
    CombinedReducer { reducers }
}

/// A combined reducer that runs multiple reducers in sequence.
///
/// Created by [`combine_reducers`].
pub struct CombinedReducer<S, A, E> {
    reducers: Vec<BoxedReducer<S, A, E>>,
}

impl<S, A, E> Reducer for CombinedReducer<S, A, E>
where
    A: Clone,
{
    type State = S;
    type Action = A;
    type Environment = E;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let mut all_effects = SmallVec::new();

        for reducer in &self.reducers {
            let effects = reducer.reduce(state, action.clone(), env);
            all_effects.extend(effects.into_iter().filter(|effect| !effect.is_none()));
        }

        all_effects
    }
}

/// Scopes a slice reducer to one field of a larger state.
///
/// `lens` borrows the slice out of the parent state; the slice reducer
/// mutates it in place and never sees the rest of the state.
pub fn scope_reducer<S, SubS, A, E, R>(reducer: R, lens: fn(&mut S) -> &mut SubS) -> ScopedReducer<S, SubS, R>
where
    R: Reducer<State = SubS, Action = A, Environment = E>,
{
    ScopedReducer { reducer, lens }
}

/// A scoped reducer that operates on one slice of state.
///
/// Created by [`scope_reducer`].
pub struct ScopedReducer<S, SubS, R> {
    reducer: R,
    lens: fn(&mut S) -> &mut SubS,
}

impl<S, SubS, R> Reducer for ScopedReducer<S, SubS, R>
where
    R: Reducer<State = SubS>,
{
    type State = S;
    type Action = R::Action;
    type Environment = R::Environment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        self.reducer.reduce((self.lens)(state), action, env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smallvec;

    #[derive(Clone, Default)]
    struct TestState {
        counter: i32,
        name: String,
    }

    #[derive(Clone)]
    enum TestAction {
        Increment,
        Decrement,
        SetName(String),
        Announce,
    }

    struct CounterReducer;

    impl Reducer for CounterReducer {
        type State = i32;
        type Action = TestAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                TestAction::Increment => *state += 1,
                TestAction::Decrement => *state -= 1,
                TestAction::SetName(_) | TestAction::Announce => {},
            }
            smallvec![Effect::None]
        }
    }

    struct NameReducer;

    impl Reducer for NameReducer {
        type State = String;
        type Action = TestAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                TestAction::SetName(name) => {
                    *state = name;
                    smallvec![Effect::None]
                },
                TestAction::Announce => {
                    smallvec![Effect::Future(Box::pin(async { Some(TestAction::Increment) }))]
                },
                TestAction::Increment | TestAction::Decrement => smallvec![Effect::None],
            }
        }
    }

    fn app_reducer() -> CombinedReducer<TestState, TestAction, ()> {
        combine_reducers(vec![
            Box::new(scope_reducer(CounterReducer, |s: &mut TestState| &mut s.counter)),
            Box::new(scope_reducer(NameReducer, |s: &mut TestState| &mut s.name)),
        ])
    }

    #[test]
    fn test_combined_slices_each_see_every_action() {
        let reducer = app_reducer();
        let mut state = TestState::default();

        let _ = reducer.reduce(&mut state, TestAction::Increment, &());
        assert_eq!(state.counter, 1);

        let _ = reducer.reduce(&mut state, TestAction::SetName("Alice".to_string()), &());
        assert_eq!(state.name, "Alice");

        let _ = reducer.reduce(&mut state, TestAction::Decrement, &());
        assert_eq!(state.counter, 0);
        assert_eq!(state.name, "Alice");
    }

    #[test]
    fn test_combined_reducer_drops_no_op_effects() {
        let reducer = app_reducer();
        let mut state = TestState::default();

        let effects = reducer.reduce(&mut state, TestAction::Increment, &());
        assert!(effects.is_empty());

        let effects = reducer.reduce(&mut state, TestAction::Announce, &());
        assert_eq!(effects.len(), 1);
        assert!(matches!(effects[0], Effect::Future(_)));
    }
}
