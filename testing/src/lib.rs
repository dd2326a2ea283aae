//! # Switchboard Testing
//!
//! Testing utilities and helpers for Switchboard.
//!
//! This crate provides:
//! - [`ReducerTest`]: Given-When-Then harness for slice reducers
//! - [`ActionRecorder`]: Collects every action a store broadcasts, in order
//! - [`assertions`]: Effect assertions for reducer tests
//! - [`properties`]: proptest strategies for workflow outcomes
//!
//! ## Example
//!
//! ```ignore
//! use switchboard_testing::ActionRecorder;
//!
//! #[tokio::test]
//! async fn login_and_register_event_order() {
//!     let store = test_store();
//!     let mut recorder = ActionRecorder::new(store.subscribe_actions());
//!
//!     let _ = store.dispatch(&operations.login_and_register, ()).await;
//!
//!     assert_eq!(recorder.lifecycle_types()[0], "registration/loginAndRegister/pending");
//! }
//! ```


/// Broadcast action recording
pub mod recorder;

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::prelude::*;

    /// Outcome of each step of a workflow: `true` succeeds, `false` rejects
    pub fn step_outcomes(steps: usize) -> impl Strategy<Value = Vec<bool>> {
        proptest::collection::vec(any::<bool>(), steps)
    }

    /// Index of the first rejecting step, `None` if every step succeeds
    #[must_use]
    pub fn first_failure(outcomes: &[bool]) -> Option<usize> {
        outcomes.iter().position(|succeeded| !succeeded)
    }
}

/// Install a `tracing` subscriber that writes through the test harness.
///
/// Honors `RUST_LOG`; safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub use recorder::ActionRecorder;
pub use reducer_test::{ReducerTest, assertions};

#[cfg(test)]
mod tests {
    use super::properties::first_failure;

    #[test]
    fn first_failure_finds_earliest_rejection() {
        assert_eq!(first_failure(&[true, true, true]), None);
        assert_eq!(first_failure(&[true, false, false]), Some(1));
        assert_eq!(first_failure(&[false, true, false]), Some(0));
        assert_eq!(first_failure(&[]), None);
    }
}
