//! Integration tests for the workflow composer
//!
//! A workflow stops at its first rejected step, fails with that step's reason,
//! and runs a step's compensation only when an earlier step had completed.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use proptest::prelude::*;
use std::sync::Arc;
use switchboard_core::{
    Effect, LifecycleAction, LifecycleRecord, OperationAction, RejectReason, Rejection, Settled,
    SmallVec, reducer::Reducer, smallvec,
};
use switchboard_runtime::{AsyncOperation, Store, Workflow};
use switchboard_testing::properties::{first_failure, step_outcomes};
use switchboard_testing::{ActionRecorder, init_tracing};

// ============================================================================
// Test Fixtures
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum StepRejection {
    Refused,
}

impl RejectReason for StepRejection {
    fn tag(&self) -> &'static str {
        match self {
            Self::Refused => "REFUSED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PipelineRejection {
    FirstRejected,
    SecondRejected,
    ThirdRejected,
}

impl RejectReason for PipelineRejection {
    fn tag(&self) -> &'static str {
        match self {
            Self::FirstRejected => "FIRST_REJECTED",
            Self::SecondRejected => "SECOND_REJECTED",
            Self::ThirdRejected => "THIRD_REJECTED",
        }
    }
}

#[derive(Debug, Clone)]
enum PipelineAction {
    /// Lifecycle of any single step; the argument says whether it succeeds
    Step(OperationAction<bool, (), StepRejection>),
    /// Lifecycle of the composed operation
    Pipeline(OperationAction<(), (), PipelineRejection>),
}

impl LifecycleAction for PipelineAction {
    fn lifecycle(&self) -> Option<LifecycleRecord> {
        match self {
            Self::Step(action) => action.lifecycle(),
            Self::Pipeline(action) => action.lifecycle(),
        }
    }
}

struct NoopReducer;

impl Reducer for NoopReducer {
    type State = ();
    type Action = PipelineAction;
    type Environment = ();

    fn reduce(&self, _state: &mut (), _action: PipelineAction, _env: &()) -> SmallVec<[Effect<PipelineAction>; 4]> {
        smallvec![Effect::None]
    }
}

type StepOp = AsyncOperation<bool, (), StepRejection, (), PipelineAction>;
type PipelineOp = AsyncOperation<(), (), PipelineRejection, (), PipelineAction>;

fn step(name: &'static str) -> StepOp {
    AsyncOperation::new(name, PipelineAction::Step, |succeed: bool, _ctx| async move {
        if succeed {
            Ok(())
        } else {
            Err(Rejection::Reason(StepRejection::Refused))
        }
    })
}

/// first → second (compensated by undo) → third
fn pipeline(outcomes: [bool; 3], undo_succeeds: bool) -> PipelineOp {
    let workflow = Arc::new(
        Workflow::new("test/pipeline")
            .step(&step("test/first"), outcomes[0], PipelineRejection::FirstRejected)
            .step(&step("test/second"), outcomes[1], PipelineRejection::SecondRejected)
            .compensate_with(&step("test/undo"), undo_succeeds)
            .step(&step("test/third"), outcomes[2], PipelineRejection::ThirdRejected),
    );

    AsyncOperation::new("test/pipeline", PipelineAction::Pipeline, move |(), ctx| {
        let workflow = Arc::clone(&workflow);
        async move { workflow.run(&ctx).await.map_err(Rejection::Reason) }
    })
}

fn store() -> Store<(), PipelineAction, (), NoopReducer> {
    init_tracing();
    Store::new((), NoopReducer, ())
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_all_steps_succeed_in_order() {
    let store = store();
    let mut recorder = ActionRecorder::new(store.subscribe_actions());

    let settled = store.dispatch(&pipeline([true; 3], true), ()).await;

    assert_eq!(settled, Settled::Fulfilled { value: () });
    assert_eq!(
        recorder.lifecycle_types(),
        vec![
            "test/pipeline/pending",
            "test/first/pending",
            "test/first/fulfilled",
            "test/second/pending",
            "test/second/fulfilled",
            "test/third/pending",
            "test/third/fulfilled",
            "test/pipeline/fulfilled",
        ]
    );
}

#[tokio::test]
async fn test_first_step_failure_runs_nothing_else() {
    let store = store();
    let mut recorder = ActionRecorder::new(store.subscribe_actions());

    let settled = store.dispatch(&pipeline([false, true, true], true), ()).await;

    assert_eq!(
        settled.reason(),
        Some(&Rejection::Reason(PipelineRejection::FirstRejected))
    );
    assert!(!recorder.saw("test/second/pending"));
    assert!(!recorder.saw("test/third/pending"));
    assert!(!recorder.saw("test/undo/pending"));
}

#[tokio::test]
async fn test_compensation_runs_before_composed_rejection() {
    let store = store();
    let mut recorder = ActionRecorder::new(store.subscribe_actions());

    let settled = store.dispatch(&pipeline([true, false, true], true), ()).await;

    assert_eq!(
        settled.reason(),
        Some(&Rejection::Reason(PipelineRejection::SecondRejected))
    );
    let undo = recorder.position_of("test/undo/fulfilled").unwrap();
    let rejected = recorder.position_of("test/pipeline/rejected").unwrap();
    assert!(undo < rejected);
    assert!(!recorder.saw("test/third/pending"));
}

#[tokio::test]
async fn test_failed_compensation_keeps_step_reason() {
    let store = store();
    let mut recorder = ActionRecorder::new(store.subscribe_actions());

    let settled = store.dispatch(&pipeline([true, false, true], false), ()).await;

    assert_eq!(
        settled.reason(),
        Some(&Rejection::Reason(PipelineRejection::SecondRejected))
    );
    assert!(recorder.saw("test/undo/rejected"));
}

#[tokio::test]
async fn test_compensation_skipped_without_prior_commit() {
    let store = store();
    let mut recorder = ActionRecorder::new(store.subscribe_actions());
    let workflow = Arc::new(
        Workflow::new("test/solo")
            .step(&step("test/only"), false, PipelineRejection::FirstRejected)
            .compensate_with(&step("test/undo"), true),
    );
    assert_eq!(workflow.len(), 1);
    let solo: PipelineOp = AsyncOperation::new("test/solo", PipelineAction::Pipeline, move |(), ctx| {
        let workflow = Arc::clone(&workflow);
        async move { workflow.run(&ctx).await.map_err(Rejection::Reason) }
    });

    let settled = store.dispatch(&solo, ()).await;

    assert!(settled.is_rejected());
    assert!(!recorder.saw("test/undo/pending"));
}

#[tokio::test]
async fn test_later_step_failure_is_not_compensated() {
    let store = store();
    let mut recorder = ActionRecorder::new(store.subscribe_actions());

    let settled = store.dispatch(&pipeline([true, true, false], true), ()).await;

    assert_eq!(
        settled.reason(),
        Some(&Rejection::Reason(PipelineRejection::ThirdRejected))
    );
    assert!(!recorder.saw("test/undo/pending"));
}

proptest! {
    /// The composed reason always names the first failing step, and undo runs
    /// exactly when the second step is the first to fail.
    #[test]
    fn prop_first_failure_is_attributed(outcomes in step_outcomes(3)) {
        let expected = first_failure(&outcomes).map(|index| {
            [
                PipelineRejection::FirstRejected,
                PipelineRejection::SecondRejected,
                PipelineRejection::ThirdRejected,
            ][index]
        });
        let flags = [outcomes[0], outcomes[1], outcomes[2]];

        let (settled, undo_ran) = tokio_test::block_on(async {
            let store = store();
            let mut recorder = ActionRecorder::new(store.subscribe_actions());
            let settled = store.dispatch(&pipeline(flags, true), ()).await;
            (settled, recorder.saw("test/undo/pending"))
        });

        match expected {
            None => prop_assert!(settled.is_fulfilled()),
            Some(reason) => prop_assert_eq!(settled.reason(), Some(&Rejection::Reason(reason))),
        }
        prop_assert_eq!(undo_ran, expected == Some(PipelineRejection::SecondRejected));
    }
}
