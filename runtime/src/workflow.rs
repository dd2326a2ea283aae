//! Workflow composer.
//!
//! A [`Workflow`] runs typed async operations in order and stops at the first
//! rejection, attributing it to the step that failed. A step may carry a
//! compensating operation that undoes what earlier steps committed.
//!
//! ```ignore
//! let workflow = Workflow::new("registration/loginAndRegister")
//!     .step(&login, (), LoginAndRegisterRejection::LoginRejected)
//!     .step(&get_access_token, (), LoginAndRegisterRejection::GetAccessTokenRejected)
//!     .compensate_with(&logout, ())
//!     .step(&register, (), LoginAndRegisterRejection::RegisterRejected);
//!
//! // Inside an operation body:
//! workflow.run(&ctx).await.map_err(Rejection::Reason)
//! ```

use crate::operation::{AsyncOperation, OperationContext};
use futures::FutureExt;
use futures::future::BoxFuture;
use switchboard_core::RejectReason;

/// Tag of the rejection that stopped a step; `None` for unexpected errors
type StepOutcome = Result<(), Option<&'static str>>;

type StepFn<S, A> = Box<dyn Fn(OperationContext<S, A>) -> BoxFuture<'static, StepOutcome> + Send + Sync>;

struct Step<S, A, Reason> {
    operation: &'static str,
    reason: Reason,
    run: StepFn<S, A>,
    compensation: Option<(&'static str, StepFn<S, A>)>,
}

/// Ordered sequence of operations with first-failure attribution.
pub struct Workflow<S, A, Reason> {
    name: &'static str,
    steps: Vec<Step<S, A, Reason>>,
}

impl<S, A, Reason> Workflow<S, A, Reason>
where
    S: Send + Sync + 'static,
    A: Send + 'static,
    Reason: Clone + Send + Sync,
{
    /// Create an empty workflow
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            steps: Vec::new(),
        }
    }

    /// Append a step; a rejection of `operation` makes the workflow fail with `reason`
    #[must_use]
    pub fn step<Arg, T, R>(mut self, operation: &AsyncOperation<Arg, T, R, S, A>, arg: Arg, reason: Reason) -> Self
    where
        Arg: Clone + Send + Sync + 'static,
        T: Clone + Send + 'static,
        R: RejectReason + Clone + Send + 'static,
    {
        self.steps.push(Step {
            operation: operation.name(),
            reason,
            run: step_fn(operation, arg),
            compensation: None,
        });
        self
    }

    /// Compensate the most recently added step.
    ///
    /// When that step rejects and an earlier step has already completed,
    /// `operation` runs before the workflow fails. A rejected compensation is
    /// logged and does not change the workflow's reason. Calling this before
    /// any step was added has no effect.
    #[must_use]
    pub fn compensate_with<Arg, T, R>(mut self, operation: &AsyncOperation<Arg, T, R, S, A>, arg: Arg) -> Self
    where
        Arg: Clone + Send + Sync + 'static,
        T: Clone + Send + 'static,
        R: RejectReason + Clone + Send + 'static,
    {
        if let Some(step) = self.steps.last_mut() {
            step.compensation = Some((operation.name(), step_fn(operation, arg)));
        }
        self
    }

    /// Workflow name
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Number of steps
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the workflow has no steps
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step in order.
    ///
    /// # Errors
    ///
    /// Returns the reason mapped to the first step that rejects. Later steps
    /// do not run.
    #[tracing::instrument(skip(self, ctx), fields(workflow = self.name))]
    pub async fn run(&self, ctx: &OperationContext<S, A>) -> Result<(), Reason> {
        for (index, step) in self.steps.iter().enumerate() {
            let Err(tag) = (step.run)(ctx.clone()).await else {
                continue;
            };

            tracing::warn!(
                step = step.operation,
                index,
                reason = tag.unwrap_or("ERROR"),
                "Workflow step rejected"
            );

            if let Some((compensation, run)) = &step.compensation {
                if index > 0 {
                    tracing::warn!(step = step.operation, compensation, "Compensating");
                    if let Err(tag) = run(ctx.clone()).await {
                        tracing::error!(
                            compensation,
                            reason = tag.unwrap_or("ERROR"),
                            "Compensation failed"
                        );
                    }
                }
            }

            return Err(step.reason.clone());
        }

        Ok(())
    }
}

fn step_fn<Arg, T, R, S, A>(operation: &AsyncOperation<Arg, T, R, S, A>, arg: Arg) -> StepFn<S, A>
where
    Arg: Clone + Send + Sync + 'static,
    T: Clone + Send + 'static,
    R: RejectReason + Clone + Send + 'static,
    S: Send + Sync + 'static,
    A: Send + 'static,
{
    let operation = operation.clone();
    Box::new(move |ctx: OperationContext<S, A>| {
        let operation = operation.clone();
        let arg = arg.clone();
        async move {
            ctx.dispatch(&operation, arg)
                .await
                .into_result()
                .map(|_| ())
                .map_err(|rejection| rejection.tag())
        }
        .boxed()
    })
}
