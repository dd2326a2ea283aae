//! Records the actions a store broadcasts.
//!
//! The store broadcasts each action while it still holds the state lock, so
//! once a `dispatch` or `send` has returned every action it produced is
//! already queued on the receiver. [`ActionRecorder::drain`] therefore never
//! has to wait.

use switchboard_core::LifecycleAction;
use tokio::sync::broadcast::Receiver;
use tokio::sync::broadcast::error::TryRecvError;

/// Collects broadcast actions in application order
pub struct ActionRecorder<A> {
    receiver: Receiver<A>,
    recorded: Vec<A>,
    lagged: u64,
}

impl<A: Clone> ActionRecorder<A> {
    /// Start recording from a fresh subscription
    #[must_use]
    pub const fn new(receiver: Receiver<A>) -> Self {
        Self {
            receiver,
            recorded: Vec::new(),
            lagged: 0,
        }
    }

    /// Move every queued action into the recording and return all recorded actions
    pub fn drain(&mut self) -> &[A] {
        loop {
            match self.receiver.try_recv() {
                Ok(action) => self.recorded.push(action),
                Err(TryRecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "Action recorder lagged behind the store");
                    self.lagged += missed;
                },
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
        &self.recorded
    }

    /// Number of actions lost because the recorder fell behind
    #[must_use]
    pub const fn lagged(&self) -> u64 {
        self.lagged
    }

    /// Forget everything recorded so far
    pub fn clear(&mut self) {
        let _ = self.drain();
        self.recorded.clear();
    }

    /// Event types of all recorded lifecycle events, e.g. `user/login/pending`
    pub fn lifecycle_types(&mut self) -> Vec<String>
    where
        A: LifecycleAction,
    {
        self.drain()
            .iter()
            .filter_map(LifecycleAction::lifecycle)
            .map(|record| record.action_type())
            .collect()
    }

    /// Position of the first recorded lifecycle event with the given type
    pub fn position_of(&mut self, action_type: &str) -> Option<usize>
    where
        A: LifecycleAction,
    {
        self.lifecycle_types()
            .iter()
            .position(|recorded| recorded == action_type)
    }

    /// Whether any recorded lifecycle event has the given type
    pub fn saw(&mut self, action_type: &str) -> bool
    where
        A: LifecycleAction,
    {
        self.position_of(action_type).is_some()
    }
}
