//! Field-change notifications from the controller to its observers.
//!
//! Every state transition emits a well-defined set of these over plain
//! channels; the refresh cadence belongs entirely to the consumer.

use crossbeam_channel::{unbounded, Receiver, Sender};

use super::controller::SessionState;
use super::progress::Progress;

/// Terminal outcome of a session. Always followed by `State(Idle)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    Completed,
    Cancelled,
    Failed,
}

/// One observable field change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Change {
    State(SessionState),
    Progress(Progress),
    /// Displayed hex/base64 outputs changed.
    Output,
    /// Last-result fields (elapsed, bytes, path) changed.
    LastResult,
    /// Error message set or cleared.
    Error,
    /// The path input was mutated by the controller itself (cancel
    /// restore or clear), not by its caller.
    PathInput,
    Terminal(Terminal),
}

/// Subscriber list. A receiver that hangs up is dropped on the next emit.
#[derive(Default)]
pub(crate) struct Notifier {
    subscribers: Vec<Sender<Change>>,
}

impl Notifier {
    pub fn subscribe(&mut self) -> Receiver<Change> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    pub fn emit(&mut self, change: Change) {
        self.subscribers.retain(|tx| tx.send(change).is_ok());
    }
}
