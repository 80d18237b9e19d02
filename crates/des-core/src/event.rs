use crate::error::SimError;
use crate::time::{ClientId, SimTime};
use tokio::sync::oneshot;

/// A single pending wake-up.
///
/// Constructed by [`crate::client::ClientHandle::delay_until`] and filed into
/// the [`crate::queue::EventQueue`] by the scheduler. `rendezvous` is a
/// 0-capacity, single-use delivery channel: the scheduler sends into it
/// exactly once, whether that's a value or an injected [`SimError`].
pub struct Event<T> {
    pub time: SimTime,
    pub value: T,
    pub error: bool,
    pub owner: ClientId,
    pub rendezvous: oneshot::Sender<Result<T, SimError>>,
}

impl<T> std::fmt::Debug for Event<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("time", &self.time)
            .field("error", &self.error)
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}

impl<T> Event<T> {
    /// Resolve this event's rendezvous with a normal value. Consumes the
    /// event, matching the contract that a rendezvous fires at most once.
    pub fn deliver(self) {
        // The receiver may already have been dropped (its owning task
        // cancelled or panicked); that's not this event's problem.
        let _ = self.rendezvous.send(Ok(self.value));
    }

    /// Resolve this event's rendezvous with an injected error.
    pub fn fail(self, err: SimError) {
        let _ = self.rendezvous.send(Err(err));
    }
}
