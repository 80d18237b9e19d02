use crate::error::SimError;
use crate::event::Event;
use crate::time::ClientId;

/// Everything that can cross the single-writer boundary into the scheduler.
///
/// The scheduler is the only task that ever mutates [`crate::scheduler::Des`];
/// every other task — clients, the [`crate::client::SimHandle`] held by
/// whoever drives the run, the watchdog — only ever produces one of these
/// onto the unbounded channel that feeds the scheduler's ingest loop.
///
/// `ClientId` allocation itself doesn't need a round trip through this bus:
/// [`crate::client::SimHandle`] hands them out from its own atomic counter so
/// `register()` can return a `ClientHandle` synchronously. The `Register`
/// message here is just the scheduler catching up its registry bookkeeping.
pub enum ControlMsg<T> {
    /// A client's `delay`/`delay_until` call, already turned into an event
    /// with its rendezvous half attached.
    NewEvent(Event<T>),
    /// Tell the scheduler a client id now exists, so it can open a slot-list
    /// entry and count it toward liveness.
    Register(ClientId),
    /// `SimHandle::interrupt`: fail every slot `client` currently occupies
    /// with `cause`.
    Interrupt { client: ClientId, cause: SimError },
    /// A `ClientHandle`'s `Drop` impl reporting that it can never submit
    /// another request. Used only for idle/normal-exit bookkeeping, never
    /// for queue mutation.
    ClientDone(ClientId),
}

impl<T> std::fmt::Debug for ControlMsg<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControlMsg::NewEvent(e) => f.debug_tuple("NewEvent").field(e).finish(),
            ControlMsg::Register(c) => f.debug_tuple("Register").field(c).finish(),
            ControlMsg::Interrupt { client, cause } => f
                .debug_struct("Interrupt")
                .field("client", client)
                .field("cause", cause)
                .finish(),
            ControlMsg::ClientDone(c) => f.debug_tuple("ClientDone").field(c).finish(),
        }
    }
}
