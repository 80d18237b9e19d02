use crate::bus::ControlMsg;
use crate::error::SimError;
use crate::event::Event;
use crate::time::{ClientId, ClockSnapshot, SimTime};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::trace;

/// Shared handle to a running simulation, held by whoever drives it.
///
/// Cloneable and cheap: every clone shares the same bus sender and clock
/// receiver. Typically one `SimHandle` is used to `register` every client up
/// front and to call `interrupt` from outside the simulated world (e.g. a
/// test harness cancelling a client on a real-time timeout).
pub struct SimHandle<T> {
    tx: mpsc::UnboundedSender<ControlMsg<T>>,
    clock: watch::Receiver<ClockSnapshot>,
    next_client: Arc<AtomicU64>,
}

// Written by hand rather than derived: `#[derive(Clone)]` would add a
// `T: Clone` bound even though every field here is cloneable regardless of
// `T` (the channel only ever clones its sender handle, never a `T` value).
impl<T> Clone for SimHandle<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            clock: self.clock.clone(),
            next_client: self.next_client.clone(),
        }
    }
}

impl<T> SimHandle<T> {
    pub(crate) fn new(
        tx: mpsc::UnboundedSender<ControlMsg<T>>,
        clock: watch::Receiver<ClockSnapshot>,
    ) -> Self {
        Self {
            tx,
            clock,
            next_client: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Allocate a new client id and return a handle bound to it. The
    /// scheduler learns about the new id asynchronously via the bus; no
    /// round trip is needed since id allocation and handle construction are
    /// both purely local.
    pub fn register(&self) -> ClientHandle<T> {
        let id = ClientId::next(&self.next_client);
        trace!(client = %id, "registering client");
        // If the scheduler has already shut down the bus is closed and this
        // registration is moot; the returned handle's own sends will no-op
        // the same way.
        let _ = self.tx.send(ControlMsg::Register(id));
        ClientHandle {
            id,
            tx: self.tx.clone(),
            clock: self.clock.clone(),
        }
    }

    /// Fail every slot `client` currently occupies with `cause`.
    pub fn interrupt(&self, client: ClientId, cause: SimError) {
        let _ = self.tx.send(ControlMsg::Interrupt { client, cause });
    }

    pub fn now(&self) -> f64 {
        self.clock.borrow().time.as_f64()
    }
}

/// A single client process's view of the simulation.
///
/// Not `Clone`: a client is one logical process, and its `Drop` impl tells
/// the scheduler it can never submit another request, which wouldn't be
/// sound to do more than once per process.
pub struct ClientHandle<T> {
    id: ClientId,
    tx: mpsc::UnboundedSender<ControlMsg<T>>,
    clock: watch::Receiver<ClockSnapshot>,
}

impl<T> ClientHandle<T> {
    pub fn id(&self) -> ClientId {
        self.id
    }

    pub fn now(&self) -> f64 {
        self.clock.borrow().time.as_f64()
    }

    /// Construct an event for absolute time `t` carrying `value`, publish
    /// it, then await its rendezvous. `error` marks the event so the
    /// scheduler fires `SimError::Failure` instead of delivering `value`.
    pub async fn delay_until(&self, t: f64, value: T, error: bool) -> Result<T, SimError> {
        let (tx, rx) = oneshot::channel();
        let event = Event {
            time: SimTime::new(t),
            value,
            error,
            owner: self.id,
            rendezvous: tx,
        };
        if self.tx.send(ControlMsg::NewEvent(event)).is_err() {
            // Scheduler is gone; there is no clean value to deliver, so
            // treat it the same as a scheduler-driven finish.
            return Err(SimError::Finished);
        }
        rx.await.unwrap_or(Err(SimError::Finished))
    }
}

impl ClientHandle<f64> {
    /// Sugar over `delay_until` for the common case of an `f64`-valued
    /// clock, where the value delivered back is simply the new `now()`.
    pub async fn delay(&self, dt: f64, error: bool) -> Result<f64, SimError> {
        let t = self.now() + dt;
        self.delay_until(t, t, error).await
    }
}

impl<T> Drop for ClientHandle<T> {
    fn drop(&mut self) {
        let _ = self.tx.send(ControlMsg::ClientDone(self.id));
    }
}
