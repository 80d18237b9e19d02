use thiserror::Error;

/// Errors injected into a client's outstanding `delay`/`delay_until` call.
///
/// These are the only error values a client ever sees; they cross the
/// rendezvous channel in place of a normal value. `Clone` lets a single
/// `interrupt` call fan the same cause out to every slot a client occupies.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    /// The scheduler delivered an error event, or something explicitly
    /// interrupted this client with a failure.
    #[error("simulation client failed")]
    Failure,
    /// The watchdog observed virtual time stall with outstanding work and
    /// ended the run. Only ever injected if something explicitly interrupts
    /// a client with it; the watchdog itself only sets `Termination::Idle`.
    #[error("simulation went idle: virtual time failed to advance while work was outstanding")]
    Idle,
    /// `simulate` reached its horizon (or another termination cause) and the
    /// run ended with this client still suspended.
    #[error("simulation finished with this client still suspended")]
    Finished,
}

/// Internal, programmer-error conditions: these indicate a bug in the
/// kernel or its caller rather than a normal simulated-time outcome, and are
/// never delivered to a client's rendezvous.
#[derive(Error, Debug)]
pub enum KernelError {
    #[error("client {0} was never registered")]
    UnknownClient(crate::time::ClientId),
    #[error("client {0} is already registered")]
    AlreadyRegistered(crate::time::ClientId),
    #[error("virtual time regressed: attempted to move from {from} to {to}")]
    TimeRegression { from: f64, to: f64 },
    #[error("request bus closed unexpectedly while a client was still registered")]
    BusClosed,
}
