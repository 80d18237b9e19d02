use crate::bus::ControlMsg;
use crate::client::SimHandle;
use crate::config::SimConfig;
use crate::error::{KernelError, SimError};
use crate::queue::EventQueue;
use crate::registry::ClientRegistry;
use crate::time::{ClientId, ClockSnapshot, SimTime};
use crate::watchdog;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, trace, warn};

/// Why a simulation run ended.
///
/// `Finished` is deliberately absent: it is never a recorded cause, only an
/// exception injected into still-suspended clients once one of these three
/// (or a clean, unset exit) has already happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The next scheduled event lay at or beyond the run's horizon.
    Done,
    /// The watchdog observed no time progress while work was outstanding.
    Idle,
    /// The scheduler hit an internal invariant violation.
    Failure,
}

/// Summary returned by [`Des::simulate`].
#[derive(Debug, Clone, Copy)]
pub struct SimulationReport {
    pub time: SimTime,
    pub termination: Option<Termination>,
    pub duration: Duration,
    pub delivered: u64,
}

/// Central simulation state, owned exclusively by the task that calls
/// [`Des::simulate`]. Every other task reaches it only by posting a
/// [`ControlMsg`] onto the bus this struct drains.
pub struct Des<T> {
    time: SimTime,
    queue: EventQueue<T>,
    registry: ClientRegistry,
    rx: mpsc::UnboundedReceiver<ControlMsg<T>>,
    clock_tx: watch::Sender<ClockSnapshot>,
    config: SimConfig,
    delivered: u64,
}

impl<T> Des<T> {
    /// Build a fresh simulation and the handle used to register clients and
    /// drive it from the outside.
    pub fn new(config: SimConfig) -> (Self, SimHandle<T>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let time = SimTime::new(config.start_time);
        let (clock_tx, clock_rx) = watch::channel(ClockSnapshot {
            time,
            live_clients: 0,
        });
        let des = Des {
            time,
            queue: EventQueue::new(),
            registry: ClientRegistry::new(),
            rx,
            clock_tx,
            config,
            delivered: 0,
        };
        let handle = SimHandle::new(tx, clock_rx);
        (des, handle)
    }

    pub fn now(&self) -> SimTime {
        self.time
    }

    fn publish_clock(&self) {
        let _ = self.clock_tx.send(ClockSnapshot {
            time: self.time,
            live_clients: self.registry.live_count(),
        });
    }

    fn apply(&mut self, msg: ControlMsg<T>) {
        trace!(?msg, "applying control message");
        match msg {
            ControlMsg::NewEvent(event) => {
                let owner = event.owner;
                let slot = self.queue.insert(event);
                self.registry.occupy(owner, slot);
            }
            ControlMsg::Register(id) => self.registry.register(id),
            ControlMsg::Interrupt { client, cause } => self.interrupt(client, cause),
            ControlMsg::ClientDone(id) => self.registry.mark_done(id),
        }
        self.publish_clock();
    }

    fn drain_ready(&mut self) {
        while let Ok(msg) = self.rx.try_recv() {
            self.apply(msg);
        }
    }

    /// Fail every slot `client` currently occupies with `cause`, per §4.3:
    /// slots shared with other owners keep those owners' events, slots
    /// solely owned by `client` are removed outright.
    fn interrupt(&mut self, client: ClientId, cause: SimError) {
        let slots = self.registry.clear(client);
        for slot in slots {
            for event in self.queue.cancel_owner(slot, client) {
                event.fail(cause.clone());
            }
        }
    }

    /// Run the scheduler loop until termination, then return a report.
    ///
    /// `horizon` is relative to `now()` at call time. `finish`, if true,
    /// injects `SimError::Finished` into every client still occupying a
    /// slot once the loop ends, regardless of why it ended.
    pub async fn simulate(&mut self, horizon: f64, finish: bool) -> SimulationReport {
        let started = Instant::now();
        let stime = self.time + horizon;
        debug!(start = %self.time, horizon, stime = %stime, "simulate starting");

        let (idle_tx, mut idle_rx) = oneshot::channel();
        let watchdog_clock = self.clock_tx.subscribe();
        let watchdog_interval = self.config.watchdog_interval;
        let watchdog_task = tokio::task::Builder::new()
            .name("des-watchdog")
            .spawn(watchdog::run(watchdog_clock, watchdog_interval, idle_tx))
            .expect("failed to spawn des-watchdog task");

        let mut termination = None;

        'outer: loop {
            self.drain_ready();

            if self.queue.is_empty() {
                if self.registry.live_count() == 0 {
                    debug!("no events pending and no live clients remain; clean exit");
                    break;
                }
                tokio::select! {
                    biased;
                    msg = self.rx.recv() => {
                        match msg {
                            Some(msg) => self.apply(msg),
                            None => {
                                debug!("request bus closed with an empty queue; clean exit");
                                break 'outer;
                            }
                        }
                    }
                    _ = &mut idle_rx => {
                        warn!(time = %self.time, "watchdog reported a stall");
                        termination = Some(Termination::Idle);
                        break 'outer;
                    }
                }
                continue;
            }

            let (slot, t) = self.queue.peek_min().expect("queue checked non-empty above");

            if t >= stime {
                self.time = t;
                termination = Some(Termination::Done);
                debug!(time = %t, "reached horizon");
                break;
            }

            if t < self.time {
                let err = KernelError::TimeRegression {
                    from: self.time.as_f64(),
                    to: t.as_f64(),
                };
                error!(%err, "scheduler invariant violated");
                termination = Some(Termination::Failure);
                break;
            }

            self.time = t;
            let events = self.queue.take_slot(slot);
            let owners: HashSet<ClientId> = events.iter().map(|e| e.owner).collect();
            for owner in owners {
                self.registry.vacate(owner, slot);
            }
            self.publish_clock();

            for event in events {
                self.delivered += 1;
                if event.error {
                    let owner = event.owner;
                    trace!(client = %owner, time = %t, "delivering error event");
                    event.fail(SimError::Failure);
                    self.interrupt(owner, SimError::Failure);
                } else {
                    trace!(client = %event.owner, time = %t, "delivering event");
                    event.deliver();
                }
            }

            // A `oneshot::Sender::send` only wakes the receiving task; it
            // doesn't run it. Without yielding here, a client woken by the
            // slot just delivered never gets a turn to file its next
            // request before we pop the next-soonest slot already sitting
            // in the queue, breaking the "requests posted before a delivery
            // step are filed before the next pop" ordering guarantee for
            // any client whose follow-up falls between `t` and the next
            // slot's timestamp. The next iteration's `drain_ready` picks up
            // whatever a woken client files during this yield.
            tokio::task::yield_now().await;
        }

        watchdog_task.abort();

        self.time = stime;
        if finish {
            for client in self.registry.occupied_clients() {
                self.interrupt(client, SimError::Finished);
            }
        }
        self.publish_clock();

        debug!(?termination, time = %self.time, delivered = self.delivered, "simulate ending");
        SimulationReport {
            time: self.time,
            termination,
            duration: started.elapsed(),
            delivered: self.delivered,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn clean_exit_when_no_clients_ever_register() {
        let (mut des, _sim) = Des::<f64>::new(SimConfig::default());
        let report = des.simulate(10.0, true).await;
        assert_eq!(report.termination, None);
        assert_eq!(report.time, SimTime::new(10.0));
        assert_eq!(report.delivered, 0);
    }

    #[tokio::test]
    async fn two_tick_ping() {
        let (mut des, sim) = Des::<f64>::new(SimConfig::default());
        let a = sim.register();
        let handle = tokio::spawn(async move {
            let t1 = a.delay(1.0, false).await.unwrap();
            let t2 = a.delay(2.5, false).await.unwrap();
            (t1, t2)
        });
        let report = des.simulate(5.0, true).await;
        assert_eq!(report.termination, None);
        assert_eq!(report.time, SimTime::new(5.0));
        let (t1, t2) = handle.await.unwrap();
        assert_eq!(t1, 1.0);
        assert_eq!(t2, 3.5);
    }

    #[tokio::test]
    async fn horizon_cut_injects_finished() {
        let (mut des, sim) = Des::<f64>::new(SimConfig::default());
        let a = sim.register();
        let handle = tokio::spawn(async move {
            let r1 = a.delay(1.0, false).await;
            let r2 = a.delay(1.0, false).await;
            let r3 = a.delay(3.0, false).await;
            (r1, r2, r3)
        });
        let report = des.simulate(4.0, true).await;
        assert_eq!(report.termination, Some(Termination::Done));
        assert_eq!(report.time, SimTime::new(4.0));
        let (r1, r2, r3) = handle.await.unwrap();
        assert_eq!(r1, Ok(1.0));
        assert_eq!(r2, Ok(2.0));
        assert_eq!(r3, Err(SimError::Finished));
    }

    #[tokio::test]
    async fn error_event_resolves_to_failure_and_empties_queue() {
        let (mut des, sim) = Des::<f64>::new(SimConfig::default());
        let a = sim.register();
        let handle = tokio::spawn(async move { a.delay_until(3.0, 3.0, true).await });
        let report = des.simulate(10.0, true).await;
        assert_eq!(report.termination, None);
        assert_eq!(handle.await.unwrap(), Err(SimError::Failure));
    }
}
