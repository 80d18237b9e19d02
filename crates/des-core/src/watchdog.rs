use crate::time::ClockSnapshot;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tracing::{debug, trace};

/// Samples the scheduler's published clock at a fixed cadence and reports a
/// stall.
///
/// Runs as its own task (named `des-watchdog` by the caller, matching the
/// teacher's spawn convention) so it can observe wall-clock-real stalls
/// without the scheduler itself needing to poll a timer between steps.
/// Aborted by the scheduler once `simulate` returns; firing is a one-shot —
/// there is nothing further for this task to do once it has reported.
pub async fn run(
    mut clock: watch::Receiver<ClockSnapshot>,
    interval: Duration,
    idle_tx: oneshot::Sender<()>,
) {
    let mut last = *clock.borrow_and_update();
    loop {
        tokio::time::sleep(interval).await;
        let current = *clock.borrow();
        trace!(?last, ?current, "watchdog sample");
        if current.time == last.time && current.live_clients > 0 {
            debug!(time = %current.time, live = current.live_clients, "watchdog detected stall");
            let _ = idle_tx.send(());
            return;
        }
        last = current;
    }
}
