use crate::event::Event;
use crate::time::{ClientId, SimTime, SlotId};
use std::collections::{BTreeMap, HashMap};

/// The min-priority structure over distinct virtual timestamps.
///
/// `by_time` doubles as both the priority order (`BTreeMap` keeps it sorted)
/// and the timestamp→slot index, since those are the same bijection viewed
/// from one side; `time_of_slot` is the other side, needed to find a slot's
/// timestamp in O(1) when all we have is a slot id (e.g. during interrupt
/// cleanup, which only knows the slots a client occupies).
pub struct EventQueue<T> {
    by_time: BTreeMap<SimTime, SlotId>,
    time_of_slot: HashMap<SlotId, SimTime>,
    events: HashMap<SlotId, Vec<Event<T>>>,
    next_slot: u64,
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        Self {
            by_time: BTreeMap::new(),
            time_of_slot: HashMap::new(),
            events: HashMap::new(),
            next_slot: 0,
        }
    }
}

impl<T> EventQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct pending timestamps (slots), not the number of
    /// events, so that callers benchmarking coalescing see the effect.
    pub fn slot_count(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// File `event` into its slot, coalescing with any other event already
    /// due at the same timestamp. Appends preserve submission order within
    /// the slot, which is what gives same-timestamp FIFO delivery.
    pub fn insert(&mut self, event: Event<T>) -> SlotId {
        if let Some(&slot) = self.by_time.get(&event.time) {
            self.events.get_mut(&slot).expect("slot index desync").push(event);
            slot
        } else {
            let slot = SlotId::next(&mut self.next_slot);
            self.by_time.insert(event.time, slot);
            self.time_of_slot.insert(slot, event.time);
            self.events.insert(slot, vec![event]);
            slot
        }
    }

    /// The slot with the smallest timestamp, without removing it.
    pub fn peek_min(&self) -> Option<(SlotId, SimTime)> {
        self.by_time.iter().next().map(|(&t, &s)| (s, t))
    }

    /// Remove a slot and its timestamp from every backing structure,
    /// returning its events. After this call the slot no longer exists
    /// anywhere in the queue.
    pub fn take_slot(&mut self, slot: SlotId) -> Vec<Event<T>> {
        let time = self
            .time_of_slot
            .remove(&slot)
            .expect("take_slot on unknown slot");
        self.by_time.remove(&time);
        self.events.remove(&slot).expect("slot index desync")
    }

    /// Drop every event owned by `owner` from a still-live slot. If that
    /// empties the slot, remove it entirely (mirroring `take_slot`).
    /// Returns the events that were dropped.
    pub fn cancel_owner(&mut self, slot: SlotId, owner: ClientId) -> Vec<Event<T>> {
        let Some(list) = self.events.get_mut(&slot) else {
            return Vec::new();
        };
        let mut removed = Vec::new();
        let mut keep = Vec::with_capacity(list.len());
        for event in list.drain(..) {
            if event.owner == owner {
                removed.push(event);
            } else {
                keep.push(event);
            }
        }
        if keep.is_empty() {
            self.events.remove(&slot);
            if let Some(time) = self.time_of_slot.remove(&slot) {
                self.by_time.remove(&time);
            }
        } else {
            *list = keep;
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimError;
    use tokio::sync::oneshot;

    fn event(time: f64, owner: ClientId) -> (Event<f64>, oneshot::Receiver<Result<f64, SimError>>) {
        let (tx, rx) = oneshot::channel();
        (
            Event {
                time: SimTime(time),
                value: time,
                error: false,
                owner,
                rendezvous: tx,
            },
            rx,
        )
    }

    fn cid(n: u64) -> ClientId {
        // ClientId::next needs an AtomicU64; for tests we just need distinct
        // ids, so drive a fresh counter per call site via a local static.
        use std::sync::atomic::AtomicU64;
        static COUNTERS: AtomicU64 = AtomicU64::new(0);
        let _ = n;
        ClientId::next(&COUNTERS)
    }

    #[test]
    fn coalesces_same_timestamp() {
        let mut q = EventQueue::new();
        let a = cid(0);
        let (e1, _r1) = event(2.0, a);
        let (e2, _r2) = event(2.0, a);
        q.insert(e1);
        q.insert(e2);
        assert_eq!(q.slot_count(), 1);
        let (slot, t) = q.peek_min().unwrap();
        assert_eq!(t, SimTime(2.0));
        let events = q.take_slot(slot);
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn orders_distinct_timestamps() {
        let mut q = EventQueue::new();
        let a = cid(0);
        let (e1, _r1) = event(5.0, a);
        let (e2, _r2) = event(1.0, a);
        let (e3, _r3) = event(3.0, a);
        q.insert(e1);
        q.insert(e2);
        q.insert(e3);
        let (slot, t) = q.peek_min().unwrap();
        assert_eq!(t, SimTime(1.0));
        q.take_slot(slot);
        let (_, t) = q.peek_min().unwrap();
        assert_eq!(t, SimTime(3.0));
    }

    #[test]
    fn cancel_owner_drops_only_its_events_and_keeps_others() {
        let mut q = EventQueue::new();
        let a = cid(0);
        let b = cid(1);
        let (e1, _r1) = event(4.0, a);
        let (e2, _r2) = event(4.0, b);
        let slot = q.insert(e1);
        q.insert(e2);
        let removed = q.cancel_owner(slot, a);
        assert_eq!(removed.len(), 1);
        assert_eq!(q.slot_count(), 1);
        let (slot2, _) = q.peek_min().unwrap();
        let remaining = q.take_slot(slot2);
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].owner, b);
    }

    #[test]
    fn cancel_owner_removes_slot_when_emptied() {
        let mut q = EventQueue::new();
        let a = cid(0);
        let (e1, _r1) = event(4.0, a);
        let slot = q.insert(e1);
        q.cancel_owner(slot, a);
        assert!(q.is_empty());
        assert!(q.peek_min().is_none());
    }
}
