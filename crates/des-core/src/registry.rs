use crate::time::{ClientId, SlotId};
use std::collections::{HashMap, HashSet};

/// Bidirectional bookkeeping from client to the queue slots it occupies.
///
/// This is what lets `interrupt` clean up a client's outstanding waits in
/// O(k) (k = number of slots that client is in, almost always one) instead
/// of scanning the whole queue.
///
/// It also tracks which registered clients still have a live
/// [`crate::client::ClientHandle`] out in the world. A client's handle
/// notifies the scheduler when it is dropped; once no live handle remains
/// and the queue is empty, the scheduler knows with certainty that nothing
/// further can ever be submitted, rather than guessing from channel state.
#[derive(Default)]
pub struct ClientRegistry {
    slots: HashMap<ClientId, HashSet<SlotId>>,
    live: HashSet<ClientId>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, client: ClientId) {
        self.slots.entry(client).or_default();
        self.live.insert(client);
    }

    pub fn is_registered(&self, client: ClientId) -> bool {
        self.slots.contains_key(&client)
    }

    /// A client's handle has been dropped; it can never submit another
    /// request. Its currently-occupied slots (if any) are untouched here —
    /// dropping a handle while a `delay` future is still pending can't
    /// happen without also cancelling that future, which already tears down
    /// its slot via the event's own drop glue on the client side; the
    /// kernel only needs the liveness count for idle/normal-exit detection.
    pub fn mark_done(&mut self, client: ClientId) {
        self.live.remove(&client);
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn occupy(&mut self, client: ClientId, slot: SlotId) {
        self.slots.entry(client).or_default().insert(slot);
    }

    pub fn vacate(&mut self, client: ClientId, slot: SlotId) {
        if let Some(set) = self.slots.get_mut(&client) {
            set.remove(&slot);
        }
    }

    pub fn slots_of(&self, client: ClientId) -> Option<&HashSet<SlotId>> {
        self.slots.get(&client)
    }

    /// Clear every slot a client occupies (used by `interrupt`, step 2 of
    /// §4.3). Returns the slots that were cleared.
    pub fn clear(&mut self, client: ClientId) -> HashSet<SlotId> {
        self.slots.entry(client).or_default();
        std::mem::take(self.slots.get_mut(&client).unwrap())
    }

    /// Clients that currently occupy at least one slot, i.e. are still
    /// suspended on an outstanding event. Used by the end-of-run `finish`
    /// step to know who still needs a `Finished` injection.
    pub fn occupied_clients(&self) -> Vec<ClientId> {
        self.slots
            .iter()
            .filter(|(_, slots)| !slots.is_empty())
            .map(|(&c, _)| c)
            .collect()
    }
}
