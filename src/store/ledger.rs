use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::rest::crud::FetchHandle;
use crate::rest::descriptor::Descriptor;

static NEXT_TICKET: AtomicU64 = AtomicU64::new(1);

/// Identifies one issued fetch, unique for the life of the process so a
/// fetch started before a store reset can never finish a later one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

impl Ticket {
    pub fn next() -> Self {
        Ticket(NEXT_TICKET.fetch_add(1, Ordering::Relaxed))
    }
}

struct InFlight {
    ticket: Ticket,
    handle: FetchHandle,
    /// Whether the descriptor was completed before this fetch started.
    was_completed: bool,
}

/// In-flight and completed fetch requests keyed by descriptor.
///
/// A descriptor is absent, in flight or completed, never two at once.
#[derive(Default)]
pub struct RequestLedger {
    in_flight: HashMap<Descriptor, InFlight>,
    completed: HashSet<Descriptor>,
}

impl RequestLedger {
    /// Pending handle of an in-flight descriptor.
    pub fn in_flight(&self, descriptor: &Descriptor) -> Option<FetchHandle> {
        self.in_flight.get(descriptor).map(|entry| entry.handle.clone())
    }

    pub fn is_in_flight(&self, descriptor: &Descriptor) -> bool {
        self.in_flight.contains_key(descriptor)
    }

    pub fn is_completed(&self, descriptor: &Descriptor) -> bool {
        self.completed.contains(descriptor)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Register `handle` as the one pending fetch for `descriptor`.
    pub fn start(&mut self, descriptor: Descriptor, ticket: Ticket, handle: FetchHandle) {
        let was_completed = self.completed.remove(&descriptor);
        self.in_flight.insert(
            descriptor,
            InFlight {
                ticket,
                handle,
                was_completed,
            },
        );
    }

    /// Drop the in-flight entry registered under `ticket`. A success marks
    /// the descriptor completed; a failure restores the state it had before
    /// the fetch started. Returns `false`, changing nothing, when `ticket`
    /// is not the descriptor's current fetch.
    pub fn finish(&mut self, descriptor: &Descriptor, ticket: Ticket, succeeded: bool) -> bool {
        match self.in_flight.get(descriptor) {
            Some(entry) if entry.ticket == ticket => {}
            _ => return false,
        }
        let was_completed = self
            .in_flight
            .remove(descriptor)
            .is_some_and(|entry| entry.was_completed);
        if succeeded || was_completed {
            self.completed.insert(descriptor.clone());
        }
        true
    }

    /// Forget every completed descriptor. In-flight entries are kept, and a
    /// failing one will not bring its descriptor back.
    pub fn clear_completed(&mut self) {
        self.completed.clear();
        for entry in self.in_flight.values_mut() {
            entry.was_completed = false;
        }
    }
}
