//! # Ticket Tracker
//!
//! The set of tickets whose responses have not been processed yet.
//!
//! Inserts come from any caller thread, removals only from the pump thread. Both go through
//! one mutex. [`TicketTracker::track_with`] holds that mutex while the request is submitted,
//! so even when a worker finishes instantly, the pump cannot remove the ticket before it was
//! inserted.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};
use work_queue::RequestId;

/// Identifier of one queued operation; the work queue's request id.
pub type Ticket = RequestId;

/// Ticket returned when an operation ran synchronously. Never tracked.
pub const SYNCHRONOUS_TICKET: Ticket = 0;

#[derive(Debug, Default)]
pub struct TicketTracker {
    outstanding: Mutex<HashSet<Ticket>>,
}

impl TicketTracker {
    pub fn new() -> Self {
        Self::default()
    }

    // A HashSet is never left half-updated, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, HashSet<Ticket>> {
        self.outstanding.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `submit` under the tracker lock and records the ticket it returns.
    pub fn track_with<E>(&self, submit: impl FnOnce() -> Result<Ticket, E>) -> Result<Ticket, E> {
        let mut outstanding = self.lock();
        let ticket = submit()?;
        outstanding.insert(ticket);
        Ok(ticket)
    }

    /// Forgets a ticket. Returns whether it was outstanding.
    pub fn remove(&self, ticket: Ticket) -> bool {
        self.lock().remove(&ticket)
    }

    pub fn contains(&self, ticket: Ticket) -> bool {
        self.lock().contains(&ticket)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_and_remove() {
        let tracker = TicketTracker::new();
        let ticket = tracker.track_with(|| Ok::<_, ()>(5)).unwrap();
        assert_eq!(ticket, 5);
        assert!(tracker.contains(5));
        assert!(tracker.remove(5));
        assert!(!tracker.remove(5));
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_failed_submission_tracks_nothing() {
        let tracker = TicketTracker::new();
        assert_eq!(tracker.track_with(|| Err::<Ticket, _>("closed")), Err("closed"));
        assert_eq!(tracker.len(), 0);
    }

    #[test]
    fn test_concurrent_inserts() {
        let tracker = std::sync::Arc::new(TicketTracker::new());
        let handles: Vec<_> = (1..=16u64)
            .map(|base| {
                let tracker = tracker.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        tracker.track_with(|| Ok::<_, ()>(base * 1000 + i)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(tracker.len(), 1600);
    }
}
