//! # Completion Listener
//!
//! A [`Listener`] is told when a queued operation has finished, successfully or not.
//! Callbacks always run on the thread that drives the
//! [`ResponsePump`](work_queue::ResponsePump), never on a worker.
//!
//! Any `Fn(Ticket, &OperationResult)` closure is a listener:
//!
//! ```rust
//! use std::sync::Arc;
//! use resource_queue::listener::Listener;
//! use resource_queue::request::OperationResult;
//!
//! let listener: Arc<dyn Listener> = Arc::new(|ticket: u64, result: &OperationResult| {
//!     if result.error {
//!         eprintln!("ticket {ticket} failed: {}", result.message);
//!     }
//! });
//! # let _ = listener;
//! ```

use crate::request::OperationResult;
use crate::tracker::Ticket;

/// Receives the outcome of a queued operation.
pub trait Listener: Send + Sync {
    fn operation_completed(&self, ticket: Ticket, result: &OperationResult);
}

impl<F> Listener for F
where
    F: Fn(Ticket, &OperationResult) + Send + Sync,
{
    fn operation_completed(&self, ticket: Ticket, result: &OperationResult) {
        self(ticket, result)
    }
}
