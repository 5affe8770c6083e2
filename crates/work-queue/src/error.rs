//! # Work Queue Errors
//!
//! Errors raised by the work queue itself. Failures of the work being run are
//! not errors at this level: a request handler reports them through
//! [`Response::failure`](crate::Response::failure).

use crate::message::ChannelId;

/// Errors that can occur when submitting work.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WorkQueueError {
    #[error("Work queue has been shut down")]
    ShutDown,
    #[error("No request handler registered for channel {0}")]
    NoRequestHandler(ChannelId),
}
