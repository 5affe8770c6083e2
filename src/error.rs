//! # Errors
//!
//! Two layers of errors:
//!
//! - [`ResourceError`] is what a [`ResourceStore`](crate::store::ResourceStore) reports when
//!   an operation fails. The queue treats it as opaque and only forwards its description.
//! - [`QueueError`] is what the dispatch API of
//!   [`ResourceBackgroundQueue`](crate::queue::ResourceBackgroundQueue) returns.

use work_queue::WorkQueueError;

/// Failure raised by a resource store operation.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ResourceError {
    #[error("{0}")]
    Operation(String),
    #[error("Unknown resource type: {0}")]
    UnknownResourceType(String),
    #[error("Resource group not found: {0}")]
    GroupNotFound(String),
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),
}

impl From<String> for ResourceError {
    fn from(message: String) -> Self {
        ResourceError::Operation(message)
    }
}

impl From<&str> for ResourceError {
    fn from(message: &str) -> Self {
        ResourceError::Operation(message.to_string())
    }
}

/// Errors returned by the dispatch API.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Resource background queue is not initialised")]
    NotInitialised,
    #[error("Resource background queue has been shut down")]
    ShutDown,
    #[error("No Tokio runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
    #[error("Dispatch failed: {0}")]
    Dispatch(#[from] WorkQueueError),
    #[error(transparent)]
    Operation(#[from] ResourceError),
}
