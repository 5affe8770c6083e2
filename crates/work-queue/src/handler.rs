//! # Handler Traits
//!
//! The two sides of a channel. A subsystem that wants work done off the main thread
//! implements both and registers itself on a channel it owns:
//!
//! - [`RequestHandler`] runs on a worker thread and turns a [`Request`] into a [`Response`].
//! - [`ResponseHandler`] runs on the thread that drives the [`ResponsePump`](crate::ResponsePump)
//!   and applies the result.
//!
//! Request handlers may block; they are executed through `tokio::task::spawn_blocking`.
//! Response handlers must not block, they share the pump thread with everything else.

use crate::message::{Request, Response};

/// Executes requests on a worker thread.
pub trait RequestHandler<Q, R>: Send + Sync {
    /// Handle a request. Must always produce a response, even when the work failed.
    fn handle_request(&self, request: Request<Q>) -> Response<R>;
}

/// Consumes responses on the pump thread.
pub trait ResponseHandler<R>: Send + Sync {
    fn handle_response(&self, response: Response<R>);
}
