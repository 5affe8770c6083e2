//! # Work Queue
//!
//! A typed, channel-based work dispatch service built on Tokio.
//!
//! Subsystems register a [`RequestHandler`] and a [`ResponseHandler`] on a channel they own.
//! Callers submit requests from any thread with [`WorkQueue::add_request`]; each request runs
//! on a blocking worker and its [`Response`] comes back through the [`ResponsePump`], on
//! whichever single thread drives the pump.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use work_queue::{Request, RequestHandler, Response, ResponseHandler, WorkQueue, WorkQueueConfig};
//!
//! struct Upper;
//! impl RequestHandler<String, String> for Upper {
//!     fn handle_request(&self, request: Request<String>) -> Response<String> {
//!         Response::success(request.header, request.data.to_uppercase())
//!     }
//! }
//!
//! struct Print;
//! impl ResponseHandler<String> for Print {
//!     fn handle_response(&self, response: Response<String>) {
//!         println!("#{} -> {}", response.request_id(), response.data);
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let (queue, mut pump) = WorkQueue::<String, String>::new(
//!         tokio::runtime::Handle::current(),
//!         &WorkQueueConfig::default(),
//!     );
//!     queue.add_request_handler(1, Arc::new(Upper));
//!     queue.add_response_handler(1, Arc::new(Print));
//!
//!     queue.add_request(1, 0, "hello".to_string()).unwrap();
//!     pump.process_next().await;
//! }
//! ```
//!
//! ## Concurrency Model
//!
//! - Submission never blocks: it allocates an id and spawns a task.
//! - Request handlers run on Tokio's blocking pool, at most `worker_threads` at a time.
//! - Response handlers run one at a time on the pump thread, so state touched only by them
//!   needs no locking.
//! - No ordering is promised between requests; with one worker they complete in
//!   submission order.

pub mod config;
pub mod error;
pub mod handler;
pub mod message;
pub mod pump;
pub mod queue;
pub mod tracing;

pub use config::WorkQueueConfig;
pub use error::WorkQueueError;
pub use handler::{RequestHandler, ResponseHandler};
pub use message::{ChannelId, Request, RequestHeader, RequestId, Response, MAX_USER_CHANNEL};
pub use pump::ResponsePump;
pub use queue::WorkQueue;
