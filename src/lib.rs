//! # Resource Queue
//!
//! > **Load resources off the main thread, finish them on it.**
//!
//! This crate queues resource operations (initialise, prepare, load and unload of resource
//! groups and single resources) onto a [`work_queue`] worker pool, and reports completion
//! back on the one thread that drives the response pump.
//!
//! ## 🏗️ Design
//!
//! Three kinds of thread are involved:
//!
//! - **Callers** (any number) submit operations and get a [`Ticket`](tracker::Ticket) back
//!   straight away.
//! - **Workers** run the blocking store calls.
//! - **The main thread** owns the [`ResourcePump`](queue::ResourcePump). Ticket bookkeeping,
//!   split-phase load finishing and every listener callback happen there, so listener state
//!   needs no locking.
//!
//! ```text
//! caller ──submit──▶ WorkQueue ──worker──▶ ResourceStore
//!                                             │
//! listener ◀── QueueCore::handle_response ◀── ResourcePump (main thread)
//! ```
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Service ([`queue`])
//! - **Role**: The caller-facing API and its lifecycle.
//! - **Key items**: [`ResourceBackgroundQueue`](queue::ResourceBackgroundQueue),
//!   [`wait_for`](queue::wait_for).
//!
//! ### 2. The Contract ([`store`])
//! - **Role**: What the queue needs from the resource system underneath it.
//! - **Key items**: [`ResourceStore`](store::ResourceStore),
//!   [`ResourceManager`](store::ResourceManager), [`Resource`](store::Resource).
//!
//! ### 3. The Messages ([`request`], [`listener`], [`tracker`])
//! - **Role**: Operations, results, completion callbacks and ticket bookkeeping.
//!
//! ### 4. The Orchestrator ([`lifecycle`])
//! - **Role**: Builds the work queue and the background queue and shuts them down in order.
//! - **Key items**: [`ResourceSystem`](lifecycle::ResourceSystem).
//!
//! ### 5. Testing ([`mock`])
//! An in-memory store that records calls and injects failures. See the module guide.
//!
//! ## 🚀 Quick Start
//!
//! ```bash
//! # Run the demo with per-request logs
//! RUST_LOG=debug cargo run
//!
//! # Defer final loads to the main thread
//! RESOURCE_QUEUE_THREADING=split RUST_LOG=info cargo run
//! ```

pub mod config;
pub mod error;
mod handler;
pub mod lifecycle;
pub mod listener;
pub mod mock;
pub mod queue;
pub mod request;
pub mod store;
pub mod tracker;

pub use config::{QueueConfig, ThreadingMode};
pub use error::{QueueError, ResourceError};
pub use listener::Listener;
pub use queue::ResourceBackgroundQueue;
pub use tracker::Ticket;
