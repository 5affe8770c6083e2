//! Startup and shutdown of the resource loading stack.
//!
//! - [`ResourceSystem`] builds the work queue, wires the background queue onto it and tears
//!   both down in order.
//! - [`setup_tracing`] is re-exported from the work queue for binaries.

pub mod resource_system;

pub use resource_system::*;
pub use work_queue::tracing::setup_tracing;
