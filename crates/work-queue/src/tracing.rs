//! # Observability & Tracing
//!
//! Structured logging setup shared by every binary built on the work queue.
//!
//! The queue logs with `tracing` and structured fields:
//!
//! - **Queue lifecycle**: handler registration, shutdown
//! - **Request flow**: `request_id`, `channel` and `request_type` on submit and delivery
//! - **Problems**: dropped responses, panicking handlers
//!
//! ```bash
//! RUST_LOG=info cargo run      # Lifecycle only
//! RUST_LOG=debug cargo run     # Every request and response
//! ```

/// Initializes the global tracing subscriber.
///
/// Uses `RUST_LOG` for filtering and a compact format without module paths.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
