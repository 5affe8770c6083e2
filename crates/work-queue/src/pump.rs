//! # Response Pump
//!
//! The consumer half of the work queue. Whichever thread owns the [`ResponsePump`] is the
//! thread on which every [`ResponseHandler`](crate::ResponseHandler) runs. In a game loop
//! that is the main thread calling [`ResponsePump::process_responses`] once per frame; in an
//! async application it is the task awaiting [`ResponsePump::process_next`].

use crate::message::Response;
use crate::queue::{read, ResponseHandlers};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Notify};
use tracing::{debug, warn};

/// Delivers completed responses to their channel's response handler.
pub struct ResponsePump<R> {
    receiver: mpsc::UnboundedReceiver<Response<R>>,
    handlers: Arc<RwLock<ResponseHandlers<R>>>,
    in_flight: Arc<AtomicUsize>,
    lost: Arc<Notify>,
    time_limit: Option<Duration>,
}

impl<R> ResponsePump<R> {
    pub(crate) fn new(
        receiver: mpsc::UnboundedReceiver<Response<R>>,
        handlers: Arc<RwLock<ResponseHandlers<R>>>,
        in_flight: Arc<AtomicUsize>,
        lost: Arc<Notify>,
        time_limit: Option<Duration>,
    ) -> Self {
        Self {
            receiver,
            handlers,
            in_flight,
            lost,
            time_limit,
        }
    }

    /// Dispatches every response that is already available, without waiting.
    ///
    /// Stops early once the configured time budget is spent; at least one response is
    /// always processed when one is ready. Returns how many responses were dispatched.
    pub fn process_responses(&mut self) -> usize {
        let started = Instant::now();
        let mut processed = 0;
        loop {
            if let Some(limit) = self.time_limit {
                if processed > 0 && started.elapsed() >= limit {
                    debug!(processed, "Response budget spent");
                    break;
                }
            }
            match self.receiver.try_recv() {
                Ok(response) => {
                    self.dispatch(response);
                    processed += 1;
                }
                Err(_) => break,
            }
        }
        processed
    }

    /// Waits for the next response and dispatches it.
    ///
    /// Returns `false` once every [`WorkQueue`](crate::WorkQueue) handle is dropped and no
    /// request is left in flight, or when the last request in flight ended without a
    /// response (its handler panicked).
    pub async fn process_next(&mut self) -> bool {
        loop {
            tokio::select! {
                biased;
                received = self.receiver.recv() => {
                    return match received {
                        Some(response) => {
                            self.dispatch(response);
                            true
                        }
                        None => false,
                    };
                }
                _ = self.lost.notified() => {
                    if self.pending() == 0 {
                        debug!("Last request in flight was lost");
                        return false;
                    }
                }
            }
        }
    }

    /// Number of submitted requests whose responses have not been dispatched yet.
    pub fn pending(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    fn dispatch(&self, response: Response<R>) {
        let header = response.header;
        // Clone out of the map so a handler may (de)register handlers while running.
        let handler = read(&self.handlers).get(&header.channel).cloned();
        match handler {
            Some(handler) => {
                debug!(
                    request_id = header.id,
                    channel = header.channel,
                    success = response.success,
                    "Response delivered"
                );
                handler.handle_response(response);
            }
            None => warn!(
                request_id = header.id,
                channel = header.channel,
                "No response handler, response dropped"
            ),
        }
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}
