//! # Work Queue
//!
//! This module defines the [`WorkQueue`], the producer half of the work dispatch service.
//!
//! ## Architecture
//!
//! ```text
//!  caller threads ──add_request──▶ WorkQueue ──spawn_blocking──▶ RequestHandler
//!                                                                     │
//!  pump thread ◀──handle_response── ResponsePump ◀──mpsc────────────┘
//! ```
//!
//! The queue and the pump are created together by [`WorkQueue::new`], the same way an actor
//! and its client come out of one constructor. The queue is cheap to clone and may be used
//! from any thread. The pump is not `Clone`: whoever owns it is the one thread that sees
//! responses, so response handlers never race with each other.
//!
//! ## Workers
//!
//! Requests run through `tokio::task::spawn_blocking`, so handlers are free to do blocking
//! I/O. A semaphore with [`WorkQueueConfig::worker_threads`] permits bounds how many run at
//! once; further requests wait for a permit in submission order.

use crate::config::WorkQueueConfig;
use crate::error::WorkQueueError;
use crate::handler::{RequestHandler, ResponseHandler};
use crate::message::{ChannelId, Request, RequestHeader, RequestId};
use crate::pump::ResponsePump;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, Notify, Semaphore};
use tracing::{debug, error, info};

type RequestHandlers<Q, R> = HashMap<ChannelId, Arc<dyn RequestHandler<Q, R>>>;
pub(crate) type ResponseHandlers<R> = HashMap<ChannelId, Arc<dyn ResponseHandler<R>>>;

// The maps only ever hold fully inserted entries, so a poisoned lock is still usable.
pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

struct Shared<Q, R> {
    runtime: Handle,
    request_handlers: RwLock<RequestHandlers<Q, R>>,
    response_handlers: Arc<RwLock<ResponseHandlers<R>>>,
    responses: mpsc::UnboundedSender<crate::Response<R>>,
    workers: Arc<Semaphore>,
    next_id: AtomicU64,
    in_flight: Arc<AtomicUsize>,
    // Signalled when a request ends without producing a response.
    lost: Arc<Notify>,
    shut_down: AtomicBool,
}

/// Multi-producer work queue with typed request (`Q`) and response (`R`) payloads.
pub struct WorkQueue<Q, R> {
    shared: Arc<Shared<Q, R>>,
}

impl<Q, R> Clone for WorkQueue<Q, R> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<Q: Send + 'static, R: Send + 'static> WorkQueue<Q, R> {
    /// Creates a work queue on the given runtime, plus the pump that delivers its responses.
    ///
    /// # Arguments
    ///
    /// * `runtime` - Runtime that hosts the worker tasks. Usually `Handle::current()`.
    /// * `config` - Worker count and response budget.
    pub fn new(runtime: Handle, config: &WorkQueueConfig) -> (Self, ResponsePump<R>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let response_handlers = Arc::new(RwLock::new(HashMap::new()));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let lost = Arc::new(Notify::new());
        let workers = config.effective_worker_threads();

        let queue = Self {
            shared: Arc::new(Shared {
                runtime,
                request_handlers: RwLock::new(HashMap::new()),
                response_handlers: Arc::clone(&response_handlers),
                responses: sender,
                workers: Arc::new(Semaphore::new(workers)),
                next_id: AtomicU64::new(1),
                in_flight: Arc::clone(&in_flight),
                lost: Arc::clone(&lost),
                shut_down: AtomicBool::new(false),
            }),
        };
        let pump = ResponsePump::new(
            receiver,
            response_handlers,
            in_flight,
            lost,
            config.response_time_limit(),
        );
        info!(workers, "Work queue started");
        (queue, pump)
    }

    /// Registers the request handler for `channel`, returning the one it replaced.
    pub fn add_request_handler(
        &self,
        channel: ChannelId,
        handler: Arc<dyn RequestHandler<Q, R>>,
    ) -> Option<Arc<dyn RequestHandler<Q, R>>> {
        debug!(channel, "Request handler registered");
        write(&self.shared.request_handlers).insert(channel, handler)
    }

    pub fn remove_request_handler(
        &self,
        channel: ChannelId,
    ) -> Option<Arc<dyn RequestHandler<Q, R>>> {
        debug!(channel, "Request handler removed");
        write(&self.shared.request_handlers).remove(&channel)
    }

    /// Registers the response handler for `channel`, returning the one it replaced.
    pub fn add_response_handler(
        &self,
        channel: ChannelId,
        handler: Arc<dyn ResponseHandler<R>>,
    ) -> Option<Arc<dyn ResponseHandler<R>>> {
        debug!(channel, "Response handler registered");
        write(&self.shared.response_handlers).insert(channel, handler)
    }

    pub fn remove_response_handler(&self, channel: ChannelId) -> Option<Arc<dyn ResponseHandler<R>>> {
        debug!(channel, "Response handler removed");
        write(&self.shared.response_handlers).remove(&channel)
    }

    /// Submits a request and returns its id without waiting for it to run.
    ///
    /// The request handler registered for `channel` at submission time is the one that
    /// executes it.
    pub fn add_request(
        &self,
        channel: ChannelId,
        request_type: u16,
        data: Q,
    ) -> Result<RequestId, WorkQueueError> {
        if self.is_shut_down() {
            return Err(WorkQueueError::ShutDown);
        }
        let handler = read(&self.shared.request_handlers)
            .get(&channel)
            .cloned()
            .ok_or(WorkQueueError::NoRequestHandler(channel))?;

        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        let request = Request {
            header: RequestHeader {
                id,
                channel,
                request_type,
            },
            data,
        };
        debug!(request_id = id, channel, request_type, "Request queued");

        let workers = Arc::clone(&self.shared.workers);
        let responses = self.shared.responses.clone();
        let in_flight = Arc::clone(&self.shared.in_flight);
        let lost = Arc::clone(&self.shared.lost);
        in_flight.fetch_add(1, Ordering::AcqRel);

        self.shared.runtime.spawn(async move {
            // The semaphore is never closed, so acquiring only fails if that changes.
            let Ok(_permit) = workers.acquire_owned().await else {
                in_flight.fetch_sub(1, Ordering::AcqRel);
                lost.notify_one();
                return;
            };
            let executed = tokio::task::spawn_blocking(move || handler.handle_request(request)).await;
            match executed {
                Ok(response) => {
                    if responses.send(response).is_err() {
                        in_flight.fetch_sub(1, Ordering::AcqRel);
                        debug!(request_id = id, "Response pump gone, response dropped");
                    }
                }
                Err(e) => {
                    in_flight.fetch_sub(1, Ordering::AcqRel);
                    lost.notify_one();
                    error!(request_id = id, channel, error = %e, "Request handler panicked, no response");
                }
            }
        });

        Ok(id)
    }

    /// Number of requests submitted whose responses have not been dispatched yet.
    pub fn pending_requests(&self) -> usize {
        self.shared.in_flight.load(Ordering::Acquire)
    }

    /// Stops accepting requests. Work already queued still delivers its responses.
    pub fn shutdown(&self) {
        if !self.shared.shut_down.swap(true, Ordering::AcqRel) {
            info!(pending = self.pending_requests(), "Work queue shut down");
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.shut_down.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Response;
    use std::sync::Mutex;

    struct Doubler;

    impl RequestHandler<u32, u32> for Doubler {
        fn handle_request(&self, request: Request<u32>) -> Response<u32> {
            if request.data == 0 {
                Response::failure(request.header, 0, "zero is not allowed")
            } else {
                Response::success(request.header, request.data * 2)
            }
        }
    }

    #[derive(Default)]
    struct Collector {
        seen: Mutex<Vec<(RequestId, bool, u32)>>,
    }

    impl ResponseHandler<u32> for Collector {
        fn handle_response(&self, response: Response<u32>) {
            self.seen
                .lock()
                .unwrap()
                .push((response.request_id(), response.success, response.data));
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_request_round_trip() {
        let (queue, mut pump) = WorkQueue::<u32, u32>::new(Handle::current(), &WorkQueueConfig::default());
        let collector = Arc::new(Collector::default());
        queue.add_request_handler(1, Arc::new(Doubler));
        queue.add_response_handler(1, collector.clone());

        let id = queue.add_request(1, 0, 21).unwrap();
        assert!(pump.process_next().await);

        let seen = collector.seen.lock().unwrap();
        assert_eq!(seen.as_slice(), &[(id, true, 42)]);
        assert_eq!(queue.pending_requests(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failure_is_delivered_as_response() {
        let (queue, mut pump) = WorkQueue::<u32, u32>::new(Handle::current(), &WorkQueueConfig::default());
        let collector = Arc::new(Collector::default());
        queue.add_request_handler(1, Arc::new(Doubler));
        queue.add_response_handler(1, collector.clone());

        let id = queue.add_request(1, 0, 0).unwrap();
        assert!(pump.process_next().await);

        assert_eq!(collector.seen.lock().unwrap().as_slice(), &[(id, false, 0)]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_ids_are_unique_and_non_zero() {
        let (queue, _pump) = WorkQueue::<u32, u32>::new(Handle::current(), &WorkQueueConfig::default());
        queue.add_request_handler(1, Arc::new(Doubler));

        let first = queue.add_request(1, 0, 1).unwrap();
        let second = queue.add_request(1, 0, 2).unwrap();
        assert_ne!(first, 0);
        assert!(second > first);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unhandled_channel_is_rejected() {
        let (queue, _pump) = WorkQueue::<u32, u32>::new(Handle::current(), &WorkQueueConfig::default());
        assert_eq!(
            queue.add_request(9, 0, 1),
            Err(WorkQueueError::NoRequestHandler(9))
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_shutdown_rejects_new_requests() {
        let (queue, _pump) = WorkQueue::<u32, u32>::new(Handle::current(), &WorkQueueConfig::default());
        queue.add_request_handler(1, Arc::new(Doubler));
        queue.shutdown();
        queue.shutdown();
        assert_eq!(queue.add_request(1, 0, 1), Err(WorkQueueError::ShutDown));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_removed_handler_no_longer_accepts() {
        let (queue, _pump) = WorkQueue::<u32, u32>::new(Handle::current(), &WorkQueueConfig::default());
        queue.add_request_handler(1, Arc::new(Doubler));
        assert!(queue.remove_request_handler(1).is_some());
        assert!(queue.add_request(1, 0, 1).is_err());
    }
}
