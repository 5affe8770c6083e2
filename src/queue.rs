//! # Resource Background Queue
//!
//! The caller-facing service. Every operation returns a [`Ticket`] straight away; the work
//! happens on a worker and completion is reported on the pump thread, through the caller's
//! [`Listener`] and through [`ResourceBackgroundQueue::is_process_complete`].
//!
//! ## Lifecycle
//!
//! ```text
//! Uninitialised ──initialise()──▶ Initialised ──shutdown()──▶ ShutDown
//! ```
//!
//! `initialise` registers the queue on [`RESOURCE_CHANNEL`] as both request and response
//! handler; `shutdown` removes both and also runs on drop. Operations are only accepted while
//! initialised.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use resource_queue::config::ThreadingMode;
//! use resource_queue::mock::MockResourceStore;
//! use resource_queue::queue::ResourceBackgroundQueue;
//! use work_queue::{WorkQueue, WorkQueueConfig};
//!
//! #[tokio::main(flavor = "multi_thread")]
//! async fn main() {
//!     let store = MockResourceStore::new().with_group("Terrain");
//!     let (work_queue, mut pump) =
//!         WorkQueue::new(tokio::runtime::Handle::current(), &WorkQueueConfig::default());
//!     let queue = ResourceBackgroundQueue::new(work_queue, Arc::new(store), ThreadingMode::Background);
//!     queue.initialise().unwrap();
//!
//!     let ticket = queue.prepare_resource_group("Terrain", None).unwrap();
//!     while !queue.is_process_complete(ticket) {
//!         pump.process_next().await;
//!     }
//! }
//! ```

use crate::config::ThreadingMode;
use crate::error::QueueError;
use crate::handler::{ExecutionSite, QueueCore};
use crate::listener::Listener;
use crate::request::{ResourceOperation, ResourceRequest, ResourceResponse, ResourceSpec};
use crate::store::{ResourceHandle, ResourceStore};
use crate::tracker::{Ticket, SYNCHRONOUS_TICKET};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};
use work_queue::{ChannelId, ResponsePump, WorkQueue, MAX_USER_CHANNEL};

/// Channel reserved for resource loading, just above the host application's range.
pub const RESOURCE_CHANNEL: ChannelId = MAX_USER_CHANNEL + 1;

/// Work queue specialised for the resource channel.
pub type ResourceWorkQueue = WorkQueue<ResourceRequest, ResourceResponse>;

/// Pump delivering resource responses.
pub type ResourcePump = ResponsePump<ResourceResponse>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialised,
    Initialised,
    ShutDown,
}

/// Queues resource operations on a work queue and reconciles their results.
pub struct ResourceBackgroundQueue {
    core: Arc<QueueCore>,
    work_queue: ResourceWorkQueue,
    state: Mutex<LifecycleState>,
}

impl ResourceBackgroundQueue {
    /// Creates the queue. The store and the work queue must already be usable.
    pub fn new(
        work_queue: ResourceWorkQueue,
        store: Arc<dyn ResourceStore>,
        mode: ThreadingMode,
    ) -> Self {
        Self {
            core: Arc::new(QueueCore::new(store, mode)),
            work_queue,
            state: Mutex::new(LifecycleState::Uninitialised),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, LifecycleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers the request and response handlers on [`RESOURCE_CHANNEL`].
    ///
    /// Calling it again while initialised does nothing.
    pub fn initialise(&self) -> Result<(), QueueError> {
        let mut state = self.lock_state();
        match *state {
            LifecycleState::Initialised => Ok(()),
            LifecycleState::ShutDown => Err(QueueError::ShutDown),
            LifecycleState::Uninitialised => {
                self.work_queue
                    .add_response_handler(RESOURCE_CHANNEL, self.core.clone());
                self.work_queue
                    .add_request_handler(RESOURCE_CHANNEL, self.core.clone());
                *state = LifecycleState::Initialised;
                info!(channel = RESOURCE_CHANNEL, mode = ?self.core.mode(), "Resource queue initialised");
                Ok(())
            }
        }
    }

    /// Deregisters the handlers. Idempotent.
    ///
    /// Requests already executing still finish, but their responses are no longer
    /// delivered to this queue.
    pub fn shutdown(&self) {
        let mut state = self.lock_state();
        if *state == LifecycleState::Initialised {
            self.work_queue.remove_request_handler(RESOURCE_CHANNEL);
            self.work_queue.remove_response_handler(RESOURCE_CHANNEL);
            info!(outstanding = self.core.tracker.len(), "Resource queue shut down");
        }
        *state = LifecycleState::ShutDown;
    }

    pub fn state(&self) -> LifecycleState {
        *self.lock_state()
    }

    pub fn threading_mode(&self) -> ThreadingMode {
        self.core.mode()
    }

    /// Dispatches any operation.
    ///
    /// In [`ThreadingMode::Synchronous`] the store call runs here and now, its error (if any)
    /// is returned directly, the listener is not used and [`SYNCHRONOUS_TICKET`] comes back.
    /// Otherwise the operation is queued and its ticket returned without waiting.
    pub fn submit(
        &self,
        operation: ResourceOperation,
        listener: Option<Arc<dyn Listener>>,
    ) -> Result<Ticket, QueueError> {
        match self.state() {
            LifecycleState::Initialised => {}
            LifecycleState::Uninitialised => return Err(QueueError::NotInitialised),
            LifecycleState::ShutDown => return Err(QueueError::ShutDown),
        }
        let kind = operation.kind();

        if self.core.mode() == ThreadingMode::Synchronous {
            self.core.execute(&operation, ExecutionSite::Caller)?;
            debug!(?kind, "Completed synchronously");
            return Ok(SYNCHRONOUS_TICKET);
        }

        let request = ResourceRequest::new(operation, listener);
        let ticket = self.core.tracker.track_with(|| {
            self.work_queue
                .add_request(RESOURCE_CHANNEL, kind.code(), request)
        })?;
        debug!(ticket, ?kind, "Queued");
        Ok(ticket)
    }

    pub fn initialise_resource_group(
        &self,
        group: &str,
        listener: Option<Arc<dyn Listener>>,
    ) -> Result<Ticket, QueueError> {
        self.submit(
            ResourceOperation::InitialiseGroup {
                group: group.to_string(),
            },
            listener,
        )
    }

    pub fn initialise_all_resource_groups(
        &self,
        listener: Option<Arc<dyn Listener>>,
    ) -> Result<Ticket, QueueError> {
        self.submit(ResourceOperation::InitialiseAllGroups, listener)
    }

    pub fn prepare_resource_group(
        &self,
        group: &str,
        listener: Option<Arc<dyn Listener>>,
    ) -> Result<Ticket, QueueError> {
        self.submit(
            ResourceOperation::PrepareGroup {
                group: group.to_string(),
            },
            listener,
        )
    }

    /// Loads a whole group. In split-phase mode the worker prepares and the pump thread loads.
    pub fn load_resource_group(
        &self,
        group: &str,
        listener: Option<Arc<dyn Listener>>,
    ) -> Result<Ticket, QueueError> {
        self.submit(
            ResourceOperation::LoadGroup {
                group: group.to_string(),
            },
            listener,
        )
    }

    pub fn unload_resource_group(
        &self,
        group: &str,
        listener: Option<Arc<dyn Listener>>,
    ) -> Result<Ticket, QueueError> {
        self.submit(
            ResourceOperation::UnloadGroup {
                group: group.to_string(),
            },
            listener,
        )
    }

    pub fn prepare(
        &self,
        spec: ResourceSpec,
        listener: Option<Arc<dyn Listener>>,
    ) -> Result<Ticket, QueueError> {
        self.submit(ResourceOperation::PrepareResource(spec), listener)
    }

    /// Loads one resource. In split-phase mode the worker prepares and the pump thread loads.
    pub fn load(
        &self,
        spec: ResourceSpec,
        listener: Option<Arc<dyn Listener>>,
    ) -> Result<Ticket, QueueError> {
        self.submit(ResourceOperation::LoadResource(spec), listener)
    }

    pub fn unload(
        &self,
        resource_type: &str,
        name: &str,
        listener: Option<Arc<dyn Listener>>,
    ) -> Result<Ticket, QueueError> {
        self.submit(
            ResourceOperation::UnloadResource {
                resource_type: resource_type.to_string(),
                name: name.to_string(),
                handle: 0,
            },
            listener,
        )
    }

    pub fn unload_by_handle(
        &self,
        resource_type: &str,
        handle: ResourceHandle,
        listener: Option<Arc<dyn Listener>>,
    ) -> Result<Ticket, QueueError> {
        self.submit(
            ResourceOperation::UnloadResource {
                resource_type: resource_type.to_string(),
                name: String::new(),
                handle,
            },
            listener,
        )
    }

    /// True unless the ticket is still waiting for its response.
    ///
    /// Unknown tickets and [`SYNCHRONOUS_TICKET`] also report true: the answer means
    /// "not provably pending", not "known to have succeeded".
    pub fn is_process_complete(&self, ticket: Ticket) -> bool {
        !self.core.tracker.contains(ticket)
    }

    /// Number of tickets still waiting for their response.
    pub fn outstanding_count(&self) -> usize {
        self.core.tracker.len()
    }
}

impl Drop for ResourceBackgroundQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Drives `pump` until `ticket` completes. Convenience for async callers and tests.
pub async fn wait_for(queue: &ResourceBackgroundQueue, pump: &mut ResourcePump, ticket: Ticket) {
    while !queue.is_process_complete(ticket) {
        if !pump.process_next().await {
            break;
        }
    }
}
