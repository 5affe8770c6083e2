//! # Request Execution & Response Completion
//!
//! [`QueueCore`] is registered on the resource channel as both request handler and response
//! handler.
//!
//! ## Worker side
//!
//! [`RequestHandler::handle_request`] unpacks the [`ResourceRequest`], runs the matching store
//! call and always answers, even when the store failed or panicked. In
//! [`ThreadingMode::SplitPhase`] `LoadGroup` and `LoadResource` are downgraded to their prepare
//! equivalents.
//!
//! ## Pump side
//!
//! [`ResponseHandler::handle_response`] applies a response in this order:
//!
//! 1. Split-phase only: finish the deferred load of `LoadResource` / `LoadGroup`.
//! 2. Remove the ticket from the tracker. This is the only place tickets are removed, and it
//!    happens for failed responses too.
//! 3. If a resource came back and nothing failed, fire its "loading complete" (for
//!    `LoadResource`) or "preparing complete" notification.
//! 4. Invoke the caller's listener, if any, with the result slot.

use crate::config::ThreadingMode;
use crate::error::ResourceError;
use crate::request::{OperationKind, OperationResult, ResourceOperation, ResourceRequest, ResourceResponse};
use crate::store::{Resource, ResourceStore, StoreResult};
use crate::tracker::TicketTracker;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, warn};
use work_queue::{Request, RequestHandler, Response, ResponseHandler};

/// Which thread a store call is made from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExecutionSite {
    /// The thread that issued the operation (synchronous mode).
    Caller,
    /// A work queue worker.
    Worker,
}

/// State shared by the dispatch API, the worker side and the pump side.
pub(crate) struct QueueCore {
    store: Arc<dyn ResourceStore>,
    mode: ThreadingMode,
    pub(crate) tracker: TicketTracker,
}

impl QueueCore {
    pub(crate) fn new(store: Arc<dyn ResourceStore>, mode: ThreadingMode) -> Self {
        Self {
            store,
            mode,
            tracker: TicketTracker::new(),
        }
    }

    pub(crate) fn mode(&self) -> ThreadingMode {
        self.mode
    }

    /// Runs one operation against the store.
    ///
    /// Returns the resource that was prepared or loaded, `None` for everything else.
    pub(crate) fn execute(
        &self,
        operation: &ResourceOperation,
        site: ExecutionSite,
    ) -> StoreResult<Option<Arc<dyn Resource>>> {
        let background = site == ExecutionSite::Worker;
        let split = background && self.mode == ThreadingMode::SplitPhase;

        match operation {
            ResourceOperation::InitialiseGroup { group } => {
                self.store.initialise_resource_group(group)?;
            }
            ResourceOperation::InitialiseAllGroups => {
                self.store.initialise_all_resource_groups()?;
            }
            ResourceOperation::PrepareGroup { group } => {
                self.store.prepare_resource_group(group)?;
            }
            ResourceOperation::LoadGroup { group } if split => {
                self.store.prepare_resource_group(group)?;
            }
            ResourceOperation::LoadGroup { group } => {
                self.store.load_resource_group(group)?;
            }
            ResourceOperation::UnloadGroup { group } => {
                self.store.unload_resource_group(group)?;
            }
            ResourceOperation::PrepareResource(spec) => {
                let manager = self.store.resource_manager(&spec.resource_type)?;
                let resource = manager.prepare(
                    &spec.name,
                    &spec.group,
                    spec.is_manual,
                    spec.loader.as_ref(),
                    spec.params.as_deref(),
                    background,
                )?;
                return Ok(Some(resource));
            }
            ResourceOperation::LoadResource(spec) => {
                let manager = self.store.resource_manager(&spec.resource_type)?;
                let resource = if split {
                    manager.prepare(
                        &spec.name,
                        &spec.group,
                        spec.is_manual,
                        spec.loader.as_ref(),
                        spec.params.as_deref(),
                        true,
                    )?
                } else {
                    manager.load(
                        &spec.name,
                        &spec.group,
                        spec.is_manual,
                        spec.loader.as_ref(),
                        spec.params.as_deref(),
                        background,
                    )?
                };
                return Ok(Some(resource));
            }
            ResourceOperation::UnloadResource {
                resource_type,
                name,
                handle,
            } => {
                let manager = self.store.resource_manager(resource_type)?;
                if name.is_empty() {
                    manager.unload_by_handle(*handle)?;
                } else {
                    manager.unload_by_name(name)?;
                }
            }
        }
        Ok(None)
    }

    /// Completes a load that the worker only prepared. Runs on the pump thread.
    fn finish_split_load(
        &self,
        operation: &ResourceOperation,
    ) -> StoreResult<Option<Arc<dyn Resource>>> {
        match operation {
            ResourceOperation::LoadResource(spec) => {
                let manager = self.store.resource_manager(&spec.resource_type)?;
                let resource = manager.load(
                    &spec.name,
                    &spec.group,
                    spec.is_manual,
                    spec.loader.as_ref(),
                    spec.params.as_deref(),
                    true,
                )?;
                Ok(Some(resource))
            }
            ResourceOperation::LoadGroup { group } => {
                self.store.load_resource_group(group)?;
                Ok(None)
            }
            _ => Ok(None),
        }
    }
}

/// Runs a store call, reporting a panic in the store or a loader as a failed operation.
fn contain_panic<T>(call: impl FnOnce() -> StoreResult<T>) -> StoreResult<T> {
    panic::catch_unwind(AssertUnwindSafe(call)).unwrap_or_else(|payload| {
        let reason = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown cause".to_string());
        error!(%reason, "Store call panicked");
        Err(ResourceError::Operation(format!("Operation panicked: {reason}")))
    })
}

impl RequestHandler<ResourceRequest, ResourceResponse> for QueueCore {
    fn handle_request(&self, request: Request<ResourceRequest>) -> Response<ResourceResponse> {
        let Request {
            header,
            data: mut request,
        } = request;
        let ticket = header.id;
        let kind = request.kind();
        debug!(ticket, ?kind, "Executing");

        let executed = contain_panic(|| self.execute(&request.operation, ExecutionSite::Worker));
        match executed {
            Ok(resource) => {
                request.result = OperationResult::success();
                Response::success(header, ResourceResponse { resource, request })
            }
            Err(e) => {
                let message = e.to_string();
                warn!(ticket, ?kind, error = %message, "Operation failed");
                request.result = OperationResult::failure(message.clone());
                Response::failure(
                    header,
                    ResourceResponse {
                        resource: None,
                        request,
                    },
                    message,
                )
            }
        }
    }
}

impl ResponseHandler<ResourceResponse> for QueueCore {
    fn handle_response(&self, response: Response<ResourceResponse>) {
        let ticket = response.request_id();
        let succeeded = response.succeeded();
        let ResourceResponse {
            mut resource,
            mut request,
        } = response.data;
        let kind = request.kind();

        if succeeded && self.mode == ThreadingMode::SplitPhase {
            match contain_panic(|| self.finish_split_load(&request.operation)) {
                Ok(Some(loaded)) => resource = Some(loaded),
                Ok(None) => {}
                Err(e) => {
                    warn!(ticket, ?kind, error = %e, "Deferred load failed");
                    request.result = OperationResult::failure(e.to_string());
                }
            }
        }

        self.tracker.remove(ticket);

        if !request.result.error {
            if let Some(resource) = &resource {
                if kind == OperationKind::LoadResource {
                    resource.fire_loading_complete();
                } else {
                    resource.fire_preparing_complete();
                }
            }
        }

        if let Some(listener) = &request.listener {
            listener.operation_completed(ticket, &request.result);
        }

        debug!(ticket, ?kind, error = request.result.error, "Completed");
    }
}
