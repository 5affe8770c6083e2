//! # Mock Store & Testing Guide
//!
//! [`MockResourceStore`] implements [`ResourceStore`] entirely in memory. It records every
//! call together with the thread that made it, hands out [`MockResource`]s that count their
//! notifications, and lets a test inject failures with a fluent expectation API:
//!
//! ```rust
//! use resource_queue::mock::{MockResourceStore, StoreOp};
//!
//! let store = MockResourceStore::new()
//!     .with_group("General")
//!     .with_resource_type("Mesh");
//!
//! // The next operation touching "ogrehead.mesh" fails.
//! store.expect_failure("ogrehead.mesh").return_err("file not found");
//!
//! // Only the load step of "robot.mesh" fails; preparing it still works.
//! store.expect_failure("robot.mesh").on(StoreOp::Load).return_err("device lost");
//! ```
//!
//! [`RecordingListener`] collects listener callbacks for later assertions.
//!
//! ## Testing Strategies
//!
//! | Pattern | Threading mode | Drive responses with |
//! |---------|----------------|----------------------|
//! | Dispatch logic only | `Synchronous` | nothing, effects are immediate |
//! | Full round trip | `Background` | `ResponsePump::process_next().await` |
//! | Deferred loads | `SplitPhase` | `ResponsePump::process_next().await` |
//!
//! Use `#[tokio::test(flavor = "multi_thread")]` for anything that goes through a worker; the
//! test body then runs on the test thread, which acts as the main thread.

use crate::error::ResourceError;
use crate::listener::Listener;
use crate::request::OperationResult;
use crate::store::{
    ManualResourceLoader, NameValuePairList, Resource, ResourceHandle, ResourceManager,
    ResourceStore, StoreResult,
};
use crate::tracker::Ticket;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};
use std::time::Duration;

// =============================================================================
// RECORDED CALLS
// =============================================================================

/// Operation family, used to target failure expectations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Initialise,
    Prepare,
    Load,
    Unload,
}

/// One call made into the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    InitialiseGroup(String),
    InitialiseAllGroups,
    PrepareGroup(String),
    LoadGroup(String),
    UnloadGroup(String),
    Prepare {
        resource_type: String,
        name: String,
        group: String,
        background_thread: bool,
    },
    Load {
        resource_type: String,
        name: String,
        group: String,
        background_thread: bool,
    },
    UnloadByName {
        resource_type: String,
        name: String,
    },
    UnloadByHandle {
        resource_type: String,
        handle: ResourceHandle,
    },
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub call: StoreCall,
    pub thread: ThreadId,
}

/// Lifecycle of a group or resource inside the mock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Declared,
    Initialised,
    Prepared,
    Loaded,
    Unloaded,
}

// =============================================================================
// MOCK RESOURCE
// =============================================================================

/// Resource handed out by the mock. Counts its notifications.
#[derive(Debug)]
pub struct MockResource {
    name: String,
    group: String,
    handle: ResourceHandle,
    state: Mutex<LoadState>,
    params: Mutex<Option<NameValuePairList>>,
    preparing_complete: AtomicUsize,
    loading_complete: AtomicUsize,
    last_notified_on: Mutex<Option<ThreadId>>,
}

impl MockResource {
    fn new(name: &str, group: &str, handle: ResourceHandle) -> Self {
        Self {
            name: name.to_string(),
            group: group.to_string(),
            handle,
            state: Mutex::new(LoadState::Declared),
            params: Mutex::new(None),
            preparing_complete: AtomicUsize::new(0),
            loading_complete: AtomicUsize::new(0),
            last_notified_on: Mutex::new(None),
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn state(&self) -> LoadState {
        *self.state.lock().unwrap()
    }

    fn set_state(&self, state: LoadState) {
        *self.state.lock().unwrap() = state;
    }

    /// Load parameters seen by the most recent prepare or load.
    pub fn params(&self) -> Option<NameValuePairList> {
        self.params.lock().unwrap().clone()
    }

    pub fn preparing_complete_count(&self) -> usize {
        self.preparing_complete.load(Ordering::SeqCst)
    }

    pub fn loading_complete_count(&self) -> usize {
        self.loading_complete.load(Ordering::SeqCst)
    }

    /// Thread that delivered the most recent notification.
    pub fn last_notified_on(&self) -> Option<ThreadId> {
        *self.last_notified_on.lock().unwrap()
    }

    fn note_thread(&self) {
        *self.last_notified_on.lock().unwrap() = Some(thread::current().id());
    }
}

impl Resource for MockResource {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self) -> ResourceHandle {
        self.handle
    }

    fn fire_preparing_complete(&self) {
        self.note_thread();
        self.preparing_complete.fetch_add(1, Ordering::SeqCst);
    }

    fn fire_loading_complete(&self) {
        self.note_thread();
        self.loading_complete.fetch_add(1, Ordering::SeqCst);
    }
}

// =============================================================================
// EXPECTATION BUILDER API
// =============================================================================

struct FailureExpectation {
    target: String,
    op: Option<StoreOp>,
    message: String,
}

/// Builder returned by [`MockResourceStore::expect_failure`].
pub struct FailureExpectationBuilder {
    target: String,
    op: Option<StoreOp>,
    expectations: Arc<Mutex<VecDeque<FailureExpectation>>>,
}

impl FailureExpectationBuilder {
    /// Restricts the failure to one operation family.
    pub fn on(mut self, op: StoreOp) -> Self {
        self.op = Some(op);
        self
    }

    /// Makes the matching call fail once with `message`.
    pub fn return_err(self, message: impl Into<String>) {
        self.expectations.lock().unwrap().push_back(FailureExpectation {
            target: self.target,
            op: self.op,
            message: message.into(),
        });
    }
}

// =============================================================================
// MOCK STORE
// =============================================================================

#[derive(Default)]
struct Shared {
    calls: Mutex<Vec<RecordedCall>>,
    expectations: Arc<Mutex<VecDeque<FailureExpectation>>>,
    groups: Mutex<BTreeMap<String, LoadState>>,
    resource_types: Mutex<BTreeSet<String>>,
    resources: Mutex<BTreeMap<String, Arc<MockResource>>>,
    next_handle: AtomicU64,
    latency: Mutex<Option<Duration>>,
}

/// In-memory [`ResourceStore`]. Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct MockResourceStore {
    shared: Arc<Shared>,
}

impl MockResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a resource group.
    pub fn with_group(self, group: &str) -> Self {
        self.shared
            .groups
            .lock()
            .unwrap()
            .insert(group.to_string(), LoadState::Declared);
        self
    }

    /// Registers a resource type tag such as `"Mesh"`.
    pub fn with_resource_type(self, resource_type: &str) -> Self {
        self.shared
            .resource_types
            .lock()
            .unwrap()
            .insert(resource_type.to_string());
        self
    }

    /// Makes every store call sleep, to simulate disk I/O.
    pub fn with_latency(self, latency: Duration) -> Self {
        *self.shared.latency.lock().unwrap() = Some(latency);
        self
    }

    /// Expects the next operation on `target` (a group or resource name) to fail.
    pub fn expect_failure(&self, target: &str) -> FailureExpectationBuilder {
        FailureExpectationBuilder {
            target: target.to_string(),
            op: None,
            expectations: self.shared.expectations.clone(),
        }
    }

    /// Panics if a failure expectation was never triggered.
    pub fn verify(&self) {
        let remaining = self.shared.expectations.lock().unwrap().len();
        if remaining > 0 {
            panic!("Not all failure expectations were met. {} remaining", remaining);
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.shared.calls.lock().unwrap().clone()
    }

    pub fn group_state(&self, group: &str) -> Option<LoadState> {
        self.shared.groups.lock().unwrap().get(group).copied()
    }

    pub fn resource(&self, name: &str) -> Option<Arc<MockResource>> {
        self.shared.resources.lock().unwrap().get(name).cloned()
    }

    fn record(&self, call: StoreCall) {
        let latency = *self.shared.latency.lock().unwrap();
        if let Some(latency) = latency {
            thread::sleep(latency);
        }
        self.shared.calls.lock().unwrap().push(RecordedCall {
            call,
            thread: thread::current().id(),
        });
    }

    fn check_failure(&self, target: &str, op: StoreOp) -> StoreResult<()> {
        let mut expectations = self.shared.expectations.lock().unwrap();
        let position = expectations
            .iter()
            .position(|e| e.target == target && e.op.map_or(true, |o| o == op));
        match position.and_then(|i| expectations.remove(i)) {
            Some(expectation) => Err(ResourceError::Operation(expectation.message)),
            None => Ok(()),
        }
    }

    fn transition_group(&self, group: &str, op: StoreOp, state: LoadState) -> StoreResult<()> {
        self.check_failure(group, op)?;
        let mut groups = self.shared.groups.lock().unwrap();
        let entry = groups
            .get_mut(group)
            .ok_or_else(|| ResourceError::GroupNotFound(group.to_string()))?;
        *entry = state;
        Ok(())
    }

    fn resource_entry(&self, name: &str, group: &str) -> StoreResult<Arc<MockResource>> {
        if !self.shared.groups.lock().unwrap().contains_key(group) {
            return Err(ResourceError::GroupNotFound(group.to_string()));
        }
        let mut resources = self.shared.resources.lock().unwrap();
        let resource = resources.entry(name.to_string()).or_insert_with(|| {
            let handle = self.shared.next_handle.fetch_add(1, Ordering::SeqCst) + 1;
            Arc::new(MockResource::new(name, group, handle))
        });
        Ok(resource.clone())
    }
}

impl ResourceStore for MockResourceStore {
    fn initialise_resource_group(&self, group: &str) -> StoreResult<()> {
        self.record(StoreCall::InitialiseGroup(group.to_string()));
        self.transition_group(group, StoreOp::Initialise, LoadState::Initialised)
    }

    fn initialise_all_resource_groups(&self) -> StoreResult<()> {
        self.record(StoreCall::InitialiseAllGroups);
        let names: Vec<String> = self.shared.groups.lock().unwrap().keys().cloned().collect();
        for group in names {
            self.transition_group(&group, StoreOp::Initialise, LoadState::Initialised)?;
        }
        Ok(())
    }

    fn prepare_resource_group(&self, group: &str) -> StoreResult<()> {
        self.record(StoreCall::PrepareGroup(group.to_string()));
        self.transition_group(group, StoreOp::Prepare, LoadState::Prepared)
    }

    fn load_resource_group(&self, group: &str) -> StoreResult<()> {
        self.record(StoreCall::LoadGroup(group.to_string()));
        self.transition_group(group, StoreOp::Load, LoadState::Loaded)
    }

    fn unload_resource_group(&self, group: &str) -> StoreResult<()> {
        self.record(StoreCall::UnloadGroup(group.to_string()));
        self.transition_group(group, StoreOp::Unload, LoadState::Unloaded)
    }

    fn resource_manager(&self, resource_type: &str) -> StoreResult<Arc<dyn ResourceManager>> {
        if !self.shared.resource_types.lock().unwrap().contains(resource_type) {
            return Err(ResourceError::UnknownResourceType(resource_type.to_string()));
        }
        Ok(Arc::new(MockResourceManager {
            resource_type: resource_type.to_string(),
            store: self.clone(),
        }))
    }
}

struct MockResourceManager {
    resource_type: String,
    store: MockResourceStore,
}

impl MockResourceManager {
    fn run_loader(
        resource: &MockResource,
        is_manual: bool,
        loader: Option<&Arc<dyn ManualResourceLoader>>,
        op: StoreOp,
    ) -> StoreResult<()> {
        if !is_manual {
            return Ok(());
        }
        let loader = loader.ok_or_else(|| {
            ResourceError::Operation(format!(
                "{} is manually loaded but has no loader",
                resource.name
            ))
        })?;
        match op {
            StoreOp::Prepare => loader.prepare_resource(resource),
            _ => loader.load_resource(resource),
        }
    }
}

impl ResourceManager for MockResourceManager {
    fn prepare(
        &self,
        name: &str,
        group: &str,
        is_manual: bool,
        loader: Option<&Arc<dyn ManualResourceLoader>>,
        params: Option<&NameValuePairList>,
        background_thread: bool,
    ) -> StoreResult<Arc<dyn Resource>> {
        self.store.record(StoreCall::Prepare {
            resource_type: self.resource_type.clone(),
            name: name.to_string(),
            group: group.to_string(),
            background_thread,
        });
        self.store.check_failure(name, StoreOp::Prepare)?;
        let resource = self.store.resource_entry(name, group)?;
        Self::run_loader(&resource, is_manual, loader, StoreOp::Prepare)?;
        *resource.params.lock().unwrap() = params.cloned();
        if resource.state() != LoadState::Loaded {
            resource.set_state(LoadState::Prepared);
        }
        if !background_thread {
            resource.fire_preparing_complete();
        }
        Ok(resource)
    }

    fn load(
        &self,
        name: &str,
        group: &str,
        is_manual: bool,
        loader: Option<&Arc<dyn ManualResourceLoader>>,
        params: Option<&NameValuePairList>,
        background_thread: bool,
    ) -> StoreResult<Arc<dyn Resource>> {
        self.store.record(StoreCall::Load {
            resource_type: self.resource_type.clone(),
            name: name.to_string(),
            group: group.to_string(),
            background_thread,
        });
        self.store.check_failure(name, StoreOp::Load)?;
        let resource = self.store.resource_entry(name, group)?;
        Self::run_loader(&resource, is_manual, loader, StoreOp::Load)?;
        *resource.params.lock().unwrap() = params.cloned();
        resource.set_state(LoadState::Loaded);
        if !background_thread {
            resource.fire_loading_complete();
        }
        Ok(resource)
    }

    fn unload_by_name(&self, name: &str) -> StoreResult<()> {
        self.store.record(StoreCall::UnloadByName {
            resource_type: self.resource_type.clone(),
            name: name.to_string(),
        });
        self.store.check_failure(name, StoreOp::Unload)?;
        let resource = self
            .store
            .resource(name)
            .ok_or_else(|| ResourceError::ResourceNotFound(name.to_string()))?;
        resource.set_state(LoadState::Unloaded);
        Ok(())
    }

    fn unload_by_handle(&self, handle: ResourceHandle) -> StoreResult<()> {
        self.store.record(StoreCall::UnloadByHandle {
            resource_type: self.resource_type.clone(),
            handle,
        });
        let resource = self
            .store
            .shared
            .resources
            .lock()
            .unwrap()
            .values()
            .find(|r| r.handle == handle)
            .cloned()
            .ok_or_else(|| ResourceError::ResourceNotFound(format!("handle {handle}")))?;
        self.store.check_failure(&resource.name, StoreOp::Unload)?;
        resource.set_state(LoadState::Unloaded);
        Ok(())
    }
}

// =============================================================================
// RECORDING LISTENER
// =============================================================================

/// One listener callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerEvent {
    pub ticket: Ticket,
    pub result: OperationResult,
    pub thread: ThreadId,
}

/// [`Listener`] that remembers every callback.
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: Mutex<Vec<ListenerEvent>>,
}

impl RecordingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<ListenerEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn events_for(&self, ticket: Ticket) -> Vec<ListenerEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.ticket == ticket)
            .collect()
    }
}

impl Listener for RecordingListener {
    fn operation_completed(&self, ticket: Ticket, result: &OperationResult) {
        self.events.lock().unwrap().push(ListenerEvent {
            ticket,
            result: result.clone(),
            thread: thread::current().id(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MockResourceStore {
        MockResourceStore::new()
            .with_group("General")
            .with_resource_type("Mesh")
    }

    #[test]
    fn test_unknown_type_and_group() {
        let store = store();
        assert_eq!(
            store.resource_manager("Font").err(),
            Some(ResourceError::UnknownResourceType("Font".into()))
        );
        assert_eq!(
            store.load_resource_group("Missing"),
            Err(ResourceError::GroupNotFound("Missing".into()))
        );
    }

    #[test]
    fn test_foreground_load_fires_its_own_notification() {
        let store = store();
        let manager = store.resource_manager("Mesh").unwrap();
        let resource = manager
            .load("ogrehead.mesh", "General", false, None, None, false)
            .unwrap();
        assert_eq!(resource.name(), "ogrehead.mesh");

        let mock = store.resource("ogrehead.mesh").unwrap();
        assert_eq!(mock.state(), LoadState::Loaded);
        assert_eq!(mock.loading_complete_count(), 1);
    }

    #[test]
    fn test_failure_expectation_is_consumed_once() {
        let store = store();
        store.expect_failure("General").on(StoreOp::Load).return_err("corrupt");

        assert!(store.prepare_resource_group("General").is_ok());
        assert_eq!(
            store.load_resource_group("General"),
            Err(ResourceError::Operation("corrupt".into()))
        );
        assert!(store.load_resource_group("General").is_ok());
        store.verify();
    }

    #[test]
    fn test_manual_resource_without_loader_fails() {
        let store = store();
        let manager = store.resource_manager("Mesh").unwrap();
        let err = manager
            .prepare("procedural", "General", true, None, None, true)
            .err()
            .unwrap();
        assert!(err.to_string().contains("no loader"));
    }

    #[test]
    fn test_unload_by_handle() {
        let store = store();
        let manager = store.resource_manager("Mesh").unwrap();
        let handle = manager
            .load("a.mesh", "General", false, None, None, false)
            .unwrap()
            .handle();
        manager.unload_by_handle(handle).unwrap();
        assert_eq!(store.resource("a.mesh").unwrap().state(), LoadState::Unloaded);
        assert!(manager.unload_by_handle(999).is_err());
    }
}
