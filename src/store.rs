//! # Resource Store Contract
//!
//! The queue never touches resources, files or parsers directly. It sequences calls into a
//! [`ResourceStore`], which owns resource groups, and into the per-type [`ResourceManager`]s
//! the store hands out. All calls are synchronous and may block; the queue decides which
//! thread they run on.
//!
//! Implementations must be `Send + Sync`: worker threads call into the store concurrently
//! with the thread that finishes split-phase loads.

use crate::error::ResourceError;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Numeric handle identifying a loaded resource within its manager.
pub type ResourceHandle = u64;

/// Immutable key/value load parameters.
pub type NameValuePairList = BTreeMap<String, String>;

pub type StoreResult<T> = Result<T, ResourceError>;

/// A resource object owned by the store.
pub trait Resource: Send + Sync {
    fn name(&self) -> &str;

    fn handle(&self) -> ResourceHandle;

    /// Notifies the resource's own listeners that background preparation finished.
    fn fire_preparing_complete(&self);

    /// Notifies the resource's own listeners that background loading finished.
    fn fire_loading_complete(&self);
}

impl fmt::Debug for dyn Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("name", &self.name())
            .field("handle", &self.handle())
            .finish()
    }
}

/// Custom loader for resources created by hand rather than from a file.
pub trait ManualResourceLoader: Send + Sync {
    fn prepare_resource(&self, _resource: &dyn Resource) -> StoreResult<()> {
        Ok(())
    }

    fn load_resource(&self, resource: &dyn Resource) -> StoreResult<()>;
}

/// Operations on the resources of one type.
pub trait ResourceManager: Send + Sync {
    /// Stages a resource (reads and decodes it) without performing the final load.
    ///
    /// `background_thread` is true when the queue drives the call; the manager then leaves
    /// the completion notification to the queue.
    fn prepare(
        &self,
        name: &str,
        group: &str,
        is_manual: bool,
        loader: Option<&Arc<dyn ManualResourceLoader>>,
        params: Option<&NameValuePairList>,
        background_thread: bool,
    ) -> StoreResult<Arc<dyn Resource>>;

    /// Fully loads a resource. `background_thread` has the same meaning as for
    /// [`prepare`](Self::prepare).
    fn load(
        &self,
        name: &str,
        group: &str,
        is_manual: bool,
        loader: Option<&Arc<dyn ManualResourceLoader>>,
        params: Option<&NameValuePairList>,
        background_thread: bool,
    ) -> StoreResult<Arc<dyn Resource>>;

    fn unload_by_name(&self, name: &str) -> StoreResult<()>;

    fn unload_by_handle(&self, handle: ResourceHandle) -> StoreResult<()>;
}

/// Owner of resource groups and of the resource-type registry.
pub trait ResourceStore: Send + Sync {
    fn initialise_resource_group(&self, group: &str) -> StoreResult<()>;

    fn initialise_all_resource_groups(&self) -> StoreResult<()>;

    fn prepare_resource_group(&self, group: &str) -> StoreResult<()>;

    fn load_resource_group(&self, group: &str) -> StoreResult<()>;

    fn unload_resource_group(&self, group: &str) -> StoreResult<()>;

    /// Looks up the manager registered for a resource type tag such as `"Mesh"`.
    fn resource_manager(&self, resource_type: &str) -> StoreResult<Arc<dyn ResourceManager>>;
}
