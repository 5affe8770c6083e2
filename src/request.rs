//! # Operation Model
//!
//! This module defines what travels through the work queue on the resource channel.
//!
//! Each queued operation is a [`ResourceOperation`] variant carrying only the fields its kind
//! needs. It is wrapped in a [`ResourceRequest`] together with the optional caller
//! [`Listener`] and the [`OperationResult`] slot the worker fills in. The worker answers with
//! a [`ResourceResponse`], which hands the request back along with the resource it touched.
//!
//! Loaders and load parameters are `Arc`s: the request keeps them alive across the hop to
//! the worker and until the response has been processed.

use crate::listener::Listener;
use crate::store::{ManualResourceLoader, NameValuePairList, Resource, ResourceHandle};
use std::fmt;
use std::sync::Arc;

/// Request-type code sent with every request on the resource channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum OperationKind {
    InitialiseGroup = 0,
    InitialiseAllGroups = 1,
    PrepareGroup = 2,
    LoadGroup = 3,
    UnloadGroup = 4,
    PrepareResource = 5,
    LoadResource = 6,
    UnloadResource = 7,
}

impl OperationKind {
    pub fn code(self) -> u16 {
        self as u16
    }
}

/// Identifies one resource to prepare or load.
#[derive(Clone)]
pub struct ResourceSpec {
    pub resource_type: String,
    pub name: String,
    pub group: String,
    pub is_manual: bool,
    pub loader: Option<Arc<dyn ManualResourceLoader>>,
    pub params: Option<Arc<NameValuePairList>>,
}

impl ResourceSpec {
    pub fn new(
        resource_type: impl Into<String>,
        name: impl Into<String>,
        group: impl Into<String>,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
            group: group.into(),
            is_manual: false,
            loader: None,
            params: None,
        }
    }

    /// Marks the resource as manually created, loaded through `loader`.
    pub fn manual(mut self, loader: Arc<dyn ManualResourceLoader>) -> Self {
        self.is_manual = true;
        self.loader = Some(loader);
        self
    }

    pub fn with_params(mut self, params: Arc<NameValuePairList>) -> Self {
        self.params = Some(params);
        self
    }
}

impl fmt::Debug for ResourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceSpec")
            .field("resource_type", &self.resource_type)
            .field("name", &self.name)
            .field("group", &self.group)
            .field("is_manual", &self.is_manual)
            .field("loader", &self.loader.is_some())
            .field("params", &self.params)
            .finish()
    }
}

/// One asynchronous unit of work against the resource store.
#[derive(Debug, Clone)]
pub enum ResourceOperation {
    InitialiseGroup {
        group: String,
    },
    InitialiseAllGroups,
    PrepareGroup {
        group: String,
    },
    LoadGroup {
        group: String,
    },
    UnloadGroup {
        group: String,
    },
    PrepareResource(ResourceSpec),
    LoadResource(ResourceSpec),
    /// Unloads by `name` when it is non-empty, otherwise by `handle`.
    UnloadResource {
        resource_type: String,
        name: String,
        handle: ResourceHandle,
    },
}

impl ResourceOperation {
    pub fn kind(&self) -> OperationKind {
        match self {
            ResourceOperation::InitialiseGroup { .. } => OperationKind::InitialiseGroup,
            ResourceOperation::InitialiseAllGroups => OperationKind::InitialiseAllGroups,
            ResourceOperation::PrepareGroup { .. } => OperationKind::PrepareGroup,
            ResourceOperation::LoadGroup { .. } => OperationKind::LoadGroup,
            ResourceOperation::UnloadGroup { .. } => OperationKind::UnloadGroup,
            ResourceOperation::PrepareResource(_) => OperationKind::PrepareResource,
            ResourceOperation::LoadResource(_) => OperationKind::LoadResource,
            ResourceOperation::UnloadResource { .. } => OperationKind::UnloadResource,
        }
    }
}

/// Outcome of an operation, as reported to the listener.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationResult {
    pub error: bool,
    pub message: String,
}

impl OperationResult {
    pub fn success() -> Self {
        Self::default()
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            error: true,
            message: message.into(),
        }
    }
}

/// Payload of a request on the resource channel.
#[derive(Clone)]
pub struct ResourceRequest {
    pub operation: ResourceOperation,
    pub listener: Option<Arc<dyn Listener>>,
    pub result: OperationResult,
}

impl ResourceRequest {
    pub fn new(operation: ResourceOperation, listener: Option<Arc<dyn Listener>>) -> Self {
        Self {
            operation,
            listener,
            result: OperationResult::default(),
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.operation.kind()
    }
}

impl fmt::Debug for ResourceRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceRequest")
            .field("operation", &self.operation)
            .field("listener", &self.listener.is_some())
            .field("result", &self.result)
            .finish()
    }
}

/// Payload of a response on the resource channel.
#[derive(Debug)]
pub struct ResourceResponse {
    /// The resource that was prepared or loaded; `None` for group and unload operations.
    pub resource: Option<Arc<dyn Resource>>,
    pub request: ResourceRequest,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_codes_are_stable() {
        let spec = ResourceSpec::new("Mesh", "ogrehead.mesh", "General");
        assert_eq!(ResourceOperation::InitialiseAllGroups.kind().code(), 1);
        assert_eq!(ResourceOperation::LoadResource(spec.clone()).kind().code(), 6);
        assert_eq!(ResourceOperation::PrepareResource(spec).kind(), OperationKind::PrepareResource);
    }

    #[test]
    fn test_new_request_has_clean_result() {
        let request = ResourceRequest::new(ResourceOperation::InitialiseAllGroups, None);
        assert!(!request.result.error);
        assert!(request.result.message.is_empty());
    }

    #[test]
    fn test_debug_hides_loader_contents() {
        struct Noop;
        impl ManualResourceLoader for Noop {
            fn load_resource(&self, _: &dyn Resource) -> crate::store::StoreResult<()> {
                Ok(())
            }
        }
        let spec = ResourceSpec::new("Texture", "checker", "General").manual(Arc::new(Noop));
        let printed = format!("{spec:?}");
        assert!(printed.contains("loader: true"));
        assert!(spec.is_manual);
    }
}
