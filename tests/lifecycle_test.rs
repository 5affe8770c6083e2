use resource_queue::config::{QueueConfig, ThreadingMode};
use resource_queue::error::QueueError;
use resource_queue::lifecycle::ResourceSystem;
use resource_queue::mock::{MockResourceStore, RecordingListener};
use resource_queue::queue::{LifecycleState, ResourceBackgroundQueue};
use resource_queue::request::ResourceSpec;
use resource_queue::store::{ManualResourceLoader, Resource, StoreResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use work_queue::{WorkQueue, WorkQueueConfig, WorkQueueError};

fn queue(store: MockResourceStore) -> ResourceBackgroundQueue {
    let (work_queue, _pump) = WorkQueue::new(Handle::current(), &WorkQueueConfig::default());
    ResourceBackgroundQueue::new(work_queue, Arc::new(store), ThreadingMode::Background)
}

#[tokio::test]
async fn test_dispatch_before_initialise_is_rejected() {
    let queue = queue(MockResourceStore::new().with_group("General"));

    assert_eq!(queue.state(), LifecycleState::Uninitialised);
    assert!(matches!(
        queue.load_resource_group("General", None),
        Err(QueueError::NotInitialised)
    ));
}

#[tokio::test]
async fn test_shutdown_is_idempotent_and_final() {
    let queue = queue(MockResourceStore::new().with_group("General"));
    queue.initialise().unwrap();
    queue.initialise().unwrap();
    assert_eq!(queue.state(), LifecycleState::Initialised);

    queue.shutdown();
    queue.shutdown();

    assert_eq!(queue.state(), LifecycleState::ShutDown);
    assert!(matches!(
        queue.load_resource_group("General", None),
        Err(QueueError::ShutDown)
    ));
    assert!(matches!(queue.initialise(), Err(QueueError::ShutDown)));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_system_shutdown_drains_in_flight_work() {
    let store = MockResourceStore::new()
        .with_group("General")
        .with_group("Terrain")
        .with_latency(Duration::from_millis(20));
    let (system, mut pump) =
        ResourceSystem::start(Arc::new(store), &QueueConfig::default()).unwrap();
    let listener = RecordingListener::new();

    system
        .queue
        .prepare_resource_group("General", Some(listener.clone()))
        .unwrap();
    system
        .queue
        .load_resource_group("Terrain", Some(listener.clone()))
        .unwrap();

    assert_eq!(system.shutdown(&mut pump).await, 2);
    assert_eq!(listener.events().len(), 2);
    assert!(listener.events().iter().all(|e| !e.result.error));
}

#[tokio::test]
async fn test_work_queue_shutdown_surfaces_as_dispatch_error() {
    let store = MockResourceStore::new().with_group("General");
    let (work_queue, _pump) = WorkQueue::new(Handle::current(), &WorkQueueConfig::default());
    let queue = ResourceBackgroundQueue::new(
        work_queue.clone(),
        Arc::new(store),
        ThreadingMode::Background,
    );
    queue.initialise().unwrap();
    work_queue.shutdown();

    assert!(matches!(
        queue.unload_resource_group("General", None),
        Err(QueueError::Dispatch(WorkQueueError::ShutDown))
    ));
    assert_eq!(queue.outstanding_count(), 0);
}

#[test]
fn test_start_outside_runtime_fails() {
    let result = ResourceSystem::start(
        Arc::new(MockResourceStore::new()),
        &QueueConfig::default(),
    );
    assert!(matches!(result, Err(QueueError::NoRuntime(_))));
}

struct PanickingLoader;

impl ManualResourceLoader for PanickingLoader {
    fn load_resource(&self, _resource: &dyn Resource) -> StoreResult<()> {
        panic!("loader crashed");
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_shutdown_completes_when_a_loader_panics() {
    let store = MockResourceStore::new()
        .with_group("General")
        .with_resource_type("Mesh")
        .with_latency(Duration::from_millis(100));
    let (system, mut pump) =
        ResourceSystem::start(Arc::new(store), &QueueConfig::default()).unwrap();
    let listener = RecordingListener::new();

    system
        .queue
        .load(
            ResourceSpec::new("Mesh", "proc", "General").manual(Arc::new(PanickingLoader)),
            Some(listener.clone()),
        )
        .unwrap();

    let drained = tokio::time::timeout(Duration::from_secs(3), system.shutdown(&mut pump))
        .await
        .expect("Shutdown hung");
    assert_eq!(drained, 1);

    let events = listener.events();
    assert_eq!(events.len(), 1);
    assert!(events[0].result.error);
}
