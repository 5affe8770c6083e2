use crate::config::QueueConfig;
use crate::error::QueueError;
use crate::queue::{ResourceBackgroundQueue, ResourcePump, ResourceWorkQueue};
use crate::store::ResourceStore;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::info;
use work_queue::WorkQueue;

/// Owns the work queue and the background queue built on it.
///
/// `ResourceSystem` is responsible for:
/// - **Wiring**: creating the work queue on the current Tokio runtime and registering the
///   background queue on its channel
/// - **Shutdown ordering**: rejecting new work, draining what is in flight, then
///   deregistering
///
/// The [`ResourcePump`] is handed back separately. Whoever holds it is the main thread.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use resource_queue::config::QueueConfig;
/// use resource_queue::lifecycle::ResourceSystem;
/// use resource_queue::mock::MockResourceStore;
///
/// #[tokio::main(flavor = "multi_thread")]
/// async fn main() {
///     let store = MockResourceStore::new().with_group("General");
///     let (system, mut pump) =
///         ResourceSystem::start(Arc::new(store), &QueueConfig::default()).unwrap();
///
///     system.queue.load_resource_group("General", None).unwrap();
///     let drained = system.shutdown(&mut pump).await;
///     assert_eq!(drained, 1);
/// }
/// ```
pub struct ResourceSystem {
    /// The dispatch API.
    pub queue: ResourceBackgroundQueue,

    work_queue: ResourceWorkQueue,
}

impl ResourceSystem {
    /// Starts the stack on the current Tokio runtime.
    ///
    /// Fails with [`QueueError::NoRuntime`] when called outside a runtime.
    pub fn start(
        store: Arc<dyn ResourceStore>,
        config: &QueueConfig,
    ) -> Result<(Self, ResourcePump), QueueError> {
        let runtime = Handle::try_current()?;
        let (work_queue, pump) = WorkQueue::new(runtime, &config.work_queue);

        let queue = ResourceBackgroundQueue::new(work_queue.clone(), store, config.threading_mode);
        queue.initialise()?;

        info!(
            mode = ?config.threading_mode,
            workers = config.work_queue.effective_worker_threads(),
            "Resource system started"
        );
        Ok((Self { queue, work_queue }, pump))
    }

    /// Shuts the system down.
    ///
    /// New submissions are rejected at once. Responses still in flight are pumped so their
    /// listeners run, then the background queue is deregistered. Returns the number of
    /// responses drained.
    pub async fn shutdown(self, pump: &mut ResourcePump) -> usize {
        info!(pending = pump.pending(), "Shutting down resource system...");
        self.work_queue.shutdown();

        let mut drained = 0;
        while pump.pending() > 0 {
            if !pump.process_next().await {
                break;
            }
            drained += 1;
        }

        self.queue.shutdown();
        info!(drained, "Resource system shutdown complete.");
        drained
    }
}
