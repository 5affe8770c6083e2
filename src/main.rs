use resource_queue::config::QueueConfig;
use resource_queue::error::QueueError;
use resource_queue::lifecycle::{setup_tracing, ResourceSystem};
use resource_queue::listener::Listener;
use resource_queue::mock::MockResourceStore;
use resource_queue::request::{OperationResult, ResourceSpec};
use resource_queue::store::Resource;
use resource_queue::tracker::Ticket;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, info_span, warn, Instrument};

#[tokio::main]
async fn main() -> Result<(), QueueError> {
    setup_tracing();

    let config = QueueConfig::from_env();
    let store = MockResourceStore::new()
        .with_group("General")
        .with_group("Terrain")
        .with_resource_type("Mesh")
        .with_resource_type("Texture")
        .with_latency(Duration::from_millis(20));
    store
        .expect_failure("missing.mesh")
        .return_err("file not found");

    let (system, mut pump) = ResourceSystem::start(Arc::new(store.clone()), &config)?;

    let listener: Arc<dyn Listener> = Arc::new(|ticket: Ticket, result: &OperationResult| {
        if result.error {
            warn!(ticket, error = %result.message, "Operation failed");
        } else {
            info!(ticket, "Operation complete");
        }
    });

    async {
        let queue = &system.queue;
        queue.initialise_all_resource_groups(Some(listener.clone()))?;
        queue.prepare_resource_group("Terrain", Some(listener.clone()))?;

        let params = Arc::new(BTreeMap::from([("lod".to_string(), "2".to_string())]));
        queue.load(
            ResourceSpec::new("Mesh", "ogrehead.mesh", "General").with_params(params),
            Some(listener.clone()),
        )?;
        queue.prepare(
            ResourceSpec::new("Texture", "rock.png", "Terrain"),
            Some(listener.clone()),
        )?;

        // Synchronous mode reports this failure right here instead of through the listener.
        if let Err(e) = queue.load(
            ResourceSpec::new("Mesh", "missing.mesh", "General"),
            Some(listener.clone()),
        ) {
            warn!(error = %e, "Load rejected");
        }

        while queue.outstanding_count() > 0 {
            if !pump.process_next().await {
                break;
            }
        }

        queue.unload("Mesh", "ogrehead.mesh", Some(listener.clone()))?;
        Ok::<_, QueueError>(())
    }
    .instrument(info_span!("demo", mode = ?config.threading_mode))
    .await?;

    if let Some(mesh) = store.resource("ogrehead.mesh") {
        info!(
            resource = mesh.name(),
            loading_complete = mesh.loading_complete_count(),
            "Final notification count"
        );
    }

    system.shutdown(&mut pump).await;
    Ok(())
}
