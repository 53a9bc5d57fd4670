//! Background removal of expired in-memory instances.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::memory::MemoryDiscovery;

/// Spawns a task that reaps expired instances every `interval` until
/// `cancel` flips to `true`.
pub fn spawn_reaper(
    memory: Arc<MemoryDiscovery>,
    interval: Duration,
    mut cancel: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_secs = interval.as_secs(), "Instance reaper started");
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = cancel.changed() => {
                    if *cancel.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let removed = memory.reap_expired();
                    debug!(removed, "Reaper cycle completed");
                }
            }
        }
        info!("Instance reaper stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatehouse_core::traits::Discoverer;
    use gatehouse_core::types::InstanceRegistration;

    #[tokio::test(start_paused = true)]
    async fn test_reaper_removes_and_stops() {
        let memory = Arc::new(MemoryDiscovery::new(Duration::from_secs(2)));
        memory
            .register(&InstanceRegistration::new("user-service", "127.0.0.1", 8001))
            .await
            .unwrap();

        let (tx, rx) = watch::channel(false);
        let handle = spawn_reaper(memory.clone(), Duration::from_secs(1), rx);

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(memory.service_count(), 0);

        tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
