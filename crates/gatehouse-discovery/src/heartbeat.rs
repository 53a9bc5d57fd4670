//! Keep-alive loop for a self-registered instance.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use gatehouse_core::types::InstanceRegistration;

use crate::registry::ServiceRegistry;

/// Spawns a task that heartbeats `registration` every `interval` until
/// `cancel` flips to `true`. Failed beats are logged and retried on the
/// next tick.
pub fn spawn_heartbeat(
    registry: Arc<ServiceRegistry>,
    registration: InstanceRegistration,
    interval: Duration,
    mut cancel: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            service = %registration.service,
            interval_secs = interval.as_secs(),
            "Heartbeat loop started"
        );
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
                    match registry.heartbeat(&registration).await {
                        Ok(()) => debug!(service = %registration.service, "Heartbeat sent"),
                        Err(e) => warn!(
                            service = %registration.service,
                            kind = %e.kind,
                            error = %e.message,
                            "Heartbeat failed"
                        ),
                    }
                }
            }
        }
        info!(service = %registration.service, "Heartbeat loop stopped");
    })
}
