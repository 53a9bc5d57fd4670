//! Deadline-bounded, health-filtered view over a discovery backend.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use gatehouse_core::error::{AppError, ErrorKind};
use gatehouse_core::traits::Discoverer;
use gatehouse_core::types::instance::{InstanceRegistration, ServiceInstance};

/// The registry the gateway and bootstrap talk to.
#[derive(Debug, Clone)]
pub struct ServiceRegistry {
    discoverer: Arc<dyn Discoverer>,
    timeout: Duration,
}

impl ServiceRegistry {
    /// Wraps `discoverer`; lookups use `timeout` unless overridden.
    pub fn new(discoverer: Arc<dyn Discoverer>, timeout: Duration) -> Self {
        Self {
            discoverer,
            timeout,
        }
    }

    /// Name of the active backend.
    pub fn backend(&self) -> &'static str {
        self.discoverer.name()
    }

    /// Default lookup deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Registers an instance and waits for the backend to confirm.
    pub async fn register(&self, registration: &InstanceRegistration) -> Result<(), AppError> {
        self.bounded(self.discoverer.register(registration), self.timeout)
            .await?;
        info!(
            backend = self.backend(),
            service = %registration.service,
            host = %registration.host,
            port = registration.port,
            "Service registered"
        );
        Ok(())
    }

    /// Registers in the background; failures are only logged.
    pub fn register_detached(&self, registration: InstanceRegistration) {
        let registry = self.clone();
        tokio::spawn(async move {
            if let Err(e) = registry.register(&registration).await {
                error!(
                    service = %registration.service,
                    error = %e,
                    "Background registration failed"
                );
            }
        });
    }

    /// Removes an instance.
    pub async fn deregister(&self, registration: &InstanceRegistration) -> Result<(), AppError> {
        self.bounded(self.discoverer.deregister(registration), self.timeout)
            .await?;
        info!(
            backend = self.backend(),
            service = %registration.service,
            host = %registration.host,
            port = registration.port,
            "Service deregistered"
        );
        Ok(())
    }

    /// Refreshes the liveness of a registered instance.
    pub async fn heartbeat(&self, registration: &InstanceRegistration) -> Result<(), AppError> {
        self.bounded(self.discoverer.heartbeat(registration), self.timeout)
            .await
    }

    /// Healthy instances of `service`, bounded by the default deadline.
    ///
    /// A service with no healthy instances yields an empty list.
    pub async fn instances(&self, service: &str) -> Result<Vec<ServiceInstance>, AppError> {
        self.instances_with_timeout(service, self.timeout).await
    }

    /// Healthy instances of `service` with an explicit deadline.
    pub async fn instances_with_timeout(
        &self,
        service: &str,
        timeout: Duration,
    ) -> Result<Vec<ServiceInstance>, AppError> {
        let all = self
            .bounded(self.discoverer.instances(service), timeout)
            .await
            .inspect_err(|e| {
                warn!(service, kind = %e.kind, error = %e.message, "Instance lookup failed");
            })?;
        Ok(all.into_iter().filter(|i| i.healthy).collect())
    }

    /// Applies a deadline and maps backend failures to `DiscoveryUnavailable`.
    async fn bounded<T, F>(&self, call: F, timeout: Duration) -> Result<T, AppError>
    where
        F: std::future::Future<Output = Result<T, AppError>>,
    {
        match tokio::time::timeout(timeout, call).await {
            Err(_) => Err(AppError::timeout(format!(
                "{} discovery call exceeded {}ms",
                self.backend(),
                timeout.as_millis()
            ))),
            Ok(Err(e)) if matches!(e.kind, ErrorKind::Timeout | ErrorKind::DiscoveryUnavailable) => {
                Err(e)
            }
            Ok(Err(e)) => Err(AppError::discovery_unavailable(format!(
                "{} discovery failed: {}",
                self.backend(),
                e.message
            ))),
            Ok(Ok(value)) => Ok(value),
        }
    }
}
