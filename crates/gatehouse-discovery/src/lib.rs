//! # gatehouse-discovery
//!
//! Tracks live instances of named services. The [`ServiceRegistry`] wraps a
//! [`Discoverer`](gatehouse_core::traits::Discoverer) backend, applies
//! lookup deadlines and filters to healthy instances.
//!
//! Backends:
//! - [`MemoryDiscovery`]: in-process, heartbeat TTL health, reaped by
//!   [`reaper::spawn_reaper`].
//! - [`NacosDiscovery`]: Nacos naming service over its HTTP Open API.
//!
//! A self-registered server keeps its entry alive with
//! [`heartbeat::spawn_heartbeat`].

pub mod heartbeat;
pub mod memory;
pub mod nacos;
pub mod reaper;
pub mod registry;

use std::sync::Arc;
use std::time::Duration;

use gatehouse_core::config::discovery::{DiscoveryConfig, DiscoveryProvider};
use gatehouse_core::error::AppError;
use gatehouse_core::traits::Discoverer;

pub use memory::MemoryDiscovery;
pub use nacos::NacosDiscovery;
pub use registry::ServiceRegistry;

/// Backend handles produced by [`build_registry`].
#[derive(Debug, Clone)]
pub struct DiscoveryHandles {
    /// The registry used by the gateway and bootstrap.
    pub registry: Arc<ServiceRegistry>,
    /// Set when the memory backend is active, for the reaper.
    pub memory: Option<Arc<MemoryDiscovery>>,
}

/// Builds the registry for the configured provider and seeds static
/// instances.
pub fn build_registry(config: &DiscoveryConfig) -> Result<DiscoveryHandles, AppError> {
    let timeout = Duration::from_millis(config.timeout_ms);

    match config.provider {
        DiscoveryProvider::Memory => {
            let memory = Arc::new(MemoryDiscovery::new(Duration::from_secs(
                config.heartbeat_ttl_seconds,
            )));
            for entry in &config.static_instances {
                let mut registration = gatehouse_core::types::InstanceRegistration::new(
                    entry.service.clone(),
                    entry.host.clone(),
                    entry.port,
                );
                registration.metadata = entry.metadata.clone();
                memory.register_static(&registration);
            }
            let discoverer: Arc<dyn Discoverer> = memory.clone();
            Ok(DiscoveryHandles {
                registry: Arc::new(ServiceRegistry::new(discoverer, timeout)),
                memory: Some(memory),
            })
        }
        DiscoveryProvider::Nacos => {
            let nacos = NacosDiscovery::new(&config.nacos, timeout)?;
            Ok(DiscoveryHandles {
                registry: Arc::new(ServiceRegistry::new(Arc::new(nacos), timeout)),
                memory: None,
            })
        }
    }
}
