//! In-process discovery backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use gatehouse_core::result::AppResult;
use gatehouse_core::traits::Discoverer;
use gatehouse_core::types::instance::{InstanceRegistration, ServiceInstance};

#[derive(Debug, Clone)]
struct InstanceRecord {
    instance_id: String,
    registration: InstanceRegistration,
    last_heartbeat: Instant,
    /// Static instances never expire.
    pinned: bool,
}

impl InstanceRecord {
    fn matches(&self, host: &str, port: u16) -> bool {
        self.registration.host == host && self.registration.port == port
    }

    fn is_alive(&self, now: Instant, ttl: Duration) -> bool {
        self.pinned || now.saturating_duration_since(self.last_heartbeat) < ttl
    }
}

/// Registry held in process memory.
///
/// Each service maps to an immutable instance list that is replaced
/// wholesale on every change, so readers always see a consistent list.
#[derive(Debug)]
pub struct MemoryDiscovery {
    services: DashMap<String, Arc<Vec<InstanceRecord>>>,
    ttl: Duration,
}

impl MemoryDiscovery {
    /// Creates an empty registry with the given heartbeat TTL.
    pub fn new(ttl: Duration) -> Self {
        Self {
            services: DashMap::new(),
            ttl,
        }
    }

    /// Registers an instance that never expires.
    pub fn register_static(&self, registration: &InstanceRegistration) {
        self.upsert(registration, true);
        info!(
            service = %registration.service,
            host = %registration.host,
            port = registration.port,
            "Static instance registered"
        );
    }

    /// Removes every instance whose heartbeat is older than the TTL.
    ///
    /// Returns the number of instances removed.
    pub fn reap_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        for mut entry in self.services.iter_mut() {
            let current = entry.value();
            let alive: Vec<InstanceRecord> = current
                .iter()
                .filter(|r| r.is_alive(now, self.ttl))
                .cloned()
                .collect();
            if alive.len() != current.len() {
                removed += current.len() - alive.len();
                *entry.value_mut() = Arc::new(alive);
            }
        }
        self.services.retain(|_, list| !list.is_empty());
        if removed > 0 {
            info!(removed, "Expired instances reaped");
        }
        removed
    }

    /// Number of services with at least one instance.
    pub fn service_count(&self) -> usize {
        self.services.len()
    }

    fn upsert(&self, registration: &InstanceRegistration, pinned: bool) {
        let mut entry = self
            .services
            .entry(registration.service.clone())
            .or_insert_with(|| Arc::new(Vec::new()));

        let mut next: Vec<InstanceRecord> = entry.value().as_ref().clone();
        let instance_id = match next
            .iter()
            .position(|r| r.matches(&registration.host, registration.port))
        {
            Some(idx) => next.remove(idx).instance_id,
            None => Uuid::new_v4().to_string(),
        };
        next.push(InstanceRecord {
            instance_id,
            registration: registration.clone(),
            last_heartbeat: Instant::now(),
            pinned,
        });
        *entry.value_mut() = Arc::new(next);
    }
}

#[async_trait]
impl Discoverer for MemoryDiscovery {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn register(&self, registration: &InstanceRegistration) -> AppResult<()> {
        self.upsert(registration, false);
        debug!(
            service = %registration.service,
            host = %registration.host,
            port = registration.port,
            "Instance registered"
        );
        Ok(())
    }

    async fn deregister(&self, registration: &InstanceRegistration) -> AppResult<()> {
        let service = registration.service.as_str();
        let (host, port) = (registration.host.as_str(), registration.port);
        if let Some(mut entry) = self.services.get_mut(service) {
            let next: Vec<InstanceRecord> = entry
                .value()
                .iter()
                .filter(|r| !r.matches(host, port))
                .cloned()
                .collect();
            *entry.value_mut() = Arc::new(next);
        }
        self.services.remove_if(service, |_, list| list.is_empty());
        debug!(service, host, port, "Instance deregistered");
        Ok(())
    }

    async fn heartbeat(&self, registration: &InstanceRegistration) -> AppResult<()> {
        let refreshed = self
            .services
            .get_mut(&registration.service)
            .map(|mut entry| {
                let mut next: Vec<InstanceRecord> = entry.value().as_ref().clone();
                let found = match next
                    .iter_mut()
                    .find(|r| r.matches(&registration.host, registration.port))
                {
                    Some(record) => {
                        record.last_heartbeat = Instant::now();
                        true
                    }
                    None => false,
                };
                if found {
                    *entry.value_mut() = Arc::new(next);
                }
                found
            })
            .unwrap_or(false);

        if !refreshed {
            self.upsert(registration, false);
        }
        Ok(())
    }

    async fn instances(&self, service: &str) -> AppResult<Vec<ServiceInstance>> {
        let Some(list) = self.services.get(service).map(|e| Arc::clone(e.value())) else {
            return Ok(Vec::new());
        };
        let now = Instant::now();
        Ok(list
            .iter()
            .map(|record| ServiceInstance {
                instance_id: record.instance_id.clone(),
                service: record.registration.service.clone(),
                host: record.registration.host.clone(),
                port: record.registration.port,
                metadata: record.registration.metadata.clone(),
                healthy: record.is_alive(now, self.ttl),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(port: u16) -> InstanceRegistration {
        InstanceRegistration::new("user-service", "127.0.0.1", port)
    }

    #[tokio::test]
    async fn test_register_and_list() {
        let memory = MemoryDiscovery::new(Duration::from_secs(10));
        memory.register(&registration(8001)).await.unwrap();
        memory.register(&registration(8002)).await.unwrap();
        let instances = memory.instances("user-service").await.unwrap();
        assert_eq!(instances.len(), 2);
        assert!(instances.iter().all(|i| i.healthy));
    }

    #[tokio::test]
    async fn test_reregister_keeps_instance_id() {
        let memory = MemoryDiscovery::new(Duration::from_secs(10));
        memory.register(&registration(8001)).await.unwrap();
        let first = memory.instances("user-service").await.unwrap()[0].instance_id.clone();
        memory.register(&registration(8001)).await.unwrap();
        let instances = memory.instances("user-service").await.unwrap();
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].instance_id, first);
    }

    #[tokio::test]
    async fn test_deregister() {
        let memory = MemoryDiscovery::new(Duration::from_secs(10));
        memory.register(&registration(8001)).await.unwrap();
        memory.deregister(&registration(8001)).await.unwrap();
        assert!(memory.instances("user-service").await.unwrap().is_empty());
        assert_eq!(memory.service_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_ttl_and_reaper() {
        let memory = MemoryDiscovery::new(Duration::from_secs(10));
        memory.register(&registration(8001)).await.unwrap();
        memory.register(&registration(8002)).await.unwrap();

        tokio::time::advance(Duration::from_secs(6)).await;
        memory.heartbeat(&registration(8002)).await.unwrap();
        tokio::time::advance(Duration::from_secs(6)).await;

        let instances = memory.instances("user-service").await.unwrap();
        let healthy: Vec<u16> = instances.iter().filter(|i| i.healthy).map(|i| i.port).collect();
        assert_eq!(healthy, vec![8002]);

        assert_eq!(memory.reap_expired(), 1);
        assert_eq!(memory.instances("user-service").await.unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_static_instances_never_expire() {
        let memory = MemoryDiscovery::new(Duration::from_secs(1));
        memory.register_static(&registration(9000));
        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(memory.reap_expired(), 0);
        assert!(memory.instances("user-service").await.unwrap()[0].healthy);
    }

    #[tokio::test]
    async fn test_heartbeat_for_unknown_registers() {
        let memory = MemoryDiscovery::new(Duration::from_secs(10));
        memory.heartbeat(&registration(8003)).await.unwrap();
        assert_eq!(memory.instances("user-service").await.unwrap().len(), 1);
    }
}
