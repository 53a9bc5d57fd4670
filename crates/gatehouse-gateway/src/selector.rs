//! Instance selection policies.

use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;

use gatehouse_core::config::gateway::SelectionPolicy;
use gatehouse_core::types::instance::ServiceInstance;

/// Picks one instance from a healthy list.
#[derive(Debug)]
pub struct InstanceSelector {
    policy: SelectionPolicy,
    counters: DashMap<String, AtomicUsize>,
}

impl InstanceSelector {
    /// Creates a selector for `policy`.
    pub fn new(policy: SelectionPolicy) -> Self {
        Self {
            policy,
            counters: DashMap::new(),
        }
    }

    /// The active policy.
    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    /// Selects an instance of `service`, or `None` when the list is empty.
    pub fn select<'a>(
        &self,
        service: &str,
        instances: &'a [ServiceInstance],
    ) -> Option<&'a ServiceInstance> {
        if instances.is_empty() {
            return None;
        }
        match self.policy {
            SelectionPolicy::First => instances.first(),
            SelectionPolicy::RoundRobin => {
                let n = self.next(service);
                instances.get(n % instances.len())
            }
            SelectionPolicy::Weighted => {
                let total: usize = instances.iter().map(|i| i.weight() as usize).sum();
                let n = self.next(service);
                if total == 0 {
                    return instances.get(n % instances.len());
                }
                let mut slot = n % total;
                instances.iter().find(|i| {
                    let weight = i.weight() as usize;
                    if slot < weight {
                        true
                    } else {
                        slot -= weight;
                        false
                    }
                })
            }
        }
    }

    fn next(&self, service: &str) -> usize {
        if let Some(counter) = self.counters.get(service) {
            return counter.fetch_add(1, Ordering::Relaxed);
        }
        self.counters
            .entry(service.to_string())
            .or_insert_with(|| AtomicUsize::new(0))
            .fetch_add(1, Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn instance(port: u16, weight: Option<&str>) -> ServiceInstance {
        let mut metadata = HashMap::new();
        if let Some(w) = weight {
            metadata.insert("weight".to_string(), w.to_string());
        }
        ServiceInstance {
            instance_id: port.to_string(),
            service: "user-service".to_string(),
            host: "127.0.0.1".to_string(),
            port,
            metadata,
            healthy: true,
        }
    }

    #[test]
    fn test_empty_list() {
        let selector = InstanceSelector::new(SelectionPolicy::RoundRobin);
        assert!(selector.select("user-service", &[]).is_none());
    }

    #[test]
    fn test_first() {
        let selector = InstanceSelector::new(SelectionPolicy::First);
        let instances = vec![instance(1, None), instance(2, None)];
        for _ in 0..3 {
            assert_eq!(selector.select("user-service", &instances).unwrap().port, 1);
        }
    }

    #[test]
    fn test_round_robin() {
        let selector = InstanceSelector::new(SelectionPolicy::RoundRobin);
        let instances = vec![instance(1, None), instance(2, None), instance(3, None)];
        let ports: Vec<u16> = (0..6)
            .map(|_| selector.select("user-service", &instances).unwrap().port)
            .collect();
        assert_eq!(ports, vec![1, 2, 3, 1, 2, 3]);
    }

    #[test]
    fn test_weighted_distribution() {
        let selector = InstanceSelector::new(SelectionPolicy::Weighted);
        let instances = vec![instance(1, Some("3")), instance(2, Some("1"))];
        let mut counts = HashMap::new();
        for _ in 0..8 {
            let port = selector.select("user-service", &instances).unwrap().port;
            *counts.entry(port).or_insert(0) += 1;
        }
        assert_eq!(counts[&1], 6);
        assert_eq!(counts[&2], 2);
    }

    #[test]
    fn test_weighted_all_zero_falls_back() {
        let selector = InstanceSelector::new(SelectionPolicy::Weighted);
        let instances = vec![instance(1, Some("0")), instance(2, Some("0"))];
        assert!(selector.select("user-service", &instances).is_some());
    }
}
