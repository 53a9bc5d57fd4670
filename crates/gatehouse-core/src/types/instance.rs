//! Service instance records.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Weight used when the `weight` metadata entry is missing or unparsable.
pub const DEFAULT_WEIGHT: u32 = 10;

/// One addressable replica of a service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceInstance {
    /// Backend-assigned or generated instance id.
    pub instance_id: String,
    /// Service name.
    pub service: String,
    /// Host or IP address.
    pub host: String,
    /// Port.
    pub port: u16,
    /// Free-form metadata (`version`, `weight`, `cluster`, `group`).
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Whether the instance may receive traffic.
    pub healthy: bool,
}

impl ServiceInstance {
    /// `host:port`.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Selection weight from metadata.
    pub fn weight(&self) -> u32 {
        self.metadata
            .get("weight")
            .and_then(|w| w.parse::<f64>().ok())
            .filter(|w| w.is_finite() && *w >= 0.0)
            .map(|w| w.round() as u32)
            .unwrap_or(DEFAULT_WEIGHT)
    }
}

/// Input to a registration or heartbeat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceRegistration {
    /// Service name.
    pub service: String,
    /// Host or IP address.
    pub host: String,
    /// Port.
    pub port: u16,
    /// Metadata (`version`, `weight`, `cluster`, `group`).
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl InstanceRegistration {
    /// Create a registration without metadata.
    pub fn new(service: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            service: service.into(),
            host: host.into(),
            port,
            metadata: HashMap::new(),
        }
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Selection weight requested by the metadata.
    pub fn weight(&self) -> u32 {
        self.metadata
            .get("weight")
            .and_then(|w| w.parse::<f64>().ok())
            .filter(|w| w.is_finite() && *w >= 0.0)
            .map(|w| w.round() as u32)
            .unwrap_or(DEFAULT_WEIGHT)
    }
}
