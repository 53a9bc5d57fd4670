//! Service discovery configuration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Which discovery backend the registry talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryProvider {
    /// In-process registry with heartbeat TTL expiry.
    #[default]
    Memory,
    /// Nacos naming service over its HTTP Open API.
    Nacos,
}

/// Service discovery configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Backend selection.
    #[serde(default)]
    pub provider: DiscoveryProvider,
    /// Deadline for a single instance lookup, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Instances without a heartbeat for this long are unhealthy.
    #[serde(default = "default_heartbeat_ttl")]
    pub heartbeat_ttl_seconds: u64,
    /// How often the memory backend removes expired instances.
    #[serde(default = "default_reaper_interval")]
    pub reaper_interval_seconds: u64,
    /// Nacos connection settings.
    #[serde(default)]
    pub nacos: NacosConfig,
    /// Register this process at startup.
    #[serde(default)]
    pub register_self: bool,
    /// Service name used for self-registration.
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Address advertised for self-registration.
    #[serde(default = "default_advertise_host")]
    pub advertise_host: String,
    /// Port advertised for self-registration; `None` uses the server port.
    #[serde(default)]
    pub advertise_port: Option<u16>,
    /// Interval between self-registration heartbeats.
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_seconds: u64,
    /// Metadata attached to the self-registration.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Instances seeded into the memory backend at startup. They never
    /// expire.
    #[serde(default)]
    pub static_instances: Vec<StaticInstanceConfig>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            provider: DiscoveryProvider::default(),
            timeout_ms: default_timeout_ms(),
            heartbeat_ttl_seconds: default_heartbeat_ttl(),
            reaper_interval_seconds: default_reaper_interval(),
            nacos: NacosConfig::default(),
            register_self: false,
            service_name: default_service_name(),
            advertise_host: default_advertise_host(),
            advertise_port: None,
            heartbeat_interval_seconds: default_heartbeat_interval(),
            metadata: HashMap::new(),
            static_instances: Vec::new(),
        }
    }
}

/// Nacos naming service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NacosConfig {
    /// Base URL of the Nacos server.
    #[serde(default = "default_nacos_endpoint")]
    pub endpoint: String,
    /// Namespace id; empty means the public namespace.
    #[serde(default)]
    pub namespace: String,
    /// Default group name.
    #[serde(default = "default_group")]
    pub group: String,
    /// Default cluster name.
    #[serde(default = "default_cluster")]
    pub cluster: String,
}

impl Default for NacosConfig {
    fn default() -> Self {
        Self {
            endpoint: default_nacos_endpoint(),
            namespace: String::new(),
            group: default_group(),
            cluster: default_cluster(),
        }
    }
}

/// A fixed upstream instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticInstanceConfig {
    /// Service name.
    pub service: String,
    /// Host or IP address.
    pub host: String,
    /// Port.
    pub port: u16,
    /// Instance metadata (`weight`, `version`, ...).
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

fn default_timeout_ms() -> u64 {
    3000
}

fn default_heartbeat_ttl() -> u64 {
    15
}

fn default_reaper_interval() -> u64 {
    5
}

fn default_service_name() -> String {
    "gatehouse".to_string()
}

fn default_advertise_host() -> String {
    "127.0.0.1".to_string()
}

fn default_heartbeat_interval() -> u64 {
    5
}

fn default_nacos_endpoint() -> String {
    "http://127.0.0.1:8848".to_string()
}

fn default_group() -> String {
    "DEFAULT_GROUP".to_string()
}

fn default_cluster() -> String {
    "DEFAULT".to_string()
}
