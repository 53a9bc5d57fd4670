//! Nacos naming service backend (HTTP Open API v1).

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, info};

use gatehouse_core::config::discovery::NacosConfig;
use gatehouse_core::error::{AppError, ErrorKind};
use gatehouse_core::result::AppResult;
use gatehouse_core::traits::Discoverer;
use gatehouse_core::types::instance::{InstanceRegistration, ServiceInstance};

const INSTANCE_PATH: &str = "/nacos/v1/ns/instance";
const INSTANCE_LIST_PATH: &str = "/nacos/v1/ns/instance/list";
const INSTANCE_BEAT_PATH: &str = "/nacos/v1/ns/instance/beat";

/// Body of `GET /nacos/v1/ns/instance/list`.
#[derive(Debug, Deserialize)]
struct InstanceList {
    #[serde(default)]
    hosts: Vec<NacosHost>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NacosHost {
    #[serde(default)]
    instance_id: Option<String>,
    ip: String,
    port: u16,
    #[serde(default)]
    weight: Option<f64>,
    #[serde(default = "default_true")]
    healthy: bool,
    #[serde(default = "default_true")]
    enabled: bool,
    #[serde(default)]
    cluster_name: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

fn default_true() -> bool {
    true
}

/// Discovery backed by a Nacos server.
#[derive(Debug, Clone)]
pub struct NacosDiscovery {
    client: reqwest::Client,
    endpoint: String,
    namespace: String,
    group: String,
    cluster: String,
}

impl NacosDiscovery {
    /// Creates a client for `config.endpoint` with a per-request timeout.
    pub fn new(config: &NacosConfig, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                AppError::with_source(ErrorKind::Configuration, "Failed to build Nacos client", e)
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            namespace: config.namespace.clone(),
            group: config.group.clone(),
            cluster: config.cluster.clone(),
        })
    }

    fn group_of<'a>(&'a self, metadata: &'a HashMap<String, String>) -> &'a str {
        metadata
            .get("group")
            .map(String::as_str)
            .filter(|g| !g.is_empty())
            .unwrap_or(&self.group)
    }

    fn cluster_of<'a>(&'a self, metadata: &'a HashMap<String, String>) -> &'a str {
        metadata
            .get("cluster")
            .map(String::as_str)
            .filter(|c| !c.is_empty())
            .unwrap_or(&self.cluster)
    }

    fn url(&self, path: &str, params: &[(&str, String)]) -> Result<Url, AppError> {
        let mut params = params.to_vec();
        if !self.namespace.is_empty() {
            params.push(("namespaceId", self.namespace.clone()));
        }
        Url::parse_with_params(&format!("{}{}", self.endpoint, path), &params).map_err(|e| {
            AppError::configuration(format!("Invalid Nacos endpoint '{}': {e}", self.endpoint))
        })
    }

    async fn call(&self, method: Method, url: Url) -> Result<reqwest::Response, AppError> {
        let response = self
            .client
            .request(method.clone(), url.clone())
            .send()
            .await
            .map_err(|e| map_transport_error(&url, e))?;
        debug!(%method, path = url.path(), status = %response.status(), "Nacos call");
        Ok(response)
    }
}

fn map_transport_error(url: &Url, err: reqwest::Error) -> AppError {
    if err.is_timeout() {
        AppError::timeout(format!("Nacos request to {} timed out", url.path()))
    } else {
        AppError::with_source(
            ErrorKind::DiscoveryUnavailable,
            format!("Nacos unreachable at {}", url.path()),
            err,
        )
    }
}

async fn expect_success(response: reqwest::Response, action: &str) -> Result<(), AppError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(AppError::discovery_unavailable(format!(
        "Nacos {action} failed with {status}: {body}"
    )))
}

#[async_trait]
impl Discoverer for NacosDiscovery {
    fn name(&self) -> &'static str {
        "nacos"
    }

    async fn register(&self, registration: &InstanceRegistration) -> AppResult<()> {
        let url = self.url(
            INSTANCE_PATH,
            &[
                ("serviceName", registration.service.clone()),
                ("ip", registration.host.clone()),
                ("port", registration.port.to_string()),
                ("weight", registration.weight().to_string()),
                ("enabled", "true".to_string()),
                ("healthy", "true".to_string()),
                ("ephemeral", "true".to_string()),
                ("clusterName", self.cluster_of(&registration.metadata).to_string()),
                ("groupName", self.group_of(&registration.metadata).to_string()),
                ("metadata", serde_json::to_string(&registration.metadata)?),
            ],
        )?;
        expect_success(self.call(Method::POST, url).await?, "register").await?;
        info!(
            service = %registration.service,
            host = %registration.host,
            port = registration.port,
            "Instance registered with Nacos"
        );
        Ok(())
    }

    async fn deregister(&self, registration: &InstanceRegistration) -> AppResult<()> {
        let url = self.url(
            INSTANCE_PATH,
            &[
                ("serviceName", registration.service.clone()),
                ("ip", registration.host.clone()),
                ("port", registration.port.to_string()),
                ("ephemeral", "true".to_string()),
                ("clusterName", self.cluster_of(&registration.metadata).to_string()),
                ("groupName", self.group_of(&registration.metadata).to_string()),
            ],
        )?;
        expect_success(self.call(Method::DELETE, url).await?, "deregister").await?;
        info!(
            service = %registration.service,
            host = %registration.host,
            port = registration.port,
            "Instance deregistered from Nacos"
        );
        Ok(())
    }

    async fn heartbeat(&self, registration: &InstanceRegistration) -> AppResult<()> {
        let beat = serde_json::json!({
            "serviceName": registration.service,
            "ip": registration.host,
            "port": registration.port,
            "weight": registration.weight(),
            "cluster": self.cluster_of(&registration.metadata),
            "metadata": registration.metadata,
        });
        let url = self.url(
            INSTANCE_BEAT_PATH,
            &[
                ("serviceName", registration.service.clone()),
                ("groupName", self.group_of(&registration.metadata).to_string()),
                ("ephemeral", "true".to_string()),
                ("beat", beat.to_string()),
            ],
        )?;
        expect_success(self.call(Method::PUT, url).await?, "heartbeat").await
    }

    async fn instances(&self, service: &str) -> AppResult<Vec<ServiceInstance>> {
        let url = self.url(
            INSTANCE_LIST_PATH,
            &[
                ("serviceName", service.to_string()),
                ("groupName", self.group.clone()),
                ("clusters", self.cluster.clone()),
                ("healthyOnly", "false".to_string()),
            ],
        )?;
        let response = self.call(Method::GET, url.clone()).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::discovery_unavailable(format!(
                "Nacos instance list failed with {status}"
            )));
        }
        let list: InstanceList = response
            .json()
            .await
            .map_err(|e| map_transport_error(&url, e))?;

        Ok(list
            .hosts
            .into_iter()
            .map(|host| to_instance(service, host))
            .collect())
    }
}

fn to_instance(service: &str, host: NacosHost) -> ServiceInstance {
    let mut metadata = host.metadata;
    if let Some(weight) = host.weight {
        metadata
            .entry("weight".to_string())
            .or_insert_with(|| weight.to_string());
    }
    if let Some(cluster) = host.cluster_name {
        metadata.entry("cluster".to_string()).or_insert(cluster);
    }
    ServiceInstance {
        instance_id: host
            .instance_id
            .unwrap_or_else(|| format!("{}#{}", host.ip, host.port)),
        service: service.to_string(),
        host: host.ip,
        port: host.port,
        metadata,
        healthy: host.healthy && host.enabled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_list_parsing() {
        let raw = r#"{
            "name": "DEFAULT_GROUP@@user-service",
            "hosts": [
                {"instanceId": "10.0.0.1#8080#DEFAULT#DEFAULT_GROUP@@user-service",
                 "ip": "10.0.0.1", "port": 8080, "weight": 3.0, "healthy": true,
                 "enabled": true, "clusterName": "DEFAULT",
                 "metadata": {"version": "v1"}},
                {"ip": "10.0.0.2", "port": 8080, "healthy": false}
            ]
        }"#;
        let list: InstanceList = serde_json::from_str(raw).unwrap();
        let instances: Vec<ServiceInstance> = list
            .hosts
            .into_iter()
            .map(|h| to_instance("user-service", h))
            .collect();

        assert_eq!(instances.len(), 2);
        assert!(instances[0].healthy);
        assert_eq!(instances[0].weight(), 3);
        assert_eq!(instances[0].metadata.get("version").unwrap(), "v1");
        assert!(!instances[1].healthy);
        assert_eq!(instances[1].weight(), 10);
        assert_eq!(instances[1].instance_id, "10.0.0.2#8080");
    }

    #[test]
    fn test_group_from_metadata() {
        let nacos = NacosDiscovery::new(&NacosConfig::default(), Duration::from_secs(1)).unwrap();
        let mut metadata = HashMap::new();
        assert_eq!(nacos.group_of(&metadata), "DEFAULT_GROUP");
        metadata.insert("group".to_string(), "payments".to_string());
        assert_eq!(nacos.group_of(&metadata), "payments");
    }

    #[test]
    fn test_url_includes_namespace() {
        let config = NacosConfig {
            namespace: "dev".to_string(),
            ..NacosConfig::default()
        };
        let nacos = NacosDiscovery::new(&config, Duration::from_secs(1)).unwrap();
        let url = nacos
            .url(INSTANCE_LIST_PATH, &[("serviceName", "user-service".to_string())])
            .unwrap();
        assert_eq!(url.path(), INSTANCE_LIST_PATH);
        assert!(url.query().unwrap().contains("namespaceId=dev"));
    }
}
