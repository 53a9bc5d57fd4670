//! Per-request routing: match, discover, select, forward.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{Request, Response};
use axum::response::IntoResponse;
use tracing::{info, warn};

use gatehouse_core::config::gateway::GatewayConfig;
use gatehouse_core::error::AppError;
use gatehouse_discovery::ServiceRegistry;

use crate::proxy::ProxyClient;
use crate::routes::RouteTable;
use crate::selector::InstanceSelector;

/// The edge router.
#[derive(Debug)]
pub struct GatewayRouter {
    routes: RouteTable,
    registry: Arc<ServiceRegistry>,
    selector: InstanceSelector,
    proxy: ProxyClient,
}

impl GatewayRouter {
    /// Builds the router from gateway configuration.
    pub fn new(config: &GatewayConfig, registry: Arc<ServiceRegistry>) -> Result<Self, AppError> {
        let proxy = ProxyClient::new(
            Duration::from_secs(config.proxy_timeout_seconds),
            config.max_body_bytes,
        )?;
        Ok(Self {
            routes: RouteTable::from_config(&config.routes),
            registry,
            selector: InstanceSelector::new(config.selection),
            proxy,
        })
    }

    /// The configured route table.
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Routes `request` and always produces a response.
    ///
    /// No matching route is a 404; discovery failure, an empty instance list
    /// or an upstream failure is a 503. Exactly one instance is tried.
    pub async fn route(&self, request: Request<Body>) -> Response<Body> {
        let method = request.method().clone();
        let path = request.uri().path().to_string();
        let started = Instant::now();

        match self.forward(request).await {
            Ok(response) => {
                info!(
                    method = %method,
                    path = %path,
                    status = response.status().as_u16(),
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Request proxied"
                );
                response
            }
            Err(e) => {
                warn!(
                    method = %method,
                    path = %path,
                    kind = %e.kind,
                    error = %e.message,
                    "Gateway request failed"
                );
                e.into_response()
            }
        }
    }

    async fn forward(&self, request: Request<Body>) -> Result<Response<Body>, AppError> {
        let path = request.uri().path();
        let route = self
            .routes
            .find(path)
            .ok_or_else(|| AppError::not_found(format!("No route for {path}")))?;

        let instances = self.registry.instances(&route.service).await?;
        let instance = self
            .selector
            .select(&route.service, &instances)
            .ok_or_else(|| {
                AppError::service_unavailable(format!(
                    "No healthy instance of {}",
                    route.service
                ))
            })?;

        let mut target = route.rewrite(path);
        if let Some(query) = request.uri().query() {
            target.push('?');
            target.push_str(query);
        }

        self.proxy.forward(instance, &target, request).await
    }
}
