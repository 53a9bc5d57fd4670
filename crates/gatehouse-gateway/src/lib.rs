//! # gatehouse-gateway
//!
//! Reverse proxy in front of discovered services: a static path-prefix
//! [`RouteTable`](routes::RouteTable) picks the service, the
//! [`ServiceRegistry`](gatehouse_discovery::ServiceRegistry) supplies healthy
//! instances, an [`InstanceSelector`](selector::InstanceSelector) picks one and
//! the [`ProxyClient`](proxy::ProxyClient) forwards the request.

pub mod proxy;
pub mod router;
pub mod routes;
pub mod selector;

pub use router::GatewayRouter;
