//! Application state shared across all handlers and middleware.

use std::sync::Arc;

use gatehouse_auth::{AccessController, PolicyStore, RbacCatalog, TokenCodec};
use gatehouse_core::config::AppConfig;
use gatehouse_discovery::ServiceRegistry;
use gatehouse_gateway::GatewayRouter;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    // ── Configuration ────────────────────────────────────────
    /// Application configuration
    pub config: Arc<AppConfig>,

    // ── Auth ─────────────────────────────────────────────────
    /// Token issuer and verifier
    pub token_codec: Arc<TokenCodec>,
    /// Live RBAC policy
    pub policy: Arc<PolicyStore>,
    /// Ordered access pipeline
    pub access: Arc<AccessController>,
    /// Role/permission catalog, when it backs the policy
    pub catalog: Option<Arc<RbacCatalog>>,

    // ── Edge ─────────────────────────────────────────────────
    /// Service discovery
    pub registry: Arc<ServiceRegistry>,
    /// Reverse proxy for every non-local path
    pub gateway: Arc<GatewayRouter>,
}
