//! # gatehouse-api
//!
//! HTTP API layer for Gatehouse built on Axum.
//!
//! Provides the access-control middleware, the `CurrentPrincipal`
//! extractor, token and RBAC administration endpoints, the health probe,
//! and the fallback that hands every other request to the gateway.

pub mod app;
pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::build_app;
pub use state::AppState;
