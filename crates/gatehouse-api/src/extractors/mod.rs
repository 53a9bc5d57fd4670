//! Custom Axum extractors.

pub mod principal;

pub use principal::CurrentPrincipal;
