//! # gatehouse-core
//!
//! Core crate for Gatehouse. Contains the unified error system, configuration
//! schemas, the capability traits consumed by the policy engine and the
//! service registry, and the shared domain types.
//!
//! This crate has **no** internal dependencies on other Gatehouse crates.

pub mod config;
pub mod error;
pub mod http;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
