//! Route handlers organized by domain.

pub mod auth;
pub mod catalog;
pub mod gateway;
pub mod health;
pub mod rbac;
