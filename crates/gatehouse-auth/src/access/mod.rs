//! Request-scoped authenticate-then-authorize pipeline.

pub mod pipeline;
pub mod principal;

pub use pipeline::{AccessController, AccessDecision, AccessRequest, AccessTarget};
pub use principal::Principal;
