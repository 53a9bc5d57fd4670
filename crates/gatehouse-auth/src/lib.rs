//! # gatehouse-auth
//!
//! Authentication and authorization for Gatehouse:
//!
//! - **token**: HS256 token issuance, verification and refresh.
//! - **policy**: RBAC policy engine with role inheritance and wildcard
//!   resource matching, its file backend and the relational catalog.
//! - **access**: the ordered bypass → extract → authenticate → authorize
//!   pipeline used by the HTTP layer.

pub mod access;
pub mod policy;
pub mod token;

pub use access::{AccessController, AccessDecision, AccessRequest, AccessTarget, Principal};
pub use policy::{CatalogBackend, FilePolicyAdapter, PolicyModel, PolicyStore, RbacCatalog};
pub use token::{Claims, TokenCodec};
