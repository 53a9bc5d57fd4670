//! RBAC policy engine.
//!
//! The [`PolicyStore`] answers enforcement queries from an immutable
//! [`PolicySnapshot`](snapshot::PolicySnapshot) that is swapped atomically on
//! every mutation or reload. Persistence goes through the
//! [`PolicyBackend`](gatehouse_core::traits::PolicyBackend) capability, with
//! [`FilePolicyAdapter`] (CSV rule file), [`RbacCatalog`] (relational
//! roles/permissions/grants) and [`CatalogBackend`] (catalog mirrored to a
//! rule file) as implementations.

pub mod catalog;
pub mod catalog_backend;
pub mod file_adapter;
pub mod matcher;
pub mod model;
pub mod snapshot;
pub mod store;

pub use catalog::{PermissionUpdate, RbacCatalog, RoleUpdate};
pub use catalog_backend::CatalogBackend;
pub use file_adapter::FilePolicyAdapter;
pub use model::PolicyModel;
pub use snapshot::{PolicySnapshot, ResolvedPermission};
pub use store::PolicyStore;
