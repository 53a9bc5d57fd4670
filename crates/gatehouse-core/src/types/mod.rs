//! Domain value types shared across Gatehouse crates.

pub mod instance;
pub mod pagination;
pub mod policy;
pub mod rbac;
pub mod subject;

pub use instance::{InstanceRegistration, ServiceInstance};
pub use pagination::{PageRequest, PageResponse};
pub use policy::{GroupingRule, PolicyDocument, PolicyRule};
pub use rbac::{EntityStatus, Permission, Role};
pub use subject::SubjectId;
