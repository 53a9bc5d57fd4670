//! Capability traits defined in `gatehouse-core` and implemented by other
//! crates.

pub mod discovery;
pub mod policy;

pub use discovery::Discoverer;
pub use policy::{PolicyBackend, PolicyReader, PolicyWriter};
