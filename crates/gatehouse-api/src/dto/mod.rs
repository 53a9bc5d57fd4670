//! Data Transfer Objects for request/response serialization.

pub mod request;
pub mod response;
