//! Latchkey Types - the shared vocabulary of the token broker
//!
//! Resources are addressed as `owner/name`, permissions are scope to level
//! mappings, and the broker's delegated grant over a resource is an
//! [`Authority`]. Everything that crosses a crate boundary in the pipeline
//! lives here.

#![deny(unsafe_code)]

pub mod permission;
pub mod resource;
pub mod token;

pub use permission::{PermissionLevel, PermissionSet};
pub use resource::{InvalidResourceId, RepoSelector, ResourceId};
pub use token::{Authority, IssuedToken};
