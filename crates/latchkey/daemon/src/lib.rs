//! Latchkey daemon library
//!
//! Hosts the token exchange behind a small HTTP API:
//! - `POST /` exchanges an identity token for a repository token
//! - `GET /health` liveness check

pub mod api;
pub mod config;
pub mod error;
pub mod server;

pub use config::{DaemonConfig, Profile};
pub use error::{ApiError, DaemonError};
pub use server::Server;
