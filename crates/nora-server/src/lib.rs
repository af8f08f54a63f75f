//! `nora-server` - local project server for the Nora desktop companion.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

/// Server configuration loading.
pub mod config;
/// Server and request errors.
pub mod error;
/// File and folder reads and writes inside a project.
pub mod files;
/// Project and path resolution under the user-data root.
pub mod paths;
/// Project manifests and creation.
pub mod project;
/// Recursive project tree listing.
pub mod tree;
/// HTTP + WebSocket API server and the frontend server.
pub mod web;

pub use config::{FrontendConfig, ServerConfig};
pub use error::{ApiError, ApiErrorKind, ServerError};
pub use web::{spawn_api_server, ApiHandle, ApiServer};
