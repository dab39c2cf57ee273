//! Folio Common Library
//!
//! The catalog-and-review core shared by the Folio services:
//! - Database entities, schema and repository
//! - Confirmation-code signup and access tokens
//! - Role model and permission evaluation
//! - Catalog, review and comment rules
//! - Error types, configuration and metrics
//! - Mail and clock collaborators

pub mod auth;
pub mod clock;
pub mod config;
pub mod db;
pub mod errors;
pub mod mail;
pub mod metrics;
pub mod permissions;
pub mod services;
pub mod validation;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{DbPool, Repository};
pub use errors::{AppError, Result};
pub use services::Services;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
