//! Service layer for business logic
//!
//! Shared between the HTTP API and the CLI.

mod analytics_service;
mod ingest_service;

pub use analytics_service::*;
pub use ingest_service::*;
