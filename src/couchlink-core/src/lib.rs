//! couchlink Core Library
//!
//! This crate provides the transport-free pieces of the couchlink client:
//! - Database name validation and URI escaping
//! - View argument normalization and query-string building
//! - Wire models for documents, attachments and listings
//! - Client configuration

pub mod config;
pub mod models;
pub mod naming;
pub mod query;

// Re-export commonly used types
pub use config::ClientConfig;
pub use models::*;
pub use naming::{uri_name, valid_name, DESIGN_PREFIX};
pub use query::{build_query_string, normalize_view_arguments};
