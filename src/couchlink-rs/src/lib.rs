//! couchlink Client Library
//!
//! Async client mapping CouchDB's HTTP/JSON API onto database, document and
//! design document handles.
//!
//! ```rust,no_run
//! use couchlink_rs::{Client, ClientConfig, ViewArguments};
//!
//! # async fn demo() -> couchlink_rs::Result<()> {
//! let client = Client::new(ClientConfig::new("http://localhost:5984/"))?;
//! let db = client.database("reports")?;
//! db.create().await?;
//!
//! let mut design = db.new_design_document("reports", None, None);
//! design.add_view("byDate", "function(doc) { emit(doc.date, null); }", None)?;
//! design.create().await?;
//!
//! let rows = design
//!     .query_view("byDate", Some(&ViewArguments::new().descending(true).count(10)))
//!     .await?;
//! println!("{}", rows);
//! # Ok(())
//! # }
//! ```

mod client;
mod database;
mod design;
mod document;
mod transport;

#[cfg(test)]
pub(crate) mod mock;

pub use client::Client;
pub use database::Database;
pub use design::DesignDocument;
pub use document::{Document, Submittable};
pub use transport::{HttpTransport, Response, Transport};

pub use reqwest::Method;

pub use couchlink_core::{
    Attachment, ClientConfig, DocumentIdRevision, Fields, RevisionInfo, ViewArguments,
    ViewDefinition,
};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Connection error: {message}")]
    Connection { message: String },

    #[error("Database {name} already exists: {message}")]
    DatabaseExists { name: String, message: String },

    #[error("Not found: {name}: {message}")]
    NotFound { name: String, message: String },

    #[error("Conflict on {name}: {message}")]
    Conflict { name: String, message: String },

    #[error("Invalid database name: {0}")]
    InvalidName(String),

    /// Raised when constructing a design document outside `_design/`
    #[error("Design document id must start with _design/: {0}")]
    InvalidDesignDocumentId(String),

    #[error("Invalid document state: {0}")]
    InvalidState(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// Generic failure carrying the transport's message
    pub(crate) fn connection(response: &Response) -> Self {
        ClientError::Connection {
            message: response.message.clone(),
        }
    }

    pub(crate) fn not_found(name: impl Into<String>, message: impl Into<String>) -> Self {
        ClientError::NotFound {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Connection {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
