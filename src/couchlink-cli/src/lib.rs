//! couchlink - command line access to a CouchDB server
//!
//! This crate provides the `couchlink` binary and the command handlers
//! behind it, built on the `couchlink-rs` client.
//!
//! # Library Usage
//!
//! ```rust,no_run
//! use couchlink_rs::{Client, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = Client::new(ClientConfig::default())?;
//!     let info = client.database("mydb")?.info().await?;
//!     println!("{}", info);
//!     Ok(())
//! }
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! couchlink --server http://localhost:5984/ query-view mydb reports byDate --descending --count 10
//! ```

pub use couchlink_rs;

pub mod commands;
