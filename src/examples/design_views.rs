//! Design Document Example
//!
//! Creates a database, stores a few documents, defines a view and queries it.
//! Needs a CouchDB server at COUCHDB_URL (default http://localhost:5984/).
//!
//! Run with: cargo run --example design_views

use couchlink_rs::{Client, ClientConfig, ClientError, Fields, ViewArguments};
use serde_json::json;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let url = std::env::var("COUCHDB_URL").unwrap_or_else(|_| "http://localhost:5984/".to_string());
    let client = Client::new(ClientConfig::new(url))?;
    println!("Connected: {}\n", client.server_info().await?);

    let db = client.database("couchlink_example")?;
    match db.create().await {
        Ok(_) => println!("Created {}", db.name()),
        Err(ClientError::DatabaseExists { .. }) => println!("Reusing {}", db.name()),
        Err(e) => return Err(e.into()),
    }

    for (id, date) in [("report-1", "2024-01-05"), ("report-2", "2024-02-11"), ("report-3", "2024-03-20")] {
        if db.document_exists(id, None).await? {
            continue;
        }
        let mut data = Fields::new();
        data.insert("date".to_string(), json!(date));
        let mut doc = db.new_document(Some(id.to_string()), None, Some(data), None);
        doc.create().await?;
        println!("Stored {} at {}", id, doc.rev.as_deref().unwrap_or_default());
    }

    let mut design = db.new_design_document("reports", None, None);
    if !db.design_document_exists("reports", None).await? {
        design.add_view("byDate", "function(doc) { if (doc.date) emit(doc.date, null); }", None)?;
        design.create().await?;
    } else {
        design.retrieve().await?;
    }
    println!("\nViews in {}: {:?}", design.id(), design.list_views());

    let args = ViewArguments::new().descending(true).count(10);
    let rows = design.query_view("byDate", Some(&args)).await?;
    println!("\nNewest reports first:\n{}", serde_json::to_string_pretty(&rows)?);

    Ok(())
}
