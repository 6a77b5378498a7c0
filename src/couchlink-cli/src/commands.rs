//! Subcommands of the `couchlink` binary

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use couchlink_rs::{Client, Submittable, ViewArguments};
use serde_json::{json, Value};

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show server version information
    ServerInfo,
    /// List every database on the server
    ListDbs,
    /// Show metadata for a database
    DbInfo { db: String },
    /// Create a database
    CreateDb { db: String },
    /// Delete a database and all of its documents
    DeleteDb { db: String },
    /// List document ids and revisions
    ListDocs {
        db: String,
        /// Only design documents
        #[arg(long)]
        design: bool,
        #[command(flatten)]
        view: ViewOptions,
    },
    /// Fetch one document
    GetDoc { db: String, id: String },
    /// Query a view of a design document
    QueryView {
        db: String,
        /// Design document name, with or without the `_design/` prefix
        design: String,
        view: String,
        #[command(flatten)]
        view_options: ViewOptions,
    },
}

/// View query parameters shared by listing and view commands
#[derive(Debug, Default, Args)]
pub struct ViewOptions {
    /// Exact key (JSON, or a bare string)
    #[arg(long)]
    pub key: Option<String>,
    #[arg(long)]
    pub startkey: Option<String>,
    #[arg(long)]
    pub endkey: Option<String>,
    #[arg(long)]
    pub count: Option<u64>,
    #[arg(long)]
    pub skip: Option<u64>,
    #[arg(long)]
    pub descending: bool,
    /// Answer from the index without refreshing it first
    #[arg(long)]
    pub no_update: bool,
}

impl ViewOptions {
    pub fn to_arguments(&self) -> ViewArguments {
        ViewArguments {
            key: self.key.as_deref().map(parse_key),
            startkey: self.startkey.as_deref().map(parse_key),
            endkey: self.endkey.as_deref().map(parse_key),
            count: self.count,
            skip: self.skip,
            descending: self.descending.then_some(true),
            update: self.no_update.then_some(false),
            ..ViewArguments::default()
        }
    }
}

/// Keys are JSON when they parse as JSON, plain strings otherwise
pub fn parse_key(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Run `command` and return what should be printed
pub async fn run(client: &Client, command: Command) -> Result<Value> {
    match command {
        Command::ServerInfo => Ok(client.server_info().await?),
        Command::ListDbs => Ok(json!(client.list_database_names().await?)),
        Command::DbInfo { db } => Ok(client.database(&db)?.info().await?),
        Command::CreateDb { db } => {
            let db = client.database(&db)?;
            db.create().await?;
            Ok(json!({"ok": true, "db": db.name()}))
        }
        Command::DeleteDb { db } => {
            let deleted = client.database(&db)?.delete().await?;
            Ok(json!({"ok": deleted}))
        }
        Command::ListDocs { db, design, view } => {
            let db = client.database(&db)?;
            let args = view.to_arguments();
            let args = (!args.is_empty()).then_some(&args);
            let pairs = if design {
                db.list_design_document_id_revisions(args).await?
            } else {
                db.list_document_id_revisions(args).await?
            };
            Ok(serde_json::to_value(pairs)?)
        }
        Command::GetDoc { db, id } => {
            let db = client.database(&db)?;
            let mut doc = db.new_document(Some(id), None, None, None);
            doc.retrieve().await?;
            Ok(doc.content_for_submit())
        }
        Command::QueryView {
            db,
            design,
            view,
            view_options,
        } => {
            let db = client.database(&db)?;
            let mut design = db.new_design_document(&design, None, None);
            design
                .retrieve()
                .await
                .with_context(|| format!("loading {}", design.id()))?;

            let args = view_options.to_arguments();
            let args = (!args.is_empty()).then_some(&args);
            Ok(design.query_view(&view, args).await?)
        }
    }
}
