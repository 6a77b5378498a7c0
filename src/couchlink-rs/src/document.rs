use std::collections::BTreeMap;

use couchlink_core::{naming, Attachment, Fields, RevisionInfo};
use reqwest::Method;
use serde_json::{json, Value};

use crate::transport::Response;
use crate::{ClientError, Database, Result};

/// Body sent to the server when a document is created or updated
pub trait Submittable {
    fn content_for_submit(&self) -> Value;
}

/// One document: identity, field data and attachments.
///
/// Borrows the [`Database`] it belongs to. Every persistence call issues
/// exactly one request and, on success, refreshes `id`/`rev` from the
/// server's answer. Deleting the server copy leaves the handle usable.
#[derive(Debug, Clone)]
pub struct Document<'db> {
    db: &'db Database,
    pub id: Option<String>,
    pub rev: Option<String>,
    pub data: Fields,
    pub attachments: BTreeMap<String, Attachment>,
}

impl<'db> Document<'db> {
    pub fn new(
        db: &'db Database,
        id: Option<String>,
        rev: Option<String>,
        data: Option<Fields>,
        attachments: Option<BTreeMap<String, Attachment>>,
    ) -> Self {
        Self {
            db,
            id,
            rev,
            data: data.unwrap_or_default(),
            attachments: attachments.unwrap_or_default(),
        }
    }

    pub fn database(&self) -> &'db Database {
        self.db
    }

    /// Path of this document: database uri name plus the escaped id
    pub fn uri_name(&self) -> Result<String> {
        let id = self.require_id()?;
        Ok(format!("{}{}", self.db.uri_name(), naming::document_segment(id)))
    }

    fn require_id(&self) -> Result<&str> {
        self.id
            .as_deref()
            .ok_or_else(|| ClientError::InvalidState("document has no id".to_string()))
    }

    fn require_rev(&self) -> Result<&str> {
        self.rev
            .as_deref()
            .ok_or_else(|| ClientError::InvalidState("document has no revision".to_string()))
    }

    /// Name used in errors about this document
    fn label(&self) -> String {
        self.id.clone().unwrap_or_else(|| "<new document>".to_string())
    }

    /// Store the document for the first time
    pub async fn create(&mut self) -> Result<()> {
        let content = self.content_for_submit();
        self.create_with(content).await
    }

    pub(crate) async fn create_with(&mut self, content: Value) -> Result<()> {
        if self.rev.is_some() {
            return Err(ClientError::InvalidState(
                "document already has a revision".to_string(),
            ));
        }

        let response = match &self.id {
            Some(_) => {
                let path = self.uri_name()?;
                self.db.request(Method::PUT, &path, Some(&content)).await?
            }
            None => {
                let path = self.db.uri_name();
                self.db.request(Method::POST, &path, Some(&content)).await?
            }
        };

        self.apply_write(response)?;
        tracing::debug!(db = %self.db.name(), id = ?self.id, rev = ?self.rev, "Created document");
        Ok(())
    }

    /// Store local changes as a new revision
    pub async fn update(&mut self) -> Result<()> {
        let content = self.content_for_submit();
        self.update_with(content).await
    }

    pub(crate) async fn update_with(&mut self, content: Value) -> Result<()> {
        self.require_rev()?;
        let path = self.uri_name()?;

        let response = self.db.request(Method::PUT, &path, Some(&content)).await?;
        self.apply_write(response)
    }

    /// Replace local state with the current server copy
    pub async fn retrieve(&mut self) -> Result<()> {
        let path = self.uri_name()?;
        self.fetch(path).await
    }

    /// Replace local state with revision `rev` of the server copy
    pub async fn retrieve_from_revision(&mut self, rev: &str) -> Result<()> {
        let path = format!("{}?rev={}", self.uri_name()?, naming::escape_segment(rev));
        self.fetch(path).await
    }

    async fn fetch(&mut self, path: String) -> Result<()> {
        let response = self.db.request(Method::GET, &path, None).await?;
        if response.status == 404 {
            return Err(ClientError::not_found(self.label(), response.message));
        }
        let body = response.into_json()?;
        self.apply_body(body)
    }

    /// Revision history known to the server, newest first
    pub async fn revisions_info(&self) -> Result<Vec<RevisionInfo>> {
        let path = format!("{}?revs_info=true", self.uri_name()?);
        let response = self.db.request(Method::GET, &path, None).await?;
        if response.status == 404 {
            return Err(ClientError::not_found(self.label(), response.message));
        }

        let mut body = response.into_json()?;
        let infos = body
            .get_mut("_revs_info")
            .map(Value::take)
            .unwrap_or_else(|| Value::Array(Vec::new()));
        Ok(serde_json::from_value(infos)?)
    }

    /// Delete the server copy.
    ///
    /// The handle keeps its data and picks up the deletion revision.
    pub async fn delete(&mut self) -> Result<bool> {
        let rev = self.require_rev()?;
        let path = format!("{}?rev={}", self.uri_name()?, naming::escape_segment(rev));

        let response = self.db.request(Method::DELETE, &path, None).await?;
        self.apply_write(response)?;
        Ok(true)
    }

    /// Attach `bytes` inline; sent with the next create/update
    pub fn add_attachment(&mut self, name: impl Into<String>, content_type: &str, bytes: &[u8]) {
        self.attachments
            .insert(name.into(), Attachment::inline(content_type, bytes));
    }

    /// Drop an attachment locally; returns it if it was present
    pub fn delete_attachment(&mut self, name: &str) -> Option<Attachment> {
        self.attachments.remove(name)
    }

    /// Raw bytes of a stored attachment
    pub async fn fetch_attachment(&self, name: &str) -> Result<Vec<u8>> {
        let path = format!("{}/{}", self.uri_name()?, naming::escape_segment(name));
        let response = self.db.request(Method::GET, &path, None).await?;

        if response.status == 404 {
            return Err(ClientError::not_found(name, response.message));
        }
        if !response.success() {
            return Err(ClientError::connection(&response));
        }
        Ok(response.body)
    }

    /// Map a create/update/delete response onto the handle
    fn apply_write(&mut self, response: Response) -> Result<()> {
        if response.is_ok() {
            if let Some(json) = &response.json {
                if let Some(id) = json.get("id").and_then(Value::as_str) {
                    self.id = Some(id.to_string());
                }
                if let Some(rev) = json.get("rev").and_then(Value::as_str) {
                    self.rev = Some(rev.to_string());
                }
            }
            return Ok(());
        }

        match response.status {
            404 => Err(ClientError::not_found(self.label(), response.message)),
            409 => Err(ClientError::Conflict {
                name: self.label(),
                message: response.message,
            }),
            _ => Err(ClientError::connection(&response)),
        }
    }

    /// Load a fetched document body: underscore fields are metadata,
    /// the rest is data
    fn apply_body(&mut self, body: Value) -> Result<()> {
        let Value::Object(mut fields) = body else {
            return Err(ClientError::Connection {
                message: "document body is not a JSON object".to_string(),
            });
        };

        if let Some(Value::String(id)) = fields.remove("_id") {
            self.id = Some(id);
        }
        if let Some(Value::String(rev)) = fields.remove("_rev") {
            self.rev = Some(rev);
        }
        self.attachments = match fields.remove("_attachments") {
            Some(attachments) => serde_json::from_value(attachments)?,
            None => BTreeMap::new(),
        };

        fields.retain(|name, _| !name.starts_with('_'));
        self.data = fields;
        Ok(())
    }
}

impl Submittable for Document<'_> {
    /// Field data plus `_id`/`_rev` when known and `_attachments` when any
    fn content_for_submit(&self) -> Value {
        let mut content = self.data.clone();
        if let Some(id) = &self.id {
            content.insert("_id".to_string(), Value::String(id.clone()));
        }
        if let Some(rev) = &self.rev {
            content.insert("_rev".to_string(), Value::String(rev.clone()));
        }
        if !self.attachments.is_empty() {
            // Attachment holds only strings, integers and bools, so this
            // serialization cannot fail
            content.insert("_attachments".to_string(), json!(self.attachments));
        }
        Value::Object(content)
    }
}
