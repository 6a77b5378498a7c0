use std::collections::BTreeMap;
use std::fmt;

use couchlink_core::{naming, query, Attachment, DocumentIdRevision, Fields, ViewArguments};
use reqwest::Method;
use serde_json::{json, Value};

use crate::document::Submittable;
use crate::transport::Response;
use crate::{Client, ClientError, DesignDocument, Document, Result};

/// Handle for one named database on a server.
///
/// The name is stored slash-terminated and unescaped; [`Database::uri_name`]
/// does the escaping when a path is built.
#[derive(Clone)]
pub struct Database {
    client: Client,
    name: String,
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database").field("name", &self.name).finish()
    }
}

impl Database {
    /// Handle for `name`, which gains a trailing slash if it lacks one
    pub fn new(client: Client, name: &str) -> Result<Self> {
        let name = naming::normalize_name(name);
        if !Self::valid_name(&name) {
            return Err(ClientError::InvalidName(name));
        }
        Ok(Self { client, name })
    }

    /// Whether a slash-terminated name matches `^[a-z0-9_$()+/-]+/$`
    pub fn valid_name(name: &str) -> bool {
        naming::valid_name(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Path segment for this database, interior slashes escaped as `%2F`
    pub fn uri_name(&self) -> String {
        naming::uri_name(&self.name)
    }

    pub(crate) async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Response> {
        self.client.request(method, path, body).await
    }

    /// Database metadata (`doc_count`, `update_seq`, ...)
    #[tracing::instrument(skip(self), fields(db = %self.name))]
    pub async fn info(&self) -> Result<Value> {
        self.request(Method::GET, &self.uri_name(), None)
            .await?
            .into_json()
    }

    /// Create the database on the server
    #[tracing::instrument(skip(self), fields(db = %self.name))]
    pub async fn create(&self) -> Result<&Self> {
        let response = self.request(Method::PUT, &self.uri_name(), None).await?;

        if response.is_ok() {
            tracing::info!(db = %self.name, "Created database");
            return Ok(self);
        }
        if response.status == 409 {
            return Err(ClientError::DatabaseExists {
                name: self.name.clone(),
                message: response.message,
            });
        }
        Err(ClientError::connection(&response))
    }

    /// Delete the database and everything in it
    #[tracing::instrument(skip(self), fields(db = %self.name))]
    pub async fn delete(&self) -> Result<bool> {
        let response = self.request(Method::DELETE, &self.uri_name(), None).await?;

        if response.is_ok() {
            tracing::info!(db = %self.name, "Deleted database");
            return Ok(true);
        }
        if response.status == 404 {
            return Err(ClientError::not_found(self.name.clone(), response.message));
        }
        Err(ClientError::connection(&response))
    }

    /// Compact the database files
    pub async fn compact(&self) -> Result<()> {
        let path = format!("{}_compact", self.uri_name());
        let response = self.request(Method::POST, &path, Some(&json!({}))).await?;

        if response.is_ok() {
            return Ok(());
        }
        Err(ClientError::connection(&response))
    }

    /// Document handle bound to this database; nothing is created server-side
    pub fn new_document(
        &self,
        id: Option<String>,
        rev: Option<String>,
        data: Option<Fields>,
        attachments: Option<BTreeMap<String, Attachment>>,
    ) -> Document<'_> {
        Document::new(self, id, rev, data, attachments)
    }

    /// Design document handle; `id` gains the `_design/` prefix if missing
    pub fn new_design_document(
        &self,
        id: &str,
        rev: Option<String>,
        data: Option<Fields>,
    ) -> DesignDocument<'_> {
        DesignDocument::from_parts(self, naming::design_id(id), rev, data)
    }

    /// `{id, rev}` of every document, in `_all_docs` order
    #[tracing::instrument(skip(self, args), fields(db = %self.name))]
    pub async fn list_document_id_revisions(
        &self,
        args: Option<&ViewArguments>,
    ) -> Result<Vec<DocumentIdRevision>> {
        let query = args.map(query::build_query_string).unwrap_or_default();
        let path = format!("{}_all_docs{}", self.uri_name(), query);

        let body = self.request(Method::GET, &path, None).await?.into_json()?;
        Ok(DocumentIdRevision::from_listing(&body))
    }

    /// Listing as document handles; no document bodies are fetched
    pub async fn list_documents(&self, args: Option<&ViewArguments>) -> Result<Vec<Document<'_>>> {
        Ok(self
            .list_document_id_revisions(args)
            .await?
            .into_iter()
            .map(|pair| self.new_document(Some(pair.id), Some(pair.rev), None, None))
            .collect())
    }

    /// Whether `id` (and `rev`, when given) appears in the full listing.
    ///
    /// Every call fetches the complete `_all_docs` listing.
    pub async fn document_exists(&self, id: &str, rev: Option<&str>) -> Result<bool> {
        let pairs = self.list_document_id_revisions(None).await?;
        Ok(contains(&pairs, id, rev))
    }

    /// Listing restricted to `_design/` ids, filtered after the fetch
    pub async fn list_design_document_id_revisions(
        &self,
        args: Option<&ViewArguments>,
    ) -> Result<Vec<DocumentIdRevision>> {
        Ok(self
            .list_document_id_revisions(args)
            .await?
            .into_iter()
            .filter(|pair| naming::is_design_id(&pair.id))
            .collect())
    }

    pub async fn list_design_documents(
        &self,
        args: Option<&ViewArguments>,
    ) -> Result<Vec<DesignDocument<'_>>> {
        Ok(self
            .list_design_document_id_revisions(args)
            .await?
            .into_iter()
            .map(|pair| DesignDocument::from_parts(self, pair.id, Some(pair.rev), None))
            .collect())
    }

    /// As [`Database::document_exists`] over design documents only;
    /// `id` gains the `_design/` prefix if missing
    pub async fn design_document_exists(&self, id: &str, rev: Option<&str>) -> Result<bool> {
        let id = naming::design_id(id);
        let pairs = self.list_design_document_id_revisions(None).await?;
        Ok(contains(&pairs, &id, rev))
    }

    pub fn normalize_view_arguments(args: &ViewArguments) -> Vec<(String, String)> {
        query::normalize_view_arguments(args)
    }

    pub fn build_query_string(args: &ViewArguments) -> String {
        query::build_query_string(args)
    }

    /// Run an ad-hoc view without storing it in a design document
    #[tracing::instrument(skip(self, map, reduce, args), fields(db = %self.name))]
    pub async fn temp_view(
        &self,
        map: &str,
        reduce: Option<&str>,
        args: Option<&ViewArguments>,
    ) -> Result<Value> {
        let query = args.map(query::build_query_string).unwrap_or_default();
        let path = format!("{}_temp_view{}", self.uri_name(), query);

        let mut view = json!({"language": "javascript", "map": map});
        if let Some(reduce) = reduce {
            view["reduce"] = Value::String(reduce.to_string());
        }

        self.request(Method::POST, &path, Some(&view))
            .await?
            .into_json()
    }

    /// Store every document in one `_bulk_docs` request.
    ///
    /// Returned ids/revs are applied to the handles in order; entries the
    /// server rejected are left untouched and omitted from the result.
    pub async fn bulk_store(&self, docs: &mut [Document<'_>]) -> Result<Vec<DocumentIdRevision>> {
        let contents: Vec<Value> = docs.iter().map(|doc| doc.content_for_submit()).collect();
        self.bulk_docs(docs, contents).await
    }

    /// Delete every document in one `_bulk_docs` request
    pub async fn bulk_delete(&self, docs: &mut [Document<'_>]) -> Result<Vec<DocumentIdRevision>> {
        let contents = docs
            .iter()
            .map(|doc| {
                let mut content = doc.content_for_submit();
                content["_deleted"] = Value::Bool(true);
                content
            })
            .collect();
        self.bulk_docs(docs, contents).await
    }

    async fn bulk_docs(
        &self,
        docs: &mut [Document<'_>],
        contents: Vec<Value>,
    ) -> Result<Vec<DocumentIdRevision>> {
        let path = format!("{}_bulk_docs", self.uri_name());
        let body = json!({ "docs": contents });
        let response = self.request(Method::POST, &path, Some(&body)).await?;
        let json = response.into_json()?;

        // Older servers wrap results as {"ok": true, "new_revs": [...]}
        let results = match &json {
            Value::Array(items) => items.as_slice(),
            other => other
                .get("new_revs")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default(),
        };

        let mut stored = Vec::new();
        for (doc, result) in docs.iter_mut().zip(results) {
            let id = result.get("id").and_then(Value::as_str);
            let rev = result.get("rev").and_then(Value::as_str);
            match (id, rev) {
                (Some(id), Some(rev)) => {
                    doc.id = Some(id.to_string());
                    doc.rev = Some(rev.to_string());
                    stored.push(DocumentIdRevision::new(id, rev));
                }
                _ => {
                    tracing::warn!(
                        db = %self.name,
                        id = ?doc.id,
                        error = ?result.get("error"),
                        "Bulk write rejected document"
                    );
                }
            }
        }
        Ok(stored)
    }
}

fn contains(pairs: &[DocumentIdRevision], id: &str, rev: Option<&str>) -> bool {
    pairs
        .iter()
        .any(|pair| pair.id == id && rev.map_or(true, |rev| pair.rev == rev))
}
