use couchlink_core::{naming, query, Fields, ViewArguments, ViewDefinition};
use reqwest::Method;
use serde_json::Value;

use crate::document::Submittable;
use crate::{ClientError, Database, Document, Result};

const DEFAULT_LANGUAGE: &str = "javascript";

/// Document under `_design/` holding view definitions.
///
/// Wraps a [`Document`]; views live in `data.views` and `data.language`
/// defaults to `"javascript"`. Design documents never carry attachments:
/// any set locally are dropped on submit.
#[derive(Debug, Clone)]
pub struct DesignDocument<'db> {
    doc: Document<'db>,
}

impl<'db> DesignDocument<'db> {
    /// Fails with [`ClientError::InvalidDesignDocumentId`] unless `id`
    /// starts with `_design/`
    pub fn new(
        db: &'db Database,
        id: impl Into<String>,
        rev: Option<String>,
        data: Option<Fields>,
    ) -> Result<Self> {
        let id = id.into();
        if !naming::is_design_id(&id) {
            return Err(ClientError::InvalidDesignDocumentId(id));
        }
        Ok(Self::from_parts(db, id, rev, data))
    }

    /// `id` must already carry the prefix
    pub(crate) fn from_parts(
        db: &'db Database,
        id: String,
        rev: Option<String>,
        data: Option<Fields>,
    ) -> Self {
        let mut data = data.unwrap_or_default();
        data.entry("language")
            .or_insert_with(|| Value::String(DEFAULT_LANGUAGE.to_string()));

        Self {
            doc: Document::new(db, Some(id), rev, Some(data), None),
        }
    }

    pub fn id(&self) -> &str {
        self.doc.id.as_deref().unwrap_or_default()
    }

    /// Name without the `_design/` prefix
    pub fn short_name(&self) -> &str {
        naming::short_design_name(self.id())
    }

    pub fn rev(&self) -> Option<&str> {
        self.doc.rev.as_deref()
    }

    pub fn data(&self) -> &Fields {
        &self.doc.data
    }

    pub fn data_mut(&mut self) -> &mut Fields {
        &mut self.doc.data
    }

    pub fn document(&self) -> &Document<'db> {
        &self.doc
    }

    pub fn language(&self) -> Option<&str> {
        self.doc.data.get("language").and_then(Value::as_str)
    }

    pub fn views(&self) -> Option<&Fields> {
        self.doc.data.get("views").and_then(Value::as_object)
    }

    /// Mutable `data.views`, created empty if absent
    pub fn views_mut(&mut self) -> &mut Fields {
        let views = self
            .doc
            .data
            .entry("views")
            .or_insert_with(|| Value::Object(Fields::new()));
        if !views.is_object() {
            *views = Value::Object(Fields::new());
        }
        views.as_object_mut().expect("views is an object")
    }

    pub fn set_views(&mut self, views: Fields) {
        self.doc.data.insert("views".to_string(), Value::Object(views));
    }

    /// Define (or replace) a view locally
    pub fn add_view(
        &mut self,
        name: impl Into<String>,
        map: impl Into<String>,
        reduce: Option<String>,
    ) -> Result<()> {
        let definition = serde_json::to_value(ViewDefinition::new(map, reduce))?;
        self.views_mut().insert(name.into(), definition);
        Ok(())
    }

    /// Names of the views currently defined
    pub fn list_views(&self) -> Vec<String> {
        self.views()
            .map(|views| views.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Query a view defined in this document.
    ///
    /// Unknown view names fail with [`ClientError::NotFound`] before any
    /// request is made. The response body is returned as the server sent it.
    #[tracing::instrument(skip(self, args), fields(design = %self.id()))]
    pub async fn query_view(&self, view_name: &str, args: Option<&ViewArguments>) -> Result<Value> {
        if !self.views().is_some_and(|views| views.contains_key(view_name)) {
            return Err(ClientError::not_found(
                view_name,
                format!("no view {} in {}", view_name, self.id()),
            ));
        }

        let query = args.map(query::build_query_string).unwrap_or_default();
        let path = format!(
            "{}_view/{}/{}{}",
            self.doc.database().uri_name(),
            naming::escape_segment(self.short_name()),
            naming::escape_segment(view_name),
            query
        );

        self.doc
            .database()
            .request(Method::GET, &path, None)
            .await?
            .into_json()
    }

    pub async fn create(&mut self) -> Result<()> {
        let content = self.content_for_submit();
        self.doc.create_with(content).await
    }

    pub async fn retrieve(&mut self) -> Result<()> {
        self.doc.retrieve().await
    }

    pub async fn update(&mut self) -> Result<()> {
        let content = self.content_for_submit();
        self.doc.update_with(content).await
    }

    pub async fn delete(&mut self) -> Result<bool> {
        self.doc.delete().await
    }
}

impl Submittable for DesignDocument<'_> {
    fn content_for_submit(&self) -> Value {
        let mut content = self.doc.content_for_submit();
        if let Some(fields) = content.as_object_mut() {
            fields.remove("_attachments");
        }
        content
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{self, MockTransport};
    use serde_json::json;
    use std::sync::Arc;

    fn database(mock: &Arc<MockTransport>) -> Database {
        mock::client(mock).database("mydb").unwrap()
    }

    fn reports(db: &Database) -> DesignDocument<'_> {
        let mut design = DesignDocument::new(db, "_design/reports", None, None).unwrap();
        design
            .add_view("byDate", "function(doc) { emit(doc.date, null); }", None)
            .unwrap();
        design
    }

    #[test]
    fn test_construction_requires_design_prefix() {
        let mock = Arc::new(MockTransport::new());
        let db = database(&mock);

        match DesignDocument::new(&db, "foo", None, None) {
            Err(ClientError::InvalidDesignDocumentId(id)) => assert_eq!(id, "foo"),
            other => panic!("unexpected result: {:?}", other),
        }

        let design = DesignDocument::new(&db, "_design/foo", None, None).unwrap();
        assert_eq!(design.language(), Some("javascript"));
        assert_eq!(design.short_name(), "foo");
    }

    #[test]
    fn test_language_is_overridable() {
        let mock = Arc::new(MockTransport::new());
        let db = database(&mock);

        let mut data = Fields::new();
        data.insert("language".to_string(), json!("erlang"));
        let design = DesignDocument::new(&db, "_design/foo", None, Some(data)).unwrap();
        assert_eq!(design.language(), Some("erlang"));
    }

    #[test]
    fn test_views_accessors() {
        let mock = Arc::new(MockTransport::new());
        let db = database(&mock);

        let mut design = db.new_design_document("reports", None, None);
        assert!(design.list_views().is_empty());
        assert!(design.views().is_none());

        design.add_view("byDate", "function(doc) {}", None).unwrap();
        design
            .add_view("total", "function(doc) {}", Some("_sum".to_string()))
            .unwrap();
        assert_eq!(design.list_views(), vec!["byDate", "total"]);
        assert_eq!(design.data()["views"]["total"]["reduce"], "_sum");

        design.set_views(Fields::new());
        assert!(design.list_views().is_empty());
    }

    #[test]
    fn test_content_for_submit_drops_attachments() {
        let mock = Arc::new(MockTransport::new());
        let db = database(&mock);

        let mut data = Fields::new();
        data.insert("views".to_string(), json!({}));
        let mut doc = db.new_document(Some("_design/x".to_string()), None, Some(data.clone()), None);
        doc.add_attachment("logo.png", "image/png", &[1, 2, 3]);
        assert!(doc.content_for_submit().get("_attachments").is_some());

        let design = DesignDocument {
            doc: Document::new(&db, Some("_design/x".to_string()), None, Some(data), Some(doc.attachments.clone())),
        };
        let content = design.content_for_submit();
        assert!(content.get("_attachments").is_none());
        assert_eq!(content["_id"], "_design/x");
    }

    #[tokio::test]
    async fn test_query_unknown_view_makes_no_request() {
        let mock = Arc::new(MockTransport::new());
        let db = database(&mock);
        let design = db.new_design_document("reports", None, None);

        match design.query_view("byDate", None).await {
            Err(ClientError::NotFound { name, .. }) => assert_eq!(name, "byDate"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_query_view_end_to_end() {
        let body = json!({
            "total_rows": 2,
            "offset": 0,
            "rows": [
                {"id": "b", "key": "2024-02-01", "value": null},
                {"id": "a", "key": "2024-01-01", "value": null}
            ]
        });
        let mock = Arc::new(MockTransport::new().respond(200, body.clone()));
        let db = database(&mock);
        let design = reports(&db);

        let args = ViewArguments::new().descending(true).count(10);
        let result = design.query_view("byDate", Some(&args)).await.unwrap();

        assert_eq!(result, body);
        let request = mock.last_request();
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.path, "mydb/_view/reports/byDate?count=10&descending=true");
    }

    #[tokio::test]
    async fn test_query_view_failure_is_connection_error() {
        let mock = Arc::new(MockTransport::new().respond(500, json!({"error": "os_process_error"})));
        let db = database(&mock);
        let design = reports(&db);

        assert!(matches!(
            design.query_view("byDate", None).await,
            Err(ClientError::Connection { .. })
        ));
        assert_eq!(mock.last_request().path, "mydb/_view/reports/byDate");
    }

    #[tokio::test]
    async fn test_create_submits_design_content() {
        let mock = Arc::new(MockTransport::new().respond(
            201,
            json!({"ok": true, "id": "_design/reports", "rev": "1-d"}),
        ));
        let db = database(&mock);
        let mut design = reports(&db);

        design.create().await.unwrap();

        assert_eq!(design.rev(), Some("1-d"));
        let request = mock.last_request();
        assert_eq!(request.method, Method::PUT);
        assert_eq!(request.path, "mydb/_design/reports");
        assert_eq!(
            request.body,
            Some(json!({
                "_id": "_design/reports",
                "language": "javascript",
                "views": {"byDate": {"map": "function(doc) { emit(doc.date, null); }"}}
            }))
        );
    }
    #[tokio::test]
    async fn test_retrieve_loads_views() {
        let mock = Arc::new(MockTransport::new().respond(
            200,
            json!({
                "_id": "_design/reports",
                "_rev": "2-d",
                "language": "javascript",
                "views": {"byDate": {"map": "function(doc) {}"}, "total": {"map": "function(doc) {}", "reduce": "_sum"}}
            }),
        ));
        let db = database(&mock);
        let mut design = db.new_design_document("reports", None, None);

        design.retrieve().await.unwrap();

        assert_eq!(design.rev(), Some("2-d"));
        assert_eq!(design.list_views(), vec!["byDate", "total"]);
        let request = mock.last_request();
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.path, "mydb/_design/reports");
    }

    #[tokio::test]
    async fn test_update_submits_without_attachments() {
        let mock = Arc::new(MockTransport::new().respond(
            201,
            json!({"ok": true, "id": "_design/reports", "rev": "2-e"}),
        ));
        let db = database(&mock);

        let mut design = reports(&db);
        design.doc.rev = Some("1-d".to_string());
        design.doc.add_attachment("logo.png", "image/png", &[1, 2, 3]);

        design.update().await.unwrap();

        assert_eq!(design.rev(), Some("2-e"));
        let request = mock.last_request();
        assert_eq!(request.method, Method::PUT);
        assert_eq!(request.path, "mydb/_design/reports");
        assert_eq!(
            request.body,
            Some(json!({
                "_id": "_design/reports",
                "_rev": "1-d",
                "language": "javascript",
                "views": {"byDate": {"map": "function(doc) { emit(doc.date, null); }"}}
            }))
        );
    }

    #[tokio::test]
    async fn test_update_requires_revision() {
        let mock = Arc::new(MockTransport::new());
        let db = database(&mock);
        let mut design = reports(&db);

        assert!(matches!(design.update().await, Err(ClientError::InvalidState(_))));
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_delete() {
        let mock = Arc::new(MockTransport::new().respond(
            200,
            json!({"ok": true, "id": "_design/reports", "rev": "2-f"}),
        ));
        let db = database(&mock);
        let mut design = reports(&db);
        design.doc.rev = Some("1-d".to_string());

        assert!(design.delete().await.unwrap());

        assert_eq!(design.rev(), Some("2-f"));
        let request = mock.last_request();
        assert_eq!(request.method, Method::DELETE);
        assert_eq!(request.path, "mydb/_design/reports?rev=1-d");
    }
}
