use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Arbitrary JSON field mapping carried by a document
pub type Fields = serde_json::Map<String, Value>;

/// DocumentIdRevision is one `{id, rev}` row of an `_all_docs` listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentIdRevision {
    pub id: String,
    pub rev: String,
}

impl DocumentIdRevision {
    pub fn new(id: impl Into<String>, rev: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            rev: rev.into(),
        }
    }

    /// Extract the pair from a listing row.
    ///
    /// Older servers report the revision as `value._rev`, newer ones as
    /// `value.rev`; both are accepted. Rows without an id yield `None`.
    pub fn from_row(row: &Value) -> Option<Self> {
        let id = row.get("id")?.as_str()?;
        let value = row.get("value");
        let rev = value
            .and_then(|v| v.get("_rev"))
            .or_else(|| value.and_then(|v| v.get("rev")))
            .and_then(Value::as_str)
            .unwrap_or_default();
        Some(Self::new(id, rev))
    }

    /// Every pair in an `_all_docs` body, in server order
    pub fn from_listing(body: &Value) -> Vec<Self> {
        body.get("rows")
            .and_then(Value::as_array)
            .map(|rows| rows.iter().filter_map(Self::from_row).collect())
            .unwrap_or_default()
    }
}

/// Attachment metadata as found under a document's `_attachments`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub content_type: String,
    /// Base64 payload for inline attachments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stub: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revpos: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl Attachment {
    /// Inline attachment carrying `bytes` base64-encoded
    pub fn inline(content_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            content_type: content_type.into(),
            data: Some(STANDARD.encode(bytes)),
            length: None,
            stub: None,
            revpos: None,
            digest: None,
        }
    }

    /// Decode the inline payload, if this attachment carries one
    pub fn decoded_data(&self) -> Result<Option<Vec<u8>>, base64::DecodeError> {
        self.data.as_deref().map(|d| STANDARD.decode(d)).transpose()
    }
}

/// RevisionInfo is one entry of a `_revs_info` listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionInfo {
    pub rev: String,
    /// "available", "missing" or "deleted"
    pub status: String,
}

/// A view's map/reduce source, opaque to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewDefinition {
    pub map: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reduce: Option<String>,
}

impl ViewDefinition {
    pub fn new(map: impl Into<String>, reduce: Option<String>) -> Self {
        Self {
            map: map.into(),
            reduce,
        }
    }
}

/// ViewArguments are the query parameters accepted by `_all_docs` and view
/// queries.
///
/// `key`, `startkey` and `endkey` are JSON values; see
/// [`crate::query::normalize_view_arguments`] for how they are encoded.
/// `descending` and `update` follow the server defaults when left unset:
/// ascending order, and an index refreshed before answering. Only
/// `descending = true` and `update = false` reach the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewArguments {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub startkey: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub startkey_docid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endkey: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descending: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<u64>,
    /// Parameters passed through untouched
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl ViewArguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(mut self, key: impl Into<Value>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn startkey(mut self, key: impl Into<Value>) -> Self {
        self.startkey = Some(key.into());
        self
    }

    pub fn startkey_docid(mut self, id: impl Into<String>) -> Self {
        self.startkey_docid = Some(id.into());
        self
    }

    pub fn endkey(mut self, key: impl Into<Value>) -> Self {
        self.endkey = Some(key.into());
        self
    }

    pub fn count(mut self, count: u64) -> Self {
        self.count = Some(count);
        self
    }

    pub fn update(mut self, update: bool) -> Self {
        self.update = Some(update);
        self
    }

    pub fn descending(mut self, descending: bool) -> Self {
        self.descending = Some(descending);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Set a parameter by name.
    ///
    /// Names that have a dedicated field land in that field: keys are read
    /// as JSON (falling back to a plain string), numbers and flags are
    /// parsed and ignored when they do not parse. Anything else is kept in
    /// `extra` and passed through untouched.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match name.as_str() {
            "key" => self.key = Some(json_or_string(value)),
            "startkey" => self.startkey = Some(json_or_string(value)),
            "endkey" => self.endkey = Some(json_or_string(value)),
            "startkey_docid" => self.startkey_docid = Some(value),
            "count" => self.count = value.parse().ok().or(self.count),
            "skip" => self.skip = value.parse().ok().or(self.skip),
            "update" => self.update = value.parse().ok().or(self.update),
            "descending" => self.descending = value.parse().ok().or(self.descending),
            _ => {
                self.extra.insert(name, value);
            }
        }
        self
    }

    /// True when no parameter at all is set
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Parameter names with a dedicated [`ViewArguments`] field
pub const VIEW_PARAMETERS: [&str; 8] = [
    "key",
    "startkey",
    "startkey_docid",
    "endkey",
    "count",
    "update",
    "descending",
    "skip",
];

fn json_or_string(raw: String) -> Value {
    serde_json::from_str(&raw).unwrap_or(Value::String(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_listing_reads_underscore_rev() {
        let body = json!({
            "total_rows": 2,
            "offset": 0,
            "rows": [
                {"id": "a", "key": "a", "value": {"_rev": "1-abc"}},
                {"id": "b", "key": "b", "value": {"rev": "2-def"}},
                {"key": "orphan"}
            ]
        });

        let pairs = DocumentIdRevision::from_listing(&body);
        assert_eq!(
            pairs,
            vec![
                DocumentIdRevision::new("a", "1-abc"),
                DocumentIdRevision::new("b", "2-def"),
            ]
        );
    }

    #[test]
    fn test_from_listing_without_rows() {
        assert!(DocumentIdRevision::from_listing(&json!({})).is_empty());
    }

    #[test]
    fn test_inline_attachment() {
        let att = Attachment::inline("text/plain", b"hello");
        assert_eq!(att.data.as_deref(), Some("aGVsbG8="));
        assert_eq!(att.decoded_data().unwrap(), Some(b"hello".to_vec()));

        let value = serde_json::to_value(&att).unwrap();
        assert_eq!(value, json!({"content_type": "text/plain", "data": "aGVsbG8="}));
    }

    #[test]
    fn test_stub_attachment_has_no_payload() {
        let att: Attachment = serde_json::from_value(json!({
            "content_type": "image/png",
            "length": 42,
            "stub": true,
            "revpos": 1
        }))
        .unwrap();
        assert_eq!(att.decoded_data().unwrap(), None);
        assert_eq!(att.length, Some(42));
    }

    #[test]
    fn test_view_arguments_builder() {
        assert!(ViewArguments::new().is_empty());

        let args = ViewArguments::new().descending(true).count(10);
        assert!(!args.is_empty());
        assert_eq!(args.descending, Some(true));
        assert_eq!(args.count, Some(10));
    }

    #[test]
    fn test_param_routes_known_names() {
        let args = ViewArguments::new()
            .descending(true)
            .param("key", "x")
            .param("startkey", "[\"a\",1]")
            .param("count", "5")
            .param("descending", "false")
            .param("group", "true");

        assert_eq!(args.key, Some(json!("x")));
        assert_eq!(args.startkey, Some(json!(["a", 1])));
        assert_eq!(args.count, Some(5));
        assert_eq!(args.descending, Some(false));
        assert_eq!(args.extra.len(), 1);
        assert_eq!(args.extra["group"], "true");
    }

    #[test]
    fn test_param_ignores_unparsable_numbers() {
        let args = ViewArguments::new().count(10).param("count", "ten");
        assert_eq!(args.count, Some(10));
        assert!(args.extra.is_empty());
    }
}
